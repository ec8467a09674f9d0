// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0

//! Utilities for operating on entire certificate chains.

use super::*;
use crate::certs::{ca, sev};

use codicon::{Decoder, Encoder};
use log::debug;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// A complete certificate chain.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Chain {
    /// The Certificate Authority chain
    pub ca: ca::Chain,

    /// The SEV platform chain.
    pub sev: sev::Chain,
}

impl codicon::Decoder<()> for Chain {
    type Error = Error;

    fn decode(mut reader: impl Read, _: ()) -> Result<Self> {
        let sev = sev::Chain::decode(&mut reader, ())?;
        let ca = ca::Chain::decode(&mut reader, ())?;
        Ok(Self { ca, sev })
    }
}

impl codicon::Encoder<()> for Chain {
    type Error = Error;

    fn encode(&self, mut writer: impl Write, _: ()) -> Result<()> {
        self.sev.encode(&mut writer, ())?;
        self.ca.encode(&mut writer, ())
    }
}

impl<'a> Verifiable for &'a Chain {
    type Output = &'a sev::Certificate;

    /// Walks the chain from the ARK down to the PDH, stopping at the
    /// first certificate that does not verify. Returns the PDH.
    fn verify(self) -> Result<Self::Output> {
        let ask = self.ca.verify()?;
        (ask, &self.sev.cek).verify()?;
        let pdh = self.sev.verify()?;
        debug!("certificate chain verified");
        Ok(pdh)
    }
}

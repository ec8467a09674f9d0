// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0

//! For operating on the SEV platform certificate chain.

use super::cert::Certificate;
use crate::{
    certs::{Usage, Verifiable},
    error::{Error, Result},
};

use codicon::{Decoder, Encoder};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// The SEV certificate chain.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Chain {
    /// The Platform Diffie-Hellman certificate
    pub pdh: Certificate,

    /// The certificate for the PEK.
    pub pek: Certificate,

    /// The certificate for the OCA.
    pub oca: Certificate,

    /// The certificate for the CEK.
    pub cek: Certificate,
}

impl codicon::Decoder<()> for Chain {
    type Error = Error;

    fn decode(mut reader: impl Read, _: ()) -> Result<Self> {
        let pdh = Certificate::decode(&mut reader, ())?;
        let pek = Certificate::decode(&mut reader, ())?;
        let oca = Certificate::decode(&mut reader, ())?;
        let cek = Certificate::decode(&mut reader, ())?;

        let usages = [pdh.body.usage, pek.body.usage, oca.body.usage, cek.body.usage];
        if usages != [Usage::PDH, Usage::PEK, Usage::OCA, Usage::CEK] {
            return Err(Error::MalformedCertificate);
        }

        Ok(Self { pdh, pek, oca, cek })
    }
}

impl codicon::Encoder<()> for Chain {
    type Error = Error;

    fn encode(&self, mut writer: impl Write, _: ()) -> Result<()> {
        self.pdh.encode(&mut writer, ())?;
        self.pek.encode(&mut writer, ())?;
        self.oca.encode(&mut writer, ())?;
        self.cek.encode(&mut writer, ())
    }
}

impl<'a> Verifiable for &'a Chain {
    type Output = &'a Certificate;

    /// Verifies the platform-owned part of the chain. The CEK itself is
    /// vouched for by the ASK, see [`crate::certs::Chain`].
    fn verify(self) -> Result<Self::Output> {
        (&self.cek, &self.oca, &self.pek).verify()?;
        (&self.pek, &self.pdh).verify()?;
        Ok(&self.pdh)
    }
}

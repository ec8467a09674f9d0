// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0

//! For operating on Certificate Authority chains.

use super::*;
use crate::certs::{ca::cert::Certificate, Usage};

use codicon::{Decoder, Encoder};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// A complete Certificate Authority chain.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Chain {
    /// The AMD Signing Key certificate.
    pub ask: Certificate,

    /// The AMD Root Key certificate.
    pub ark: Certificate,
}

impl Chain {
    /// Splits a vendor blob holding the ASK followed by the ARK.
    ///
    /// Root-family certificates have no fixed size, so each one is
    /// located from the size of the one before it.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let ask = Certificate::decode(buf, ())?;
        let rest = buf.get(ask.size()..).ok_or(Error::MalformedCertificate)?;
        let ark = Certificate::decode(rest, ())?;
        if rest.len() != ark.size() {
            return Err(Error::MalformedCertificate);
        }

        Self::ordered(ask, ark)
    }

    fn ordered(ask: Certificate, ark: Certificate) -> Result<Self> {
        if ask.usage != Usage::ASK || ark.usage != Usage::ARK {
            return Err(Error::MalformedCertificate);
        }

        Ok(Self { ask, ark })
    }
}

impl codicon::Decoder<()> for Chain {
    type Error = Error;

    fn decode(mut reader: impl Read, _: ()) -> Result<Self> {
        let ask = Certificate::decode(&mut reader, ())?;
        let ark = Certificate::decode(&mut reader, ())?;
        Self::ordered(ask, ark)
    }
}

impl codicon::Encoder<()> for Chain {
    type Error = Error;

    fn encode(&self, mut writer: impl Write, _: ()) -> Result<()> {
        self.ask.encode(&mut writer, ())?;
        self.ark.encode(&mut writer, ())
    }
}

impl<'a> Verifiable for &'a Chain {
    type Output = &'a Certificate;

    fn verify(self) -> Result<Self::Output> {
        (&self.ark, &self.ark).verify()?;
        (&self.ark, &self.ask).verify()?;
        Ok(&self.ask)
    }
}

// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0

//! Operations that can be done on an SEV platform certificate.

mod key;

pub use key::{EccKey, Key};

use crate::{
    certs::{ca, verify_slot, Algorithm, Signed, Signer, Usage, Verifiable},
    crypto::{key::ecc, sig, PrivateKey, PublicKey, Signature},
    error::{Error, Result},
    util::*,
    Version,
};

use openssl::{hash, pkey};
use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;
use std::io::{ErrorKind, Read, Write};

/// Size of the signed body.
pub const BODY_SIZE: usize = 16 + key::KEY_SIZE;

/// Size of an encoded platform certificate.
pub const SIZE: usize = BODY_SIZE + 2 * std::mem::size_of::<Slot>();

static_assertions::const_assert_eq!(SIZE, 2084);

/// The signed part of a platform certificate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Body {
    pub ver: u32,
    pub firmware: Version,
    pub reserved: u16,
    pub usage: Usage,
    pub algo: Algorithm,
    pub key: Key,
}

/// A signature slot: the signer's usage and algorithm, and the raw
/// signature (RSA little-endian, or ECDSA `r`/`s` little-endian).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Slot {
    pub usage: Usage,
    pub algo: Algorithm,
    #[serde(with = "BigArray")]
    pub sig: [u8; 512],
}

impl Default for Slot {
    fn default() -> Self {
        Self {
            usage: Usage::INV,
            algo: Algorithm::NONE,
            sig: [0u8; 512],
        }
    }
}

impl Slot {
    pub fn is_empty(&self) -> bool {
        self.usage == Usage::INV || self.algo == Algorithm::NONE
    }

    fn valid(&self) -> bool {
        self.is_empty()
            || matches!(
                self.algo,
                Algorithm::RSA_SHA256
                    | Algorithm::RSA_SHA384
                    | Algorithm::ECDSA_SHA256
                    | Algorithm::ECDSA_SHA384
            )
    }
}

impl TryFrom<&Slot> for Option<Signature> {
    type Error = Error;

    fn try_from(value: &Slot) -> Result<Self> {
        if value.is_empty() {
            return Ok(None);
        }

        let kind = pkey::Id::try_from(value.algo)?;
        let sig = if kind == pkey::Id::RSA {
            let raw: sig::rsa::Signature = (&value.sig[..]).load()?;
            Vec::from(&raw)
        } else {
            let raw: sig::ecdsa::Signature = (&value.sig[..]).load()?;
            Vec::try_from(&raw)?
        };

        Ok(Some(Signature {
            id: None,
            sig,
            kind,
            hash: value.algo.try_into()?,
            usage: value.usage,
        }))
    }
}

/// An SEV platform certificate (PDH, PEK, OCA, CEK, or a guest owner's
/// Diffie-Hellman certificate).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Certificate {
    pub body: Body,
    pub sigs: [Slot; 2],
}

impl Certificate {
    /// A certificate with both signature slots empty.
    pub fn unsigned(firmware: Version, usage: Usage, algo: Algorithm, key: Key) -> Self {
        Self {
            body: Body {
                ver: 1,
                firmware,
                reserved: 0,
                usage,
                algo,
                key,
            },
            sigs: [Slot::default(), Slot::default()],
        }
    }

    /// Generates a fresh P-384 certificate of `usage` and its private key.
    pub fn generate(usage: Usage) -> Result<(Self, PrivateKey<Usage>)> {
        let (key, algo, prv) = Key::generate(usage)?;
        Ok((Self::unsigned(Version::default(), usage, algo, key), prv))
    }

    /// An unsigned certificate of `usage` for the elliptic-curve key
    /// held by `prv`, such as an owner's existing OCA key.
    pub fn from_private_key(usage: Usage, prv: &PrivateKey<Usage>) -> Result<Self> {
        let algo = Algorithm::try_from(usage)?;
        let ec = prv.key.ec_key().or(Err(Error::UnsupportedAlgorithm))?;
        let key = ecc::PubKey::try_from(&ec)?;
        Ok(Self::unsigned(Version::default(), usage, algo, Key::Ecc(key.into())))
    }

    /// Number of populated signature slots.
    pub fn signatures(&self) -> usize {
        self.sigs.iter().filter(|s| !s.is_empty()).count()
    }

    /// Verifies every signature this certificate's usage requires
    /// against the matching certificate in `parents`.
    pub fn verify_with(&self, parents: &[&Certificate]) -> Result<()> {
        let usage = self.body.usage;
        let signers = usage.signers()?;

        let found = self.signatures();
        if found != signers.len() {
            return Err(Error::SignatureCountMismatch {
                usage,
                expected: signers.len(),
                found,
            });
        }

        for signer in signers {
            let parent = parents
                .iter()
                .find(|p| p.body.usage == *signer)
                .ok_or(Error::MissingParent(*signer))?;

            let slot = self
                .sigs
                .iter()
                .position(|s| !s.is_empty() && s.usage == *signer)
                .ok_or(Error::InvalidSignature(usage))?;

            verify_slot(*parent, self, slot)?;
        }

        Ok(())
    }
}

impl codicon::Decoder<()> for Certificate {
    type Error = Error;

    fn decode(mut reader: impl Read, _: ()) -> Result<Self> {
        let mut buf = [0u8; SIZE];
        reader.read_exact(&mut buf).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => Error::MalformedCertificate,
            _ => e.into(),
        })?;
        let mut reader = &buf[..];

        let ver = u32::from_le(reader.load()?);
        let firmware = Version {
            major: reader.load()?,
            minor: reader.load()?,
        };
        let reserved = u16::from_le(reader.load()?);
        let usage: Usage = reader.load()?;
        let algo: Algorithm = reader.load()?;
        let key = Key::load(&mut reader, algo)?;
        let sigs: [Slot; 2] = [reader.load()?, reader.load()?];

        if sigs.iter().any(|s| !s.valid()) {
            return Err(Error::MalformedCertificate);
        }

        let cert = Self {
            body: Body {
                ver,
                firmware,
                reserved,
                usage,
                algo,
                key,
            },
            sigs,
        };

        if cert.signatures() > usage.max_signatures() {
            return Err(Error::MalformedCertificate);
        }

        Ok(cert)
    }
}

impl codicon::Encoder<crate::Body> for Certificate {
    type Error = Error;

    fn encode(&self, mut writer: impl Write, _: crate::Body) -> Result<()> {
        let body = &self.body;
        writer.save(&body.ver.to_le())?;
        writer.save(&body.firmware.major)?;
        writer.save(&body.firmware.minor)?;
        writer.save(&body.reserved.to_le())?;
        writer.save(&body.usage)?;
        writer.save(&body.algo)?;
        body.key.save(&mut writer)
    }
}

impl codicon::Encoder<()> for Certificate {
    type Error = Error;

    fn encode(&self, mut writer: impl Write, _: ()) -> Result<()> {
        codicon::Encoder::<crate::Body>::encode(self, &mut writer, crate::Body)?;
        writer.save(&self.sigs)?;
        Ok(())
    }
}

impl Signed for Certificate {
    fn usage(&self) -> Usage {
        self.body.usage
    }

    fn signed_region(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(BODY_SIZE);
        codicon::Encoder::encode(self, &mut buf, crate::Body)?;
        Ok(buf)
    }

    fn signature(&self, slot: usize) -> Result<Option<Signature>> {
        match self.sigs.get(slot) {
            Some(slot) => slot.try_into(),
            None => Ok(None),
        }
    }

    fn public_key(&self) -> Result<PublicKey> {
        Ok(PublicKey {
            id: None,
            key: self.body.key.pkey()?,
            hash: self.body.algo.try_into()?,
            usage: self.body.usage,
        })
    }
}

impl Verifiable for (&Certificate, &Certificate) {
    type Output = ();

    fn verify(self) -> Result<()> {
        self.1.verify_with(&[self.0])
    }
}

impl Verifiable for (&Certificate, &Certificate, &Certificate) {
    type Output = ();

    /// Checks a certificate signed by two parents (the PEK, by the CEK
    /// and the OCA).
    fn verify(self) -> Result<()> {
        self.2.verify_with(&[self.0, self.1])
    }
}

impl Verifiable for (&ca::Certificate, &Certificate) {
    type Output = ();

    fn verify(self) -> Result<()> {
        let ask = self.0.export_public_key()?;
        self.1.verify_with(&[&ask])
    }
}

impl<U> PrivateKey<U> {
    fn algorithm(&self) -> Result<Algorithm> {
        let sha256 = self.hash == hash::MessageDigest::sha256();
        let sha384 = self.hash == hash::MessageDigest::sha384();
        Ok(match (self.key.id(), sha256, sha384) {
            (pkey::Id::RSA, true, _) => Algorithm::RSA_SHA256,
            (pkey::Id::RSA, _, true) => Algorithm::RSA_SHA384,
            (pkey::Id::EC, true, _) => Algorithm::ECDSA_SHA256,
            (pkey::Id::EC, _, true) => Algorithm::ECDSA_SHA384,
            _ => return Err(Error::UnsupportedAlgorithm),
        })
    }
}

impl Signer<Certificate> for PrivateKey<Usage> {
    type Output = ();

    /// Fills the first empty signature slot of `target`.
    fn sign(&self, target: &mut Certificate) -> Result<()> {
        let algo = self.algorithm()?;
        let msg = target.signed_region()?;
        let slot = target
            .sigs
            .iter_mut()
            .find(|s| s.is_empty())
            .ok_or(ErrorKind::InvalidInput)?;

        let sig = self.sign_message(&msg)?;
        let mut raw = [0u8; 512];
        if algo.is_rsa() {
            (&mut raw[..]).save(&sig::rsa::Signature::from(&sig[..]))?;
        } else {
            (&mut raw[..]).save(&sig::ecdsa::Signature::try_from(&sig[..])?)?;
        }

        *slot = Slot {
            usage: self.usage,
            algo,
            sig: raw,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codicon::{Decoder, Encoder};

    #[test]
    fn size() {
        let (cert, _) = Certificate::generate(Usage::PDH).unwrap();
        let mut buf = Vec::new();
        cert.encode(&mut buf, ()).unwrap();
        assert_eq!(buf.len(), 2084);
        assert_eq!(cert.signed_region().unwrap().len(), 1044);
    }

    #[test]
    fn third_signature_rejected() {
        let (mut pek, prv) = Certificate::generate(Usage::PEK).unwrap();
        prv.sign(&mut pek).unwrap();
        prv.sign(&mut pek).unwrap();
        assert!(prv.sign(&mut pek).is_err());
    }

    #[test]
    fn certificate_for_existing_key() {
        let (oca, prv) = Certificate::generate(Usage::OCA).unwrap();
        let pem = prv.key.private_key_to_pem_pkcs8().unwrap();
        let prv = PrivateKey::from_pem(&pem, Usage::OCA).unwrap();

        let mut cert = Certificate::from_private_key(Usage::OCA, &prv).unwrap();
        assert_eq!(cert.body, oca.body);

        prv.sign(&mut cert).unwrap();
        (&cert, &cert).verify().unwrap();
    }

    #[test]
    fn excess_signatures_malformed() {
        let (mut pdh, _) = Certificate::generate(Usage::PDH).unwrap();
        let (_, pek) = Certificate::generate(Usage::PEK).unwrap();
        pek.sign(&mut pdh).unwrap();
        pek.sign(&mut pdh).unwrap();

        let mut buf = Vec::new();
        pdh.encode(&mut buf, ()).unwrap();
        assert!(matches!(
            Certificate::decode(&buf[..], ()),
            Err(Error::MalformedCertificate)
        ));
    }

    #[test]
    fn unknown_algorithm_malformed() {
        let (cert, _) = Certificate::generate(Usage::OCA).unwrap();
        let mut buf = Vec::new();
        cert.encode(&mut buf, ()).unwrap();
        buf[12..16].copy_from_slice(&0x7fu32.to_le_bytes());

        assert!(matches!(
            Certificate::decode(&buf[..], ()),
            Err(Error::MalformedCertificate)
        ));
    }

    #[test]
    fn short_buffer_malformed() {
        let (cert, _) = Certificate::generate(Usage::CEK).unwrap();
        let mut buf = Vec::new();
        cert.encode(&mut buf, ()).unwrap();

        assert!(matches!(
            Certificate::decode(&buf[..SIZE - 1], ()),
            Err(Error::MalformedCertificate)
        ));
    }
}

// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0

//! Operations that can be done on an AMD root-family (ARK/ASK)
//! certificate.
//!
//! Unlike platform certificates these have no fixed size: the key
//! sizes in the header decide how long the exponent, modulus and
//! signature are.

use crate::{
    certs::{sev, verify_slot, Algorithm, Signed, Signer, Usage, Verifiable},
    crypto::{key::rsa, PrivateKey, PublicKey, Signature},
    error::{Error, Result},
    util::*,
};

use openssl::{bn, hash, pkey, rand};
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read, Write};

/// Size of the fixed header preceding the key material.
pub const HEADER_SIZE: usize = 64;

const MAX_KEY_BITS: u32 = 4096;

/// An AMD root-family certificate. Key material and signature are kept
/// little-endian, exactly as encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub version: u32,
    pub kid: [u8; 16],
    pub sid: [u8; 16],
    pub usage: Usage,
    pub reserved: [u8; 16],
    /// Public exponent size in bits.
    pub psize: u32,
    /// Modulus size in bits.
    pub msize: u32,
    pub pubexp: Vec<u8>,
    pub modulus: Vec<u8>,
    pub signature: Vec<u8>,
}

fn key_bytes(bits: u32) -> Result<usize> {
    if bits == 0 || bits % 8 != 0 || bits > MAX_KEY_BITS {
        return Err(Error::MalformedCertificate);
    }
    Ok(bits as usize / 8)
}

fn truncated(e: std::io::Error) -> Error {
    match e.kind() {
        ErrorKind::UnexpectedEof => Error::MalformedCertificate,
        _ => e.into(),
    }
}

impl Certificate {
    /// The encoded length of this certificate.
    pub fn size(&self) -> usize {
        HEADER_SIZE + self.pubexp.len() + self.modulus.len() + self.signature.len()
    }

    /// Whether the certificate claims to certify itself.
    pub fn is_self_signed(&self) -> bool {
        self.kid == self.sid
    }

    /// The signature algorithm implied by the modulus size.
    pub fn algorithm(&self) -> Result<Algorithm> {
        Algorithm::rsa(self.msize)
    }

    /// Generates a self-signed-shaped certificate with a fresh RSA key
    /// of `bits`. The signature is left zeroed until the certificate is
    /// passed to a [`Signer`].
    pub fn generate(usage: Usage, bits: u32) -> Result<(Self, PrivateKey<Usage>)> {
        if usage != Usage::ARK && usage != Usage::ASK {
            return Err(Error::UnsupportedAlgorithm);
        }

        let hash = hash::MessageDigest::try_from(Algorithm::rsa(bits)?)?;
        let size = bits as usize / 8;
        let prv = openssl::rsa::Rsa::generate(bits)?;

        let mut kid = [0u8; 16];
        rand::rand_bytes(&mut kid)?;

        let pubexp = prv.e().to_vec_padded(size as i32)?.into_iter().rev().collect();
        let modulus = prv.n().to_vec_padded(size as i32)?.into_iter().rev().collect();

        Ok((
            Self {
                version: 1,
                kid,
                sid: kid,
                usage,
                reserved: [0u8; 16],
                psize: bits,
                msize: bits,
                pubexp,
                modulus,
                signature: vec![0u8; size],
            },
            PrivateKey {
                id: Some(kid),
                key: pkey::PKey::from_rsa(prv)?,
                hash,
                usage,
            },
        ))
    }

    /// Repackages the certified key in the platform certificate shape so
    /// it can verify a platform certificate signed by it.
    pub fn export_public_key(&self) -> Result<sev::Certificate> {
        let algo = self.algorithm()?;
        if self.pubexp.len() > 512 || self.modulus.len() > 512 {
            return Err(Error::UnsupportedAlgorithm);
        }

        let mut key = rsa::PubKey {
            modulus_size: self.msize.to_le(),
            pubexp: [0u8; 512],
            modulus: [0u8; 512],
        };
        key.pubexp[..self.pubexp.len()].copy_from_slice(&self.pubexp);
        key.modulus[..self.modulus.len()].copy_from_slice(&self.modulus);

        Ok(sev::Certificate::unsigned(
            crate::Version::default(),
            self.usage,
            algo,
            sev::cert::Key::Rsa(key),
        ))
    }
}

impl codicon::Decoder<()> for Certificate {
    type Error = Error;

    fn decode(mut reader: impl Read, _: ()) -> Result<Self> {
        let mut header = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header).map_err(truncated)?;
        let mut h = &header[..];

        let version = u32::from_le(h.load()?);
        let kid = h.load()?;
        let sid = h.load()?;
        let usage: Usage = h.load()?;
        let reserved = h.load()?;
        let psize = u32::from_le(h.load()?);
        let msize = u32::from_le(h.load()?);

        if version != 1 || (usage != Usage::ARK && usage != Usage::ASK) {
            return Err(Error::MalformedCertificate);
        }

        let mut pubexp = vec![0u8; key_bytes(psize)?];
        let mut modulus = vec![0u8; key_bytes(msize)?];
        let mut signature = vec![0u8; modulus.len()];
        reader.read_exact(&mut pubexp).map_err(truncated)?;
        reader.read_exact(&mut modulus).map_err(truncated)?;
        reader.read_exact(&mut signature).map_err(truncated)?;

        Ok(Self {
            version,
            kid,
            sid,
            usage,
            reserved,
            psize,
            msize,
            pubexp,
            modulus,
            signature,
        })
    }
}

impl codicon::Encoder<crate::Body> for Certificate {
    type Error = Error;

    fn encode(&self, mut writer: impl Write, _: crate::Body) -> Result<()> {
        writer.save(&self.version.to_le())?;
        writer.write_all(&self.kid)?;
        writer.write_all(&self.sid)?;
        writer.save(&self.usage)?;
        writer.write_all(&self.reserved)?;
        writer.save(&self.psize.to_le())?;
        writer.save(&self.msize.to_le())?;
        writer.write_all(&self.pubexp)?;
        writer.write_all(&self.modulus)?;
        Ok(())
    }
}

impl codicon::Encoder<()> for Certificate {
    type Error = Error;

    fn encode(&self, mut writer: impl Write, _: ()) -> Result<()> {
        codicon::Encoder::<crate::Body>::encode(self, &mut writer, crate::Body)?;
        writer.write_all(&self.signature)?;
        Ok(())
    }
}

impl Signed for Certificate {
    fn usage(&self) -> Usage {
        self.usage
    }

    fn signed_region(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.size());
        codicon::Encoder::encode(self, &mut buf, crate::Body)?;
        Ok(buf)
    }

    fn signature(&self, slot: usize) -> Result<Option<Signature>> {
        if slot != 0 {
            return Ok(None);
        }

        Ok(Some(Signature {
            id: Some(self.sid),
            sig: self.signature.iter().rev().cloned().collect(),
            kind: pkey::Id::RSA,
            hash: self.algorithm()?.try_into()?,
            usage: Usage::ARK,
        }))
    }

    fn public_key(&self) -> Result<PublicKey> {
        let key = openssl::rsa::Rsa::from_public_components(
            bn::BigNum::from_le(&self.modulus)?,
            bn::BigNum::from_le(&self.pubexp)?,
        )?;

        Ok(PublicKey {
            id: Some(self.kid),
            key: pkey::PKey::from_rsa(key)?,
            hash: self.algorithm()?.try_into()?,
            usage: self.usage,
        })
    }
}

impl Verifiable for (&Certificate, &Certificate) {
    type Output = ();

    /// Checks that the second certificate is signed by the first:
    /// `(&ark, &ark)` for the root, `(&ark, &ask)` for the intermediate.
    fn verify(self) -> Result<()> {
        let (parent, child) = self;
        parent.algorithm()?;
        child.algorithm()?;
        verify_slot(parent, child, 0)
    }
}

impl Signer<Certificate> for PrivateKey<Usage> {
    type Output = ();

    fn sign(&self, target: &mut Certificate) -> Result<()> {
        target.sid = self.id.ok_or(ErrorKind::InvalidInput)?;
        let size = key_bytes(target.msize)?;
        let sig = self.sign_message(&target.signed_region()?)?;
        if sig.len() > size {
            return Err(Error::UnsupportedAlgorithm);
        }

        let mut le: Vec<u8> = sig.into_iter().rev().collect();
        le.resize(size, 0);
        target.signature = le;
        Ok(())
    }
}

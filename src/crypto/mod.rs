// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0

//! Interfaces for cryptography.

pub mod kdf;
pub mod key;
pub mod sig;
pub mod symm;

use crate::{
    certs::{Algorithm, Usage},
    error::{Error, Result},
};

use openssl::{derive, hash, pkey, rsa, sign};
use std::io::ErrorKind;

/// A signature lifted out of a certificate, ready for verification.
pub struct Signature {
    /// Identifier of the signing key, when the format records it.
    pub id: Option<[u8; 16]>,
    /// Big-endian RSA signature or DER encoded ECDSA signature.
    pub sig: Vec<u8>,
    pub kind: pkey::Id,
    pub hash: hash::MessageDigest,
    /// Usage of the signing certificate.
    pub usage: Usage,
}

/// Represents a private key.
pub struct PrivateKey<U> {
    pub id: Option<[u8; 16]>,
    pub key: pkey::PKey<pkey::Private>,
    pub hash: hash::MessageDigest,
    pub usage: U,
}

/// Represents a public key lifted out of a certificate.
pub struct PublicKey {
    pub id: Option<[u8; 16]>,
    pub key: pkey::PKey<pkey::Public>,
    pub hash: hash::MessageDigest,
    pub usage: Usage,
}

impl PublicKey {
    /// Checks that `sig` was made by this key over `msg`.
    ///
    /// The signature's usage, key kind, digest and signer id must match
    /// the key before any cryptography is attempted.
    pub fn verify(&self, msg: &[u8], sig: &Signature) -> Result<()> {
        let usage = sig.usage == self.usage;
        let kind = sig.kind == self.key.id();
        let hash = sig.hash == self.hash;
        let id = sig.id.is_none() || sig.id == self.id;
        if !usage || !kind || !hash || !id {
            return Err(ErrorKind::InvalidInput.into());
        }

        let mut ver = sign::Verifier::new(sig.hash, &self.key)?;
        let bytes = if self.key.id() == pkey::Id::RSA {
            ver.set_rsa_padding(rsa::Padding::PKCS1_PSS)?;
            ver.set_rsa_pss_saltlen(sign::RsaPssSaltlen::DIGEST_LENGTH)?;
            rsa_width(&sig.sig, self.key.size())?
        } else {
            sig.sig.clone()
        };

        ver.update(msg)?;
        if ver.verify(&bytes)? {
            Ok(())
        } else {
            Err(ErrorKind::InvalidData.into())
        }
    }
}

impl PrivateKey<Usage> {
    /// Loads an elliptic-curve private key in PEM form for a platform
    /// certificate of `usage`.
    pub fn from_pem(pem: &[u8], usage: Usage) -> Result<Self> {
        let key = pkey::PKey::private_key_from_pem(pem)?;
        if key.id() != pkey::Id::EC {
            return Err(Error::UnsupportedAlgorithm);
        }

        Ok(Self {
            id: None,
            key,
            hash: Algorithm::try_from(usage)?.try_into()?,
            usage,
        })
    }
}

/// Fits a zero-padded big-endian RSA signature to the modulus width.
fn rsa_width(sig: &[u8], size: usize) -> Result<Vec<u8>> {
    if sig.len() >= size {
        let (pad, sig) = sig.split_at(sig.len() - size);
        if pad.iter().any(|b| *b != 0) {
            return Err(ErrorKind::InvalidData.into());
        }
        Ok(sig.to_vec())
    } else {
        let mut out = vec![0u8; size - sig.len()];
        out.extend_from_slice(sig);
        Ok(out)
    }
}

impl<U> PrivateKey<U> {
    /// Signs `msg` the way platform and root certificates expect:
    /// RSASSA-PSS with a digest-length salt, or DER encoded ECDSA.
    pub fn sign_message(&self, msg: &[u8]) -> Result<Vec<u8>> {
        let mut sig = sign::Signer::new(self.hash, &self.key)?;
        if self.key.id() == pkey::Id::RSA {
            sig.set_rsa_padding(rsa::Padding::PKCS1_PSS)?;
            sig.set_rsa_pss_saltlen(sign::RsaPssSaltlen::DIGEST_LENGTH)?;
        }

        sig.update(msg)?;
        Ok(sig.sign_to_vec()?)
    }

    /// Elliptic-curve Diffie-Hellman with the peer's public key.
    ///
    /// The caller owns the returned shared secret and must wipe it.
    pub fn derive(&self, peer: &PublicKey) -> Result<Vec<u8>> {
        let mut der = derive::Deriver::new(&self.key)?;
        der.set_peer(&peer.key)?;
        Ok(der.derive_to_vec()?)
    }
}

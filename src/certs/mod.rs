// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0

//! Everything needed for working with AMD SEV certificate chains.

pub mod ca;
pub mod sev;
mod chain;

pub use chain::Chain;

use crate::{
    crypto::{PublicKey, Signature},
    error::{Error, Result},
};

use log::debug;
use openssl::{hash, pkey};
use serde::{Deserialize, Serialize};

/// An interface for types that may contain entities
/// such as signatures that must be verified.
pub trait Verifiable {
    /// An output type for successful verification.
    type Output;

    /// Self-verifies signatures.
    fn verify(self) -> Result<Self::Output>;
}

/// An interface for types that can sign another type
/// (i.e., certificates).
pub trait Signer<T> {
    /// The type of the signature output.
    type Output;

    /// Signs the target.
    fn sign(&self, target: &mut T) -> Result<Self::Output>;
}

/// What chain validation needs from a certificate, whichever of the
/// two layouts it is stored in.
pub trait Signed {
    /// Usage of the certified key.
    fn usage(&self) -> Usage;

    /// The bytes covered by signatures.
    fn signed_region(&self) -> Result<Vec<u8>>;

    /// The signature held in `slot`, or `None` when the slot is empty
    /// or does not exist.
    fn signature(&self, slot: usize) -> Result<Option<Signature>>;

    /// The certified public key.
    fn public_key(&self) -> Result<PublicKey>;
}

/// Verifies the signature in `slot` of `child` with the key certified by
/// `parent`. Failures are reported against `child`'s usage; a parent key
/// that cannot be used is reported as such.
pub(crate) fn verify_slot(parent: &impl Signed, child: &impl Signed, slot: usize) -> Result<()> {
    let usage = child.usage();
    let key = parent.public_key()?;
    let sig = child
        .signature(slot)
        .or(Err(Error::InvalidSignature(usage)))?
        .ok_or(Error::InvalidSignature(usage))?;

    key.verify(&child.signed_region()?, &sig)
        .or(Err(Error::InvalidSignature(usage)))?;

    debug!("{} signature by {} verified", usage, parent.usage());
    Ok(())
}

/// Denotes a certificate's usage.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Usage(u32);

impl Usage {
    /// AMD Root Key.
    pub const ARK: Usage = Usage(0x0000u32.to_le());

    /// AMD Signing Key.
    pub const ASK: Usage = Usage(0x0013u32.to_le());

    /// Owner Certificate Authority.
    pub const OCA: Usage = Usage(0x1001u32.to_le());

    /// Platform Endorsement Key.
    pub const PEK: Usage = Usage(0x1002u32.to_le());

    /// Platform Diffie-Hellman.
    pub const PDH: Usage = Usage(0x1003u32.to_le());

    /// Chip Endorsement Key.
    pub const CEK: Usage = Usage(0x1004u32.to_le());

    /// Marks an empty signature slot.
    pub const INV: Usage = Usage(0x1000u32.to_le());

    /// Usages of the certificates that must sign a platform
    /// certificate of this usage, in slot order.
    pub fn signers(self) -> Result<&'static [Usage]> {
        Ok(match self {
            Usage::CEK => &[Usage::ASK],
            Usage::OCA => &[Usage::OCA],
            Usage::PEK => &[Usage::CEK, Usage::OCA],
            Usage::PDH => &[Usage::PEK],
            _ => return Err(Error::MalformedCertificate),
        })
    }

    /// Number of signature slots this usage may populate.
    pub fn max_signatures(self) -> usize {
        match self {
            Usage::PEK => 2,
            _ => 1,
        }
    }
}

impl From<Usage> for u32 {
    fn from(value: Usage) -> u32 {
        u32::from_le(value.0)
    }
}

impl From<u32> for Usage {
    fn from(value: u32) -> Usage {
        Usage(value.to_le())
    }
}

impl std::fmt::Display for Usage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Usage::ARK => write!(f, "ARK"),
            Usage::ASK => write!(f, "ASK"),
            Usage::OCA => write!(f, "OCA"),
            Usage::PEK => write!(f, "PEK"),
            Usage::PDH => write!(f, "PDH"),
            Usage::CEK => write!(f, "CEK"),
            Usage::INV => write!(f, "INV"),
            Usage(other) => write!(f, "usage 0x{:x}", u32::from_le(other)),
        }
    }
}

/// Denotes a key's algorithm and digest.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Algorithm(u32);

impl Algorithm {
    pub const NONE: Algorithm = Algorithm(0x0000u32.to_le());
    pub const RSA_SHA256: Algorithm = Algorithm(0x0001u32.to_le());
    pub const ECDSA_SHA256: Algorithm = Algorithm(0x0002u32.to_le());
    pub const ECDH_SHA256: Algorithm = Algorithm(0x0003u32.to_le());
    pub const RSA_SHA384: Algorithm = Algorithm(0x0101u32.to_le());
    pub const ECDSA_SHA384: Algorithm = Algorithm(0x0102u32.to_le());
    pub const ECDH_SHA384: Algorithm = Algorithm(0x0103u32.to_le());

    /// The RSA algorithm matching a modulus of `bits`.
    pub fn rsa(bits: u32) -> Result<Algorithm> {
        match bits {
            2048 => Ok(Algorithm::RSA_SHA256),
            4096 => Ok(Algorithm::RSA_SHA384),
            _ => Err(Error::UnsupportedAlgorithm),
        }
    }

    /// True for algorithms whose keys are RSA.
    pub fn is_rsa(self) -> bool {
        matches!(self, Algorithm::RSA_SHA256 | Algorithm::RSA_SHA384)
    }

    /// True for algorithms whose keys are elliptic-curve.
    pub fn is_ecc(self) -> bool {
        matches!(
            self,
            Algorithm::ECDSA_SHA256
                | Algorithm::ECDSA_SHA384
                | Algorithm::ECDH_SHA256
                | Algorithm::ECDH_SHA384
        )
    }
}

impl TryFrom<Usage> for Algorithm {
    type Error = Error;

    /// The algorithm generated platform keys of this usage carry.
    fn try_from(value: Usage) -> Result<Self> {
        Ok(match value {
            Usage::OCA | Usage::PEK | Usage::CEK => Algorithm::ECDSA_SHA256,
            Usage::PDH => Algorithm::ECDH_SHA256,
            _ => return Err(Error::UnsupportedAlgorithm),
        })
    }
}

impl TryFrom<Algorithm> for hash::MessageDigest {
    type Error = Error;

    fn try_from(value: Algorithm) -> Result<Self> {
        Ok(match value {
            Algorithm::RSA_SHA256 | Algorithm::ECDSA_SHA256 | Algorithm::ECDH_SHA256 => {
                hash::MessageDigest::sha256()
            }
            Algorithm::RSA_SHA384 | Algorithm::ECDSA_SHA384 | Algorithm::ECDH_SHA384 => {
                hash::MessageDigest::sha384()
            }
            _ => return Err(Error::UnsupportedAlgorithm),
        })
    }
}

impl TryFrom<Algorithm> for pkey::Id {
    type Error = Error;

    fn try_from(value: Algorithm) -> Result<Self> {
        if value.is_rsa() {
            Ok(pkey::Id::RSA)
        } else if value.is_ecc() {
            Ok(pkey::Id::EC)
        } else {
            Err(Error::UnsupportedAlgorithm)
        }
    }
}

impl From<Algorithm> for u32 {
    fn from(value: Algorithm) -> u32 {
        u32::from_le(value.0)
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Algorithm::NONE => write!(f, "none"),
            Algorithm::RSA_SHA256 => write!(f, "RSA-SHA256"),
            Algorithm::ECDSA_SHA256 => write!(f, "ECDSA-SHA256"),
            Algorithm::ECDH_SHA256 => write!(f, "ECDH-SHA256"),
            Algorithm::RSA_SHA384 => write!(f, "RSA-SHA384"),
            Algorithm::ECDSA_SHA384 => write!(f, "ECDSA-SHA384"),
            Algorithm::ECDH_SHA384 => write!(f, "ECDH-SHA384"),
            Algorithm(other) => write!(f, "algorithm 0x{:x}", u32::from_le(other)),
        }
    }
}

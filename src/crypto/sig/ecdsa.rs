// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0

use crate::util::*;
use openssl::{bn, ecdsa};
use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;
use std::io::{Error, Result};

const SIG_PIECE_SIZE: usize = std::mem::size_of::<[u8; 72]>();

/// The raw format of an ecdsa signature.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Signature {
    #[serde(with = "BigArray")]
    r: [u8; 72],
    #[serde(with = "BigArray")]
    s: [u8; 72],
    #[serde(with = "BigArray")]
    _reserved: [u8; 512 - (SIG_PIECE_SIZE) * 2],
}

impl TryFrom<&Signature> for ecdsa::EcdsaSig {
    type Error = Error;

    #[inline]
    fn try_from(value: &Signature) -> Result<Self> {
        let r = bn::BigNum::from_le(&value.r)?;
        let s = bn::BigNum::from_le(&value.s)?;
        Ok(ecdsa::EcdsaSig::from_private_components(r, s)?)
    }
}

impl TryFrom<&Signature> for Vec<u8> {
    type Error = Error;

    #[inline]
    fn try_from(value: &Signature) -> Result<Self> {
        Ok(ecdsa::EcdsaSig::try_from(value)?.to_der()?)
    }
}

impl TryFrom<&[u8]> for Signature {
    type Error = Error;

    /// Converts a DER encoded signature.
    #[inline]
    fn try_from(value: &[u8]) -> Result<Self> {
        let sig = ecdsa::EcdsaSig::from_der(value)?;
        Ok(Self {
            r: sig.r().as_le_bytes(),
            s: sig.s().as_le_bytes(),
            _reserved: [0u8; 512 - (SIG_PIECE_SIZE) * 2],
        })
    }
}

// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0

//! Interfaces for rsa keys as laid out in a platform certificate.

use crate::util::*;
use openssl::{bn, pkey, rsa};
use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;
use std::io::{Error, ErrorKind, Result};

/// The raw format of an rsa public key: modulus size in bits and
/// zero-padded little-endian exponent and modulus.
#[repr(C)]
#[derive(Debug, PartialEq, Eq, Copy, Clone, Deserialize, Serialize)]
pub struct PubKey {
    pub modulus_size: u32,
    #[serde(with = "BigArray")]
    pub pubexp: [u8; 512],
    #[serde(with = "BigArray")]
    pub modulus: [u8; 512],
}

impl PubKey {
    /// Size of the modulus in bytes.
    pub fn bytes(&self) -> Result<usize> {
        match u32::from_le(self.modulus_size) {
            bits @ 1..=4096 if bits % 8 == 0 => Ok(bits as usize / 8),
            _ => Err(ErrorKind::InvalidInput.into()),
        }
    }
}

impl TryFrom<&PubKey> for rsa::Rsa<pkey::Public> {
    type Error = Error;

    fn try_from(value: &PubKey) -> Result<Self> {
        let s = value.bytes()?;
        Ok(rsa::Rsa::from_public_components(
            bn::BigNum::from_le(&value.modulus[..s])?,
            bn::BigNum::from_le(&value.pubexp[..s])?,
        )?)
    }
}

impl TryFrom<&PubKey> for pkey::PKey<pkey::Public> {
    type Error = Error;

    fn try_from(value: &PubKey) -> Result<Self> {
        Ok(pkey::PKey::from_rsa(value.try_into()?)?)
    }
}

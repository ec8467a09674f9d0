// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;

/// The raw format of an rsa signature: a zero-padded little-endian
/// integer.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Signature(#[serde(with = "BigArray")] [u8; 512]);

impl From<&Signature> for Vec<u8> {
    /// Big-endian signature, still carrying the zero padding.
    #[inline]
    fn from(value: &Signature) -> Self {
        value.0.iter().rev().cloned().collect()
    }
}

impl From<&[u8]> for Signature {
    /// Converts a big-endian signature of at most 512 bytes.
    #[inline]
    fn from(value: &[u8]) -> Self {
        let mut buf = [0u8; 512];
        for (i, b) in value.iter().rev().take(512).enumerate() {
            buf[i] = *b;
        }
        Signature(buf)
    }
}

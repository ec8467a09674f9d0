// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0

//! NIST SP 800-108 key derivation in counter mode with HMAC-SHA256 as
//! the pseudorandom function.

use crate::{
    crypto::symm::{hmac_sha256, MAC_LEN},
    error::{Error, Result},
    util::wipe,
};

use serde::{Deserialize, Serialize};

/// Byte order of the counter and output-length fields fed to the PRF.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endian {
    /// Big-endian, as specified by SP 800-108.
    #[default]
    Big,

    /// Little-endian, as encoded natively by the SEV firmware.
    Little,
}

impl Endian {
    fn bytes(self, value: u32) -> [u8; 4] {
        match self {
            Endian::Big => value.to_be_bytes(),
            Endian::Little => value.to_le_bytes(),
        }
    }
}

/// Derives `size` bytes from `key` bound to `label` and `context`.
///
/// Iteration `i` (starting at 1) computes
/// `HMAC(key, i || label || 0x00 || context || L)` where `L` is the
/// output length in bits. Outputs are concatenated and truncated.
/// Intermediate blocks and the cut-off tail are wiped.
pub fn derive(
    key: &[u8],
    label: &[u8],
    context: &[u8],
    size: usize,
    endian: Endian,
) -> Result<Vec<u8>> {
    if key.is_empty() || label.is_empty() || size == 0 {
        return Err(Error::DerivationError);
    }

    let bits = size
        .checked_mul(8)
        .and_then(|b| u32::try_from(b).ok())
        .ok_or(Error::DerivationError)?;
    let rounds = u32::try_from((size + MAC_LEN - 1) / MAC_LEN).or(Err(Error::DerivationError))?;

    let mut out = Vec::with_capacity(rounds as usize * MAC_LEN);
    for i in 1..=rounds {
        let mut block = match hmac_sha256(
            key,
            &[&endian.bytes(i), label, &[0u8], context, &endian.bytes(bits)],
        ) {
            Ok(block) => block,
            Err(e) => {
                wipe(&mut out);
                return Err(e);
            }
        };
        out.extend_from_slice(&block);
        wipe(&mut block);
    }

    wipe(&mut out[size..]);
    out.truncate(size);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn firmware_vector() {
        let master = derive(&[0u8; 16], b"sev-master-secret", &[0u8; 16], 16, Endian::Little)
            .unwrap();
        assert_eq!(
            master,
            vec![
                0xab, 0x4d, 0x26, 0x9f, 0xcc, 0x62, 0xbe, 0xdb, 0x45, 0x11, 0xd5, 0x6c, 0x38, 0x6c,
                0xe7, 0x06,
            ]
        )
    }

    #[test]
    fn deterministic() {
        let a = derive(b"shared secret", b"label", b"ctx", 32, Endian::Big).unwrap();
        let b = derive(b"shared secret", b"label", b"ctx", 32, Endian::Big).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn length_law() {
        for size in [1, 16, 31, 32, 33, 64, 100] {
            let out = derive(b"k", b"label", &[], size, Endian::Big).unwrap();
            assert_eq!(out.len(), size);
        }
    }

    #[test]
    fn prefix_of_longer_output() {
        let short = derive(b"k", b"label", b"ctx", 16, Endian::Big).unwrap();
        let long = derive(b"k", b"label", b"ctx", 48, Endian::Big).unwrap();
        // L is part of every block, so outputs of different lengths are unrelated.
        assert_ne!(short[..], long[..16]);
    }

    #[test]
    fn byte_order_matters() {
        let be = derive(b"k", b"label", &[], 16, Endian::Big).unwrap();
        let le = derive(b"k", b"label", &[], 16, Endian::Little).unwrap();
        assert_ne!(be, le);
    }

    #[test]
    fn preconditions() {
        assert!(matches!(
            derive(b"k", b"label", &[], 0, Endian::Big),
            Err(Error::DerivationError)
        ));
        assert!(matches!(
            derive(b"k", b"", &[], 16, Endian::Big),
            Err(Error::DerivationError)
        ));
        assert!(matches!(
            derive(&[], b"label", &[], 16, Endian::Big),
            Err(Error::DerivationError)
        ));
    }
}

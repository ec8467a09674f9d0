// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0

//! Symmetric primitives used by the launch protocol.

use crate::error::Result;

use openssl::{hash, pkey, sign, symm};
use std::io::ErrorKind;

/// Length of an HMAC-SHA256 tag.
pub const MAC_LEN: usize = 32;

/// AES-128 in counter mode. Encryption and decryption are the same
/// operation.
pub fn aes_128_ctr(key: &[u8], iv: &[u8; 16], data: &[u8]) -> Result<Vec<u8>> {
    let cipher = symm::Cipher::aes_128_ctr();
    if key.len() != cipher.key_len() {
        return Err(ErrorKind::InvalidInput.into());
    }

    Ok(symm::encrypt(cipher, key, Some(iv), data)?)
}

/// HMAC-SHA256 over the concatenation of `parts`.
pub fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> Result<[u8; MAC_LEN]> {
    let mut mac = [0u8; MAC_LEN];
    let key = pkey::PKey::hmac(key)?;
    let mut sig = sign::Signer::new(hash::MessageDigest::sha256(), &key)?;

    for part in parts {
        sig.update(part)?;
    }

    sig.sign(&mut mac)?;
    Ok(mac)
}

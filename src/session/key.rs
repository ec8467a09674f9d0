// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0
//

use crate::{
    crypto::{kdf, symm},
    error::Result,
    util::wipe,
};

use std::ops::{Deref, DerefMut};

use openssl::rand;

/// Symmetric key material, wiped when dropped.
#[repr(transparent)]
pub struct Key(Vec<u8>);

impl Drop for Key {
    fn drop(&mut self) {
        wipe(&mut self.0);
    }
}

impl Deref for Key {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl DerefMut for Key {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Key([REDACTED; {}])", self.0.len())
    }
}

impl Key {
    pub fn new(key: Vec<u8>) -> Self {
        Self(key)
    }

    pub fn zeroed(size: usize) -> Self {
        Key(vec![0u8; size])
    }

    pub fn random(size: usize) -> Result<Self> {
        let mut key = Key::zeroed(size);
        rand::rand_bytes(&mut key)?;
        Ok(key)
    }

    /// NIST 800-108 5.1 - KDF in Counter Mode
    pub fn derive(&self, size: usize, ctx: &[u8], label: &str, endian: kdf::Endian) -> Result<Key> {
        Ok(Key(kdf::derive(self, label.as_bytes(), ctx, size, endian)?))
    }

    pub fn mac(&self, data: &[u8]) -> Result<[u8; symm::MAC_LEN]> {
        symm::hmac_sha256(self, &[data])
    }
}

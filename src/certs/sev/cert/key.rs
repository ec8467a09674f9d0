// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0

//! The public key union of a platform certificate.

use crate::{
    certs::{Algorithm, Usage},
    crypto::{
        key::{ecc, group, rsa},
        PrivateKey,
    },
    error::{Error, Result},
    util::*,
};

use openssl::pkey;
use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;
use std::io::{Read, Write};

/// Size of the key union.
pub const KEY_SIZE: usize = 1028;

const ECC_RESERVED: usize = KEY_SIZE - std::mem::size_of::<ecc::PubKey>();

static_assertions::const_assert_eq!(std::mem::size_of::<rsa::PubKey>(), KEY_SIZE);
static_assertions::const_assert_eq!(ECC_RESERVED, 880);

/// An elliptic-curve key and the unused tail of the key union.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EccKey {
    pub key: ecc::PubKey,
    #[serde(with = "BigArray")]
    pub reserved: [u8; ECC_RESERVED],
}

impl From<ecc::PubKey> for EccKey {
    fn from(key: ecc::PubKey) -> Self {
        Self {
            key,
            reserved: [0u8; ECC_RESERVED],
        }
    }
}

/// The certified public key, tagged by the certificate's algorithm.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum Key {
    Rsa(rsa::PubKey),
    Ecc(EccKey),
}

impl Key {
    /// Generates a P-384 key pair for a platform certificate of `usage`.
    pub fn generate(usage: Usage) -> Result<(Key, Algorithm, PrivateKey<Usage>)> {
        let algo = Algorithm::try_from(usage)?;
        let (key, prv) = ecc::PubKey::generate(group::Group::P384)?;

        Ok((
            Key::Ecc(key.into()),
            algo,
            PrivateKey {
                id: None,
                key: pkey::PKey::from_ec_key(prv)?,
                hash: algo.try_into()?,
                usage,
            },
        ))
    }

    /// Reads the key union for a key of algorithm `algo`.
    pub(crate) fn load(mut reader: impl Read, algo: Algorithm) -> Result<Key> {
        if algo.is_rsa() {
            let key: rsa::PubKey = reader.load()?;
            key.bytes().or(Err(Error::MalformedCertificate))?;
            Ok(Key::Rsa(key))
        } else if algo.is_ecc() {
            let key: ecc::PubKey = reader.load()?;
            key.g.size().or(Err(Error::MalformedCertificate))?;
            Ok(Key::Ecc(EccKey {
                key,
                reserved: reader.load()?,
            }))
        } else {
            Err(Error::MalformedCertificate)
        }
    }

    pub(crate) fn save(&self, mut writer: impl Write) -> Result<()> {
        match self {
            Key::Rsa(key) => writer.save(key)?,
            Key::Ecc(key) => {
                writer.save(&key.key)?;
                writer.save(&key.reserved)?;
            }
        }
        Ok(())
    }

    pub(crate) fn pkey(&self) -> Result<pkey::PKey<pkey::Public>> {
        Ok(match self {
            Key::Rsa(key) => key.try_into()?,
            Key::Ecc(key) => (&key.key).try_into()?,
        })
    }
}

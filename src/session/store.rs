// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0

//! Handoff of the transport keys from session establishment to secret
//! packaging.

use super::key::Key;
use crate::error::{Error, Result};

use log::debug;
use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind, Read, Write},
    os::unix::fs::OpenOptionsExt,
    path::{Path, PathBuf},
};

const NONCE_LEN: usize = 16;
const KEY_LEN: usize = 16;
const RECORD_LEN: usize = NONCE_LEN + 2 * KEY_LEN;

/// Holds the TEK and TIK of one session, keyed by the session nonce.
///
/// Each store is written once. Reading back with a nonce other than
/// the one stored fails with [`Error::TransportKeyMismatch`].
pub trait KeyStore {
    /// Records the transport keys of the session identified by `nonce`.
    fn store(&mut self, nonce: &[u8; 16], tek: &Key, tik: &Key) -> Result<()>;

    /// Hands back the TEK and TIK stored for `nonce`, leaving them in
    /// the store.
    fn read(&self, nonce: &[u8; 16]) -> Result<(Key, Key)>;

    /// Discards the keys stored for `nonce`.
    fn remove(&mut self, nonce: &[u8; 16]) -> Result<()>;

    /// Hands back the TEK and TIK stored for `nonce` and discards them.
    fn load(&mut self, nonce: &[u8; 16]) -> Result<(Key, Key)> {
        let keys = self.read(nonce)?;
        self.remove(nonce)?;
        Ok(keys)
    }
}

/// Keeps the transport keys in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore(Option<([u8; 16], Key, Key)>);

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryStore {
    fn store(&mut self, nonce: &[u8; 16], tek: &Key, tik: &Key) -> Result<()> {
        if self.0.is_some() {
            return Err(ErrorKind::AlreadyExists.into());
        }

        self.0 = Some((*nonce, Key::new(tek.to_vec()), Key::new(tik.to_vec())));
        Ok(())
    }

    fn read(&self, nonce: &[u8; 16]) -> Result<(Key, Key)> {
        match &self.0 {
            Some((stored, tek, tik)) if stored == nonce => {
                Ok((Key::new(tek.to_vec()), Key::new(tik.to_vec())))
            }
            Some(_) => Err(Error::TransportKeyMismatch),
            None => Err(ErrorKind::NotFound.into()),
        }
    }

    fn remove(&mut self, nonce: &[u8; 16]) -> Result<()> {
        match &self.0 {
            Some((stored, _, _)) if stored == nonce => {
                self.0 = None;
                Ok(())
            }
            Some(_) => Err(Error::TransportKeyMismatch),
            None => Err(ErrorKind::NotFound.into()),
        }
    }
}

/// Keeps the transport keys in a file readable only by its owner.
///
/// The file holds the nonce, the TEK and the TIK back to back. It is
/// created exclusively, so two sessions can never share it, and it is
/// deleted when the keys are discarded.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole record and checks it belongs to `nonce`.
    fn record(&self, nonce: &[u8; 16]) -> Result<Key> {
        let mut record = Key::zeroed(RECORD_LEN);
        let mut file = fs::File::open(&self.path)?;
        file.read_exact(&mut record)?;
        if file.read(&mut [0u8; 1])? != 0 {
            return Err(ErrorKind::InvalidData.into());
        }

        if record[..NONCE_LEN] != nonce[..] {
            return Err(Error::TransportKeyMismatch);
        }

        Ok(record)
    }
}

impl KeyStore for FileStore {
    fn store(&mut self, nonce: &[u8; 16], tek: &Key, tik: &Key) -> Result<()> {
        let mut record = Key::zeroed(RECORD_LEN);
        record[..NONCE_LEN].copy_from_slice(nonce);
        record[NONCE_LEN..NONCE_LEN + KEY_LEN].copy_from_slice(tek);
        record[NONCE_LEN + KEY_LEN..].copy_from_slice(tik);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(&self.path)?;
        file.write_all(&record)?;
        file.sync_all()?;

        debug!("transport keys stored in {}", self.path.display());
        Ok(())
    }

    fn read(&self, nonce: &[u8; 16]) -> Result<(Key, Key)> {
        let record = self.record(nonce)?;
        let tek = Key::new(record[NONCE_LEN..NONCE_LEN + KEY_LEN].to_vec());
        let tik = Key::new(record[NONCE_LEN + KEY_LEN..].to_vec());

        debug!("transport keys read from {}", self.path.display());
        Ok((tek, tik))
    }

    fn remove(&mut self, nonce: &[u8; 16]) -> Result<()> {
        self.record(nonce)?;
        fs::remove_file(&self.path)?;
        debug!("transport keys removed from {}", self.path.display());
        Ok(())
    }
}

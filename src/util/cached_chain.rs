// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0

//! Utilities for adhering to a cached SEV chain convention.
//!
//! The search path for the SEV chain is:
//!   1. The path specified in the "SEV_CHAIN" environment variable
//!      (if present).
//!   2. `$HOME/.cache/amd-sev/chain`
//!   3. `/var/cache/amd-sev/chain`
//!
//! The chain file holds the six certificates in the order
//! PDH, PEK, OCA, CEK, ASK, ARK.

use crate::{certs::Chain, error::Result};

use std::{
    env,
    fs::File,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use codicon::{Decoder, Encoder};
use log::debug;

fn append_rest<P: AsRef<Path>>(path: P) -> PathBuf {
    let mut path = path.as_ref().to_path_buf();
    path.push("amd-sev");
    path.push("chain");
    path
}

/// Returns the path stored in the optional `SEV_CHAIN`
/// environment variable.
pub fn env_var() -> Option<PathBuf> {
    env::var("SEV_CHAIN").ok().map(PathBuf::from)
}

/// Returns the "user-level" search path for the SEV
/// certificate chain (`$HOME/.cache/amd-sev/chain`).
pub fn home() -> Option<PathBuf> {
    dirs::cache_dir().map(append_rest)
}

/// Returns the "system-level" search path for the SEV
/// certificate chain (`/var/cache/amd-sev/chain`).
pub fn sys() -> Option<PathBuf> {
    let sys = PathBuf::from("/var/cache");
    if sys.exists() {
        Some(append_rest(sys))
    } else {
        None
    }
}

/// Returns the list of search paths in the order that they
/// will be searched for the SEV certificate chain.
pub fn path() -> Vec<PathBuf> {
    vec![env_var(), home(), sys()]
        .into_iter()
        .flatten()
        .collect()
}

/// Searches for and decodes an SEV certificate chain.
pub fn get() -> Result<Chain> {
    let paths: Vec<_> = path().into_iter().filter(|p| p.exists()).collect();
    let file_name = paths.first().ok_or(ErrorKind::NotFound)?;
    debug!("loading cached chain from {}", file_name.display());
    let mut file = File::open(file_name)?;
    Chain::decode(&mut file, ())
}

/// Writes `chain` to the first search path, creating parent
/// directories as needed. Returns the path written.
pub fn put(chain: &Chain) -> Result<PathBuf> {
    let file_name = path().into_iter().next().ok_or(ErrorKind::NotFound)?;
    if let Some(parent) = file_name.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = File::create(&file_name)?;
    chain.encode(&mut file, ())?;
    debug!("cached chain at {}", file_name.display());
    Ok(file_name)
}

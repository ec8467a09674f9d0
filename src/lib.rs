// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0
//

//! Platform-owner side of the AMD Secure Encrypted Virtualization (SEV)
//! launch flow: certificate chain validation, launch session
//! establishment, launch measurement verification and secret packaging.

/// SEV certificates interface.
pub mod certs;

/// SEV API interface.
pub mod api;

/// Crypto module for keys, signatures and key derivation.
pub mod crypto;

/// Error module.
pub mod error;

/// Launch session, measurement and secret packaging.
pub mod session;

/// File-backed owner workflow.
pub mod workspace;

mod util;

pub use util::cached_chain;

use serde::{Deserialize, Serialize};

/// Information about the SEV platform version.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Version {
    /// The major version number.
    pub major: u8,

    /// The minor version number.
    pub minor: u8,
}

impl Version {
    /// First API version whose measurement and secret header cover
    /// the platform build and launch measurement.
    pub const MEASURED_CONTEXT: Version = Version {
        major: 0,
        minor: 17,
    };
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// A description of the SEV platform's build information.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Build {
    /// The version information.
    pub version: Version,

    /// The build number.
    pub build: u8,
}

impl std::fmt::Display for Build {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.version, self.build)
    }
}

/// Marker selecting the signed region of a certificate when encoding.
pub struct Body;

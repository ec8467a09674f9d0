// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0

//! Modules for interfacing with SEV Firmware
//! Rust-friendly API wrappers to communicate the the FFI functions.

mod ioctl;
pub use ioctl::*;

mod types;
pub use types::*;

use crate::{
    certs::sev,
    error::{Error, Indeterminate},
    Build,
};

use codicon::{Decoder, Encoder};
use log::debug;
use std::{
    fs::{File, OpenOptions},
    os::unix::io::{AsRawFd, RawFd},
};

/// The CPU-unique identifier for the platform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identifier(pub Vec<u8>);

impl From<Identifier> for Vec<u8> {
    fn from(id: Identifier) -> Vec<u8> {
        id.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for b in self.0.iter() {
            write!(f, "{b:02X}")?;
        }

        Ok(())
    }
}

/// What the launch flow needs from the SEV platform.
///
/// [`Firmware`] talks to the real device; tests supply their own.
pub trait Platform {
    /// Query the platform status.
    fn platform_status(&mut self) -> Result<Status, Indeterminate<Error>>;

    /// Export the PDH and the platform certificate chain.
    fn pdh_cert_export(&mut self) -> Result<sev::Chain, Indeterminate<Error>>;

    /// Generate a new Platform Endorsement Key (PEK), which also
    /// returns the platform to self-owned.
    fn pek_generate(&mut self) -> Result<(), Indeterminate<Error>>;

    /// Request a signature for the PEK.
    fn pek_csr(&mut self) -> Result<sev::Certificate, Indeterminate<Error>>;

    /// Take ownership of the SEV platform.
    fn pek_cert_import(
        &mut self,
        pek: &sev::Certificate,
        oca: &sev::Certificate,
    ) -> Result<(), Indeterminate<Error>>;
}

/// A handle to the SEV platform.
pub struct Firmware(File);

impl Firmware {
    /// Create a handle to the SEV platform.
    pub fn open() -> std::io::Result<Firmware> {
        Ok(Firmware(
            OpenOptions::new().read(true).write(true).open("/dev/sev")?,
        ))
    }

    /// Reset the platform persistent state.
    pub fn platform_reset(&mut self) -> Result<(), Indeterminate<Error>> {
        let mut cmd = Command::from(&PlatformReset);
        PLATFORM_RESET
            .ioctl(&mut self.0, &mut cmd)
            .map_err(|e| cmd.encapsulate(e))?;
        Ok(())
    }

    /// Generate a new Platform Diffie-Hellman (PDH) key pair.
    pub fn pdh_generate(&mut self) -> Result<(), Indeterminate<Error>> {
        let mut cmd = Command::from(&PdhGen);
        PDH_GEN
            .ioctl(&mut self.0, &mut cmd)
            .map_err(|e| cmd.encapsulate(e))?;
        Ok(())
    }

    /// Get the unique CPU identifier.
    ///
    /// This is especially helpful for sending AMD an HTTP request to fetch
    /// the signed CEK certificate.
    pub fn get_identifier(&mut self) -> Result<Identifier, Indeterminate<Error>> {
        let mut bytes = [0u8; 64];
        let mut id = GetId::new(&mut bytes);

        let mut cmd = Command::from_mut(&mut id);
        GET_ID
            .ioctl(&mut self.0, &mut cmd)
            .map_err(|e| cmd.encapsulate(e))?;

        Ok(Identifier(id.as_slice().to_vec()))
    }
}

impl Platform for Firmware {
    fn platform_status(&mut self) -> Result<Status, Indeterminate<Error>> {
        let mut info: PlatformStatus = Default::default();
        let mut cmd = Command::from_mut(&mut info);
        PLATFORM_STATUS
            .ioctl(&mut self.0, &mut cmd)
            .map_err(|e| cmd.encapsulate(e))?;

        let status = Status {
            build: Build {
                version: info.version,
                build: info.build,
            },
            guests: info.guest_count,
            flags: PlatformStatusFlags::from_bits_truncate(info.flags),
            state: State::try_from(info.state).or(Err(Indeterminate::<Error>::Unknown))?,
        };

        debug!("platform status: api {}, {}", status.build, status.state);
        Ok(status)
    }

    fn pdh_cert_export(&mut self) -> Result<sev::Chain, Indeterminate<Error>> {
        let mut pdh = [0u8; sev::SIZE];
        let mut certs = [0u8; 3 * sev::SIZE];

        let mut pdh_cert_export = PdhCertExport::new(&mut pdh, &mut certs);
        let mut cmd = Command::from_mut(&mut pdh_cert_export);
        PDH_CERT_EXPORT
            .ioctl(&mut self.0, &mut cmd)
            .map_err(|e| cmd.encapsulate(e))?;

        let mut all = Vec::with_capacity(4 * sev::SIZE);
        all.extend_from_slice(&pdh);
        all.extend_from_slice(&certs);
        Ok(sev::Chain::decode(&all[..], ())?)
    }

    fn pek_generate(&mut self) -> Result<(), Indeterminate<Error>> {
        let mut cmd = Command::from(&PekGen);
        PEK_GEN
            .ioctl(&mut self.0, &mut cmd)
            .map_err(|e| cmd.encapsulate(e))?;
        Ok(())
    }

    fn pek_csr(&mut self) -> Result<sev::Certificate, Indeterminate<Error>> {
        let mut pek = [0u8; sev::SIZE];
        let mut csr = PekCsr::new(&mut pek);
        let mut cmd = Command::from_mut(&mut csr);
        PEK_CSR
            .ioctl(&mut self.0, &mut cmd)
            .map_err(|e| cmd.encapsulate(e))?;

        Ok(sev::Certificate::decode(&pek[..], ())?)
    }

    fn pek_cert_import(
        &mut self,
        pek: &sev::Certificate,
        oca: &sev::Certificate,
    ) -> Result<(), Indeterminate<Error>> {
        let mut pek_buf = [0u8; sev::SIZE];
        let mut oca_buf = [0u8; sev::SIZE];
        pek.encode(&mut pek_buf[..], ())?;
        oca.encode(&mut oca_buf[..], ())?;

        let pek_cert_import = PekCertImport::new(&pek_buf, &oca_buf);
        let mut cmd = Command::from(&pek_cert_import);
        PEK_CERT_IMPORT
            .ioctl(&mut self.0, &mut cmd)
            .map_err(|e| cmd.encapsulate(e))?;
        Ok(())
    }
}

impl AsRawFd for Firmware {
    fn as_raw_fd(&self) -> RawFd {
        self.0.as_raw_fd()
    }
}

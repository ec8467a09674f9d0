// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0

//! The platform owner's launch workflow, with every artifact kept as a
//! file in one directory.
//!
//! A typical run exports the certificates, generates the launch blob,
//! computes the expected measurement once the guest has been launched
//! and finally packages the secret. Each step reads what the previous
//! ones wrote.

use crate::{
    api::{
        launch::{self, HeaderFlags, Policy},
        platform::{Platform, PlatformStatusFlags},
    },
    certs::{ca, sev, Chain, Signer, Usage, Verifiable},
    crypto::{kdf::Endian, symm::MAC_LEN, PrivateKey},
    error::{Error, Result},
    session::{
        measure::{self, MeasurementInput, MIN_SECRET_LEN},
        KeyStore, Session,
    },
};

use codicon::{Decoder, Encoder};
use log::{debug, info, warn};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

pub const PDH_FILENAME: &str = "pdh.cert";
pub const PEK_FILENAME: &str = "pek.cert";
pub const OCA_FILENAME: &str = "oca.cert";
pub const CEK_FILENAME: &str = "cek.cert";
pub const ASK_FILENAME: &str = "ask.cert";
pub const ARK_FILENAME: &str = "ark.cert";
pub const GODH_FILENAME: &str = "godh.cert";
pub const LAUNCH_BLOB_FILENAME: &str = "launch_blob.bin";
pub const MEASUREMENT_FILENAME: &str = "calc_measurement_out.txt";
pub const PACKAGED_SECRET_FILENAME: &str = "packaged_secret.bin";
pub const PACKAGED_SECRET_HEADER_FILENAME: &str = "packaged_secret_header.bin";

/// Who the platform belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Ownership {
    /// The OCA was generated by the firmware itself.
    SelfOwned,

    /// An owner's OCA has been imported.
    ExternallyOwned,
}

/// A directory holding the artifacts of one guest launch.
#[derive(Debug, Clone)]
pub struct Workspace {
    dir: PathBuf,
    endian: Endian,
}

fn encoded<T: Encoder<(), Error = Error>>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    value.encode(&mut buf, ())?;
    Ok(buf)
}

impl Workspace {
    /// Opens `dir`, creating it if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            endian: Endian::default(),
        })
    }

    /// Selects the KDF byte order used when generating the launch blob.
    pub fn with_kdf_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of the artifact `name`.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.path(name);
        fs::read(&path).map_err(|e| {
            warn!("cannot read {}: {}", path.display(), e);
            e.into()
        })
    }

    /// Writes every file under a temporary name first and renames them
    /// into place only once all of them were written. When a rename
    /// fails the files already renamed are removed again.
    fn commit(&self, files: &[(&str, &[u8])]) -> Result<()> {
        let mut staged = Vec::with_capacity(files.len());

        for (name, data) in files {
            let tmp = self.path(&format!(".{name}.partial"));
            if let Err(e) = fs::write(&tmp, data) {
                let _ = fs::remove_file(&tmp);
                for (tmp, _) in &staged {
                    let _ = fs::remove_file(tmp);
                }
                return Err(e.into());
            }
            staged.push((tmp, self.path(name)));
        }

        let mut renamed = Vec::with_capacity(staged.len());
        for (tmp, dst) in &staged {
            if let Err(e) = fs::rename(tmp, dst) {
                warn!("cannot write {}: {}", dst.display(), e);
                for dst in renamed {
                    let _ = fs::remove_file(dst);
                }
                for (tmp, _) in &staged {
                    let _ = fs::remove_file(tmp);
                }
                return Err(e.into());
            }
            renamed.push(dst);
        }

        for dst in renamed {
            debug!("wrote {}", dst.display());
        }

        Ok(())
    }

    /// Stores the platform certificates alongside the vendor-signed
    /// CEK and the ASK/ARK blob.
    ///
    /// The CEK exported by the firmware is replaced by `cek`, which
    /// carries the ASK signature.
    pub fn export_certs(
        &self,
        platform: &mut impl Platform,
        ask_ark: &[u8],
        cek: &[u8],
    ) -> Result<()> {
        let ca = ca::Chain::from_bytes(ask_ark)?;
        let cek = sev::Certificate::decode(cek, ())?;
        let mut chain = platform.pdh_cert_export()?;
        chain.cek = cek;

        self.commit(&[
            (PDH_FILENAME, &encoded(&chain.pdh)?[..]),
            (PEK_FILENAME, &encoded(&chain.pek)?[..]),
            (OCA_FILENAME, &encoded(&chain.oca)?[..]),
            (CEK_FILENAME, &encoded(&chain.cek)?[..]),
            (ASK_FILENAME, &encoded(&ca.ask)?[..]),
            (ARK_FILENAME, &encoded(&ca.ark)?[..]),
        ])?;

        info!("certificates exported to {}", self.dir.display());
        Ok(())
    }

    /// Reads the six certificates back into a chain.
    pub fn import_chain(&self) -> Result<Chain> {
        let mut sev = Vec::with_capacity(4 * sev::SIZE);
        for name in [PDH_FILENAME, PEK_FILENAME, OCA_FILENAME, CEK_FILENAME] {
            let cert = self.read(name)?;
            if cert.len() != sev::SIZE {
                return Err(Error::MalformedCertificate);
            }
            sev.extend_from_slice(&cert);
        }

        let mut ca = self.read(ASK_FILENAME)?;
        ca.extend_from_slice(&self.read(ARK_FILENAME)?);

        Ok(Chain {
            ca: ca::Chain::from_bytes(&ca)?,
            sev: sev::Chain::decode(&sev[..], ())?,
        })
    }

    /// Imports the chain and verifies it from the ARK down to the PDH.
    pub fn validate_chain(&self) -> Result<Chain> {
        let chain = self.import_chain()?;
        (&chain).verify()?;
        info!("certificate chain in {} is valid", self.dir.display());
        Ok(chain)
    }

    /// Establishes a launch session with the platform whose chain is
    /// stored here and writes the GODH certificate and session buffer.
    ///
    /// The transport keys go to `store` for [`Workspace::package_secret`].
    pub fn generate_launch_blob(
        &self,
        policy: Policy,
        store: &mut impl KeyStore,
    ) -> Result<launch::Start> {
        let chain = self.validate_chain()?;
        let session = Session::try_from(policy)?.with_kdf_endian(self.endian);
        let start = session.start(chain)?;
        session.persist(store, &start.session.nonce)?;

        self.commit(&[
            (GODH_FILENAME, &encoded(&start.cert)?[..]),
            (LAUNCH_BLOB_FILENAME, &encoded(&start.session)?[..]),
        ])?;

        info!("launch blob generated for policy 0x{:08x}", u32::from(policy));
        Ok(start)
    }

    /// The nonce of the session recorded in the launch blob.
    fn launch_nonce(&self) -> Result<[u8; 16]> {
        let blob = launch::Session::decode(&self.read(LAUNCH_BLOB_FILENAME)?[..], ())?;
        Ok(blob.nonce)
    }

    /// Computes the measurement the firmware should report for `input`
    /// and records it as hex.
    ///
    /// The TIK is read from `store` without discarding it.
    pub fn calc_measurement(
        &self,
        platform: &mut impl Platform,
        input: &MeasurementInput,
        store: &impl KeyStore,
    ) -> Result<[u8; MAC_LEN]> {
        let status = platform.platform_status()?;
        let (_, tik) = store.read(&self.launch_nonce()?)?;
        let measure = measure::compute_measurement(&tik, input, status.build.version)?;

        self.commit(&[(MEASUREMENT_FILENAME, hex::encode(measure).as_bytes())])?;
        info!("measurement {} recorded", hex::encode(measure));
        Ok(measure)
    }

    /// Encrypts `secret` for the guest launched from this workspace's
    /// launch blob, under the transport keys kept in `store`.
    ///
    /// `reported` is the measurement returned by LAUNCH_MEASURE. It
    /// must match the one expected for `policy`, `digest` and the
    /// platform's current build, or nothing is written and the keys
    /// stay in `store`. The keys are discarded once the package is
    /// on disk.
    pub fn package_secret(
        &self,
        platform: &mut impl Platform,
        policy: Policy,
        digest: &[u8; 32],
        reported: launch::Measurement,
        secret: &[u8],
        store: &mut impl KeyStore,
    ) -> Result<launch::Secret> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(Error::SecretTooShort(secret.len()));
        }

        let status = platform.platform_status()?;
        let nonce = self.launch_nonce()?;
        let (tek, tik) = store.read(&nonce)?;

        let session =
            Session::from_keys(policy, tek, tik).verify(digest, status.build, reported)?;
        let secret = session.secret(HeaderFlags::default(), secret)?;

        self.commit(&[
            (PACKAGED_SECRET_FILENAME, &secret.ciphertext[..]),
            (PACKAGED_SECRET_HEADER_FILENAME, &encoded(&secret.header)?[..]),
        ])?;
        store.remove(&nonce)?;

        info!("secret packaged for API {}", status.build);
        Ok(secret)
    }

    /// Reads the ownership flag from a fresh platform status.
    pub fn platform_owner(&self, platform: &mut impl Platform) -> Result<Ownership> {
        let status = platform.platform_status()?;
        Ok(if status.flags.contains(PlatformStatusFlags::OWNED) {
            Ownership::ExternallyOwned
        } else {
            Ownership::SelfOwned
        })
    }

    /// Returns the platform to self-owned by regenerating the PEK.
    /// Nothing is issued when it already is.
    pub fn set_self_owned(&self, platform: &mut impl Platform) -> Result<()> {
        if self.platform_owner(platform)? == Ownership::ExternallyOwned {
            platform.pek_generate()?;
            info!("platform returned to self-owned");
        }

        Ok(())
    }

    /// Makes the holder of `oca_key` the owner of the platform.
    ///
    /// The platform is first made self-owned. Its PEK signing request
    /// is then signed with a self-signed OCA for `oca_key` and imported.
    /// The OCA certificate is written to the workspace and the chain
    /// exported afterwards is returned.
    pub fn pek_cert_import(
        &self,
        platform: &mut impl Platform,
        oca_key: &PrivateKey<Usage>,
    ) -> Result<sev::Chain> {
        self.set_self_owned(platform)?;

        let mut oca = sev::Certificate::from_private_key(Usage::OCA, oca_key)?;
        oca_key.sign(&mut oca)?;

        let mut pek = platform.pek_csr()?;
        oca_key.sign(&mut pek)?;
        platform.pek_cert_import(&pek, &oca)?;

        let chain = platform.pdh_cert_export()?;
        if chain.oca != oca {
            warn!("platform did not adopt the imported OCA");
            return Err(ErrorKind::InvalidData.into());
        }

        self.commit(&[(OCA_FILENAME, &encoded(&oca)?[..])])?;
        info!("platform now owned through {}", self.path(OCA_FILENAME).display());
        Ok(chain)
    }

    /// Imports `oca_key` as owner unless the platform is already
    /// externally owned.
    pub fn set_externally_owned(
        &self,
        platform: &mut impl Platform,
        oca_key: &PrivateKey<Usage>,
    ) -> Result<()> {
        if self.platform_owner(platform)? == Ownership::SelfOwned {
            self.pek_cert_import(platform, oca_key)?;
        }

        Ok(())
    }
}

// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0
//

//! Utilities for creating a secure channel and facilitating the
//! attestation process between the tenant and the AMD SP.

mod key;
pub mod measure;
pub mod store;

pub use key::Key;
pub use measure::MeasurementInput;
pub use store::{FileStore, KeyStore, MemoryStore};

use crate::{
    api::launch,
    certs::{self, sev, Signed, Usage, Verifiable},
    crypto::{kdf::Endian, symm},
    error::{Error, Result},
    Build,
};

use log::{debug, trace};
use openssl::{hash, memcmp, rand};
use std::io::ErrorKind;

/// The last state a launch session completed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Start,
    NonceGenerated,
    MasterSecretDerived,
    SubKeysDerived,
    TransportKeysWrapped,
    SessionBufferBuilt,
}

/// Represents a brand-new secure channel with the AMD SP.
pub struct Initialized;

/// Indicates the Session is currently accepting data to include
/// in its measurement for comparison against the AMD SP's measurement.
pub struct Measuring(hash::Hasher);

/// Denotes an agreeable measurement with the AMD SP.
pub struct Verified {
    msr: launch::Measurement,
    build: Build,
}

/// Describes a secure channel with the AMD SP.
///
/// This is required for facilitating an SEV launch and attestation.
pub struct Session<T> {
    policy: launch::Policy,

    /// Transport Encryption Key.
    pub tek: Key,

    /// Transport Integrity Key.
    pub tik: Key,

    endian: Endian,

    data: T,
}

impl TryFrom<launch::Policy> for Session<Initialized> {
    type Error = Error;

    fn try_from(value: launch::Policy) -> Result<Self> {
        Ok(Self::from_keys(value, Key::random(16)?, Key::random(16)?))
    }
}

impl<T> Session<T> {
    /// The guest policy this session was established for.
    pub fn policy(&self) -> launch::Policy {
        self.policy
    }
}

impl Session<Initialized> {
    /// Rebuilds a session around transport keys kept from an earlier
    /// launch, typically read back from a [`KeyStore`].
    pub fn from_keys(policy: launch::Policy, tek: Key, tik: Key) -> Self {
        Self {
            policy,
            tek,
            tik,
            endian: Endian::default(),
            data: Initialized,
        }
    }

    /// Selects the byte order of the KDF counter and length fields.
    pub fn with_kdf_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    fn session(
        &self,
        nonce: [u8; 16],
        iv: [u8; 16],
        z: Key,
        reached: &mut Step,
    ) -> Result<launch::Session> {
        let master = z.derive(16, &nonce, "sev-master-secret", self.endian)?;
        drop(z);
        *reached = Step::MasterSecretDerived;
        trace!("session reached {:?}", reached);

        let kek = master.derive(16, &[], "sev-kek", self.endian)?;
        let kik = master.derive(16, &[], "sev-kik", self.endian)?;
        drop(master);
        *reached = Step::SubKeysDerived;
        trace!("session reached {:?}", reached);

        let mut tk = Key::zeroed(32);
        tk[..16].copy_from_slice(&self.tek);
        tk[16..].copy_from_slice(&self.tik);

        let wrap_tk: [u8; 32] = symm::aes_128_ctr(&kek, &iv, &tk)?
            .try_into()
            .or(Err(ErrorKind::InvalidData))?;
        let wrap_mac = kik.mac(&wrap_tk)?;
        *reached = Step::TransportKeysWrapped;
        trace!("session reached {:?}", reached);

        let policy_mac = self.tik.mac(&self.policy.bytes())?;
        let session = launch::Session {
            nonce,
            wrap_tk,
            wrap_iv: iv,
            wrap_mac,
            policy_mac,
        };

        *reached = Step::SessionBufferBuilt;
        trace!("session reached {:?}", reached);
        Ok(session)
    }

    fn handshake(&self, pdh: &sev::Certificate, reached: &mut Step) -> Result<launch::Start> {
        let (crt, prv) = sev::Certificate::generate(Usage::PDH)?;

        let mut nonce = [0u8; 16];
        let mut iv = [0u8; 16];
        rand::rand_bytes(&mut nonce)?;
        *reached = Step::NonceGenerated;
        trace!("session reached {:?}", reached);

        rand::rand_bytes(&mut iv)?;
        let z = Key::new(prv.derive(&pdh.public_key()?)?);
        let session = self.session(nonce, iv, z, reached)?;

        Ok(launch::Start {
            policy: self.policy,
            cert: crt,
            session,
        })
    }

    /// Produces data needed to initiate the SEV launch sequence.
    pub fn start(&self, chain: certs::Chain) -> Result<launch::Start> {
        let pdh = chain.verify()?;
        self.start_pdh(*pdh)
    }

    /// Like the above start function, yet takes PDH as input instead of deriving it from a
    /// certificate chain.
    pub fn start_pdh(&self, pdh: sev::Certificate) -> Result<launch::Start> {
        let mut reached = Step::Start;
        let start = self
            .handshake(&pdh, &mut reached)
            .map_err(|cause| Error::SessionEstablishmentFailed {
                reached,
                cause: Box::new(cause),
            })?;

        debug!("launch session established");
        Ok(start)
    }

    /// Hands the transport keys to `store` for the secret packaging
    /// step of the session identified by `nonce`.
    pub fn persist(&self, store: &mut impl KeyStore, nonce: &[u8; 16]) -> Result<()> {
        store.store(nonce, &self.tek, &self.tik)
    }

    /// Transitions to a measuring state.
    ///
    /// Any measureable data submitted to the AMD SP should also be included
    /// in the `Session` to easily compare against the AMD SP's measurement.
    pub fn measure(self) -> Result<Session<Measuring>> {
        Ok(Session {
            policy: self.policy,
            tek: self.tek,
            tik: self.tik,
            endian: self.endian,
            data: Measuring(hash::Hasher::new(hash::MessageDigest::sha256())?),
        })
    }

    /// Verifies the AMD SP's measurement.
    pub fn verify(
        self,
        digest: &[u8],
        build: Build,
        msr: launch::Measurement,
    ) -> Result<Session<Verified>> {
        let digest: [u8; 32] = digest.try_into().or(Err(ErrorKind::InvalidInput))?;
        let input = MeasurementInput::new(build, self.policy, digest, msr.mnonce);
        let expected = measure::compute_measurement(&self.tik, &input, build.version)?;

        if !memcmp::eq(&expected, &msr.measure) {
            return Err(Error::MeasurementMismatch);
        }

        debug!("launch measurement verified against API {}", build);
        Ok(Session {
            policy: self.policy,
            tek: self.tek,
            tik: self.tik,
            endian: self.endian,
            data: Verified { msr, build },
        })
    }
}

impl Session<Measuring> {
    /// Adds additional data to the digest.
    ///
    /// Everything measured by the AMD SP should also be measured by
    /// the `Session` to ensure both measurements are the same.
    pub fn update_data(&mut self, data: &[u8]) -> Result<()> {
        Ok(self.data.0.update(data)?)
    }

    /// Verifies the session's measurement against the AMD SP's measurement.
    pub fn verify(mut self, build: Build, msr: launch::Measurement) -> Result<Session<Verified>> {
        let digest = self.data.0.finish()?;
        let session = Session {
            policy: self.policy,
            tek: self.tek,
            tik: self.tik,
            endian: self.endian,
            data: Initialized,
        };

        session.verify(&digest, build, msr)
    }

    /// Verifies the session's measurement against the AMD SP's measurement
    /// using an externally generated digest.
    pub fn verify_with_digest(
        self,
        build: Build,
        msr: launch::Measurement,
        digest: &[u8],
    ) -> Result<Session<Verified>> {
        let session = Session {
            policy: self.policy,
            tek: self.tek,
            tik: self.tik,
            endian: self.endian,
            data: Initialized,
        };

        session.verify(digest, build, msr)
    }
}

impl Session<Verified> {
    /// Creates a packet for a secret to be injected into the guest.
    pub fn secret(&self, flags: launch::HeaderFlags, data: &[u8]) -> Result<launch::Secret> {
        measure::package_secret(
            data,
            &self.tek,
            &self.tik,
            flags,
            self.data.build.version,
            &self.data.msr.measure,
        )
    }
}

#[cfg(test)]
mod initialized {
    use super::*;
    use crate::Version;

    #[test]
    fn session() {
        let session = Session::from_keys(
            launch::Policy::default(),
            Key::new(vec![0u8; 16]),
            Key::new(vec![0u8; 16]),
        )
        .with_kdf_endian(Endian::Little);

        let mut reached = Step::Start;
        let launch = session
            .session([0u8; 16], [0u8; 16], Key::zeroed(16), &mut reached)
            .unwrap();

        assert_eq!(reached, Step::SessionBufferBuilt);
        assert_eq!(launch.wrap_iv, [0u8; 16]);

        assert_eq!(launch.nonce, [0u8; 16]);

        assert_eq!(
            launch.wrap_tk,
            [
                0x21, 0x37, 0xbc, 0x7f, 0x9b, 0xb8, 0xbd, 0x7c, 0x3e, 0x55, 0xa5, 0x76, 0xa1, 0x5d,
                0x34, 0x54, 0xb3, 0x85, 0x6b, 0x8b, 0xa2, 0x7a, 0xfa, 0xdf, 0x46, 0xdc, 0xfe, 0xe9,
                0xf0, 0x2c, 0x02, 0xc4,
            ]
        );

        assert_eq!(
            launch.wrap_mac,
            [
                0x31, 0x76, 0xc0, 0x75, 0x27, 0x38, 0xbd, 0x9d, 0x5e, 0x86, 0x68, 0x95, 0x34, 0x02,
                0x0f, 0x52, 0x8c, 0x08, 0x8f, 0x16, 0x23, 0x88, 0x26, 0xb0, 0x00, 0xb3, 0x27, 0xde,
                0xe6, 0xae, 0xed, 0x7d,
            ]
        );

        assert_eq!(
            launch.policy_mac,
            [
                0xaa, 0x78, 0x55, 0xe1, 0x38, 0x39, 0xdd, 0x76, 0x7c, 0xd5, 0xda, 0x7c, 0x1f, 0xf5,
                0x03, 0x65, 0x40, 0xc9, 0x26, 0x4b, 0x7a, 0x80, 0x30, 0x29, 0x31, 0x5e, 0x55, 0x37,
                0x52, 0x87, 0xb4, 0xaf,
            ]
        );
    }

    #[test]
    fn empty_shared_secret() {
        let session = Session::from_keys(
            launch::Policy::default(),
            Key::new(vec![0u8; 16]),
            Key::new(vec![0u8; 16]),
        );

        let mut reached = Step::NonceGenerated;
        assert!(matches!(
            session.session([0u8; 16], [0u8; 16], Key::zeroed(0), &mut reached),
            Err(Error::DerivationError)
        ));
        assert_eq!(reached, Step::NonceGenerated);
    }

    fn verify_fixture() -> (Session<Initialized>, [u8; 32], Build, launch::Measurement) {
        let digest = [
            0xe3, 0xb0, 0xc4, 0x42, 0x98, 0xfc, 0x1c, 0x14, 0x9a, 0xfb, 0xf4, 0xc8, 0x99, 0x6f,
            0xb9, 0x24, 0x27, 0xae, 0x41, 0xe4, 0x64, 0x9b, 0x93, 0x4c, 0xa4, 0x95, 0x99, 0x1b,
            0x78, 0x52, 0xb8, 0x55,
        ];
        let measurement = launch::Measurement {
            measure: [
                0x6f, 0xaa, 0xb2, 0xda, 0xae, 0x38, 0x9b, 0xcd, 0x34, 0x05, 0xa0, 0x5d, 0x6c, 0xaf,
                0xe3, 0x3c, 0x04, 0x14, 0xf7, 0xbe, 0xdd, 0x0b, 0xae, 0x19, 0xba, 0x5f, 0x38, 0xb7,
                0xfd, 0x16, 0x64, 0xea,
            ],
            mnonce: [
                0x4f, 0xbe, 0x0b, 0xed, 0xba, 0xd6, 0xc8, 0x6a, 0xe8, 0xf6, 0x89, 0x71, 0xd1, 0x03,
                0xe5, 0x54,
            ],
        };

        let policy = launch::Policy {
            flags: launch::PolicyFlags::default(),
            minfw: Default::default(),
        };

        let tek = Key::new(vec![0u8; 16]);
        let tik = Key::new(vec![
            0x66, 0x32, 0x0d, 0xb7, 0x31, 0x58, 0xa3, 0x5a, 0x25, 0x5d, 0x05, 0x17, 0x58, 0xe9,
            0x5e, 0xd4,
        ]);

        let build = Build {
            version: Version {
                major: 0x00,
                minor: 0x12,
            },
            build: 0x0f,
        };

        (Session::from_keys(policy, tek, tik), digest, build, measurement)
    }

    #[test]
    fn verify() {
        let (session, digest, build, measurement) = verify_fixture();
        session.verify(&digest, build, measurement).unwrap();
    }

    #[test]
    fn verify_mismatch() {
        let (session, digest, build, mut measurement) = verify_fixture();
        measurement.measure[0] ^= 0x80;

        assert!(matches!(
            session.verify(&digest, build, measurement),
            Err(Error::MeasurementMismatch)
        ));
    }

    #[test]
    fn verified_secret() {
        let (session, digest, build, measurement) = verify_fixture();
        let session = session.verify(&digest, build, measurement).unwrap();

        let secret = session
            .secret(launch::HeaderFlags::default(), &[0x42u8; 24])
            .unwrap();
        assert_eq!(secret.header.guest_len, 24);
        assert_eq!(secret.ciphertext.len(), 24);

        assert!(matches!(
            session.secret(launch::HeaderFlags::default(), &[0x42u8; 4]),
            Err(Error::SecretTooShort(4))
        ));
    }
}

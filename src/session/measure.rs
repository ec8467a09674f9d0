// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0

//! Launch measurement and secret packets.

use crate::{
    api::launch::{Header, HeaderFlags, Policy, Secret},
    crypto::symm::{aes_128_ctr, hmac_sha256, MAC_LEN},
    error::{Error, Result},
    Build, Version,
};

use openssl::rand;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;

/// Context byte leading the measurement MAC.
pub const MEASUREMENT_CONTEXT: u8 = 0x04;

/// Context byte leading the secret header MAC.
pub const SECRET_CONTEXT: u8 = 0x01;

/// The firmware refuses secrets shorter than this.
pub const MIN_SECRET_LEN: usize = 8;

/// Everything the firmware folds into a launch measurement, as
/// reported by LAUNCH_MEASURE and PLATFORM_STATUS.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct MeasurementInput {
    pub context: u8,
    pub build: Build,
    pub policy: Policy,
    pub digest: [u8; 32],
    pub mnonce: [u8; 16],
}

impl MeasurementInput {
    pub fn new(build: Build, policy: Policy, digest: [u8; 32], mnonce: [u8; 16]) -> Self {
        Self {
            context: MEASUREMENT_CONTEXT,
            build,
            policy,
            digest,
            mnonce,
        }
    }
}

/// Computes the launch measurement for a platform running API `api`.
///
/// `mnonce` must be the nonce the firmware used. Platforms older than
/// API 0.17 do not cover the context byte and build.
pub fn compute_measurement(
    tik: &[u8],
    input: &MeasurementInput,
    api: Version,
) -> Result<[u8; MAC_LEN]> {
    let prefix = [
        input.context,
        input.build.version.major,
        input.build.version.minor,
        input.build.build,
    ];
    let prefix: &[u8] = if api >= Version::MEASURED_CONTEXT {
        &prefix
    } else {
        &[]
    };

    hmac_sha256(
        tik,
        &[
            prefix,
            &input.policy.bytes(),
            &input.digest,
            &input.mnonce,
        ],
    )
}

/// Encrypts `data` under the TEK with a random IV and authenticates
/// the packet with the TIK.
pub fn package_secret(
    data: &[u8],
    tek: &[u8],
    tik: &[u8],
    flags: HeaderFlags,
    api: Version,
    measure: &[u8; 32],
) -> Result<Secret> {
    let mut iv = [0u8; 16];
    rand::rand_bytes(&mut iv)?;
    package_secret_with_iv(data, tek, tik, flags, api, measure, iv)
}

/// Like [`package_secret`] with a caller-chosen IV.
pub fn package_secret_with_iv(
    data: &[u8],
    tek: &[u8],
    tik: &[u8],
    flags: HeaderFlags,
    api: Version,
    measure: &[u8; 32],
    iv: [u8; 16],
) -> Result<Secret> {
    if data.len() < MIN_SECRET_LEN {
        return Err(Error::SecretTooShort(data.len()));
    }

    let ciphertext = aes_128_ctr(tek, &iv, data)?;
    let guest_len = u32::try_from(data.len()).or(Err(ErrorKind::InvalidInput))?;
    let trans_len = u32::try_from(ciphertext.len()).or(Err(ErrorKind::InvalidInput))?;

    let measure: &[u8] = if api >= Version::MEASURED_CONTEXT {
        measure
    } else {
        &[]
    };

    let mac = hmac_sha256(
        tik,
        &[
            &[SECRET_CONTEXT],
            &flags.bits().to_le_bytes(),
            &iv,
            &guest_len.to_le_bytes(),
            &trans_len.to_le_bytes(),
            &ciphertext,
            measure,
        ],
    )?;

    Ok(Secret {
        header: Header {
            flags,
            iv,
            guest_len,
            trans_len,
            mac,
        },
        ciphertext,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEK: [u8; 16] = [0x11; 16];
    const TIK: [u8; 16] = [0x22; 16];

    fn api(minor: u8) -> Version {
        Version { major: 0, minor }
    }

    fn input() -> MeasurementInput {
        MeasurementInput::new(
            Build {
                version: api(20),
                build: 3,
            },
            Policy::default(),
            [0x5a; 32],
            [0xa5; 16],
        )
    }

    #[test]
    fn measurement_is_deterministic() {
        let a = compute_measurement(&TIK, &input(), api(20)).unwrap();
        let b = compute_measurement(&TIK, &input(), api(20)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn measurement_avalanche() {
        let base = compute_measurement(&TIK, &input(), api(20)).unwrap();

        let mut changed = input();
        changed.digest[31] ^= 1;
        assert_ne!(compute_measurement(&TIK, &changed, api(20)).unwrap(), base);

        let mut changed = input();
        changed.mnonce[0] ^= 1;
        assert_ne!(compute_measurement(&TIK, &changed, api(20)).unwrap(), base);

        let mut changed = input();
        changed.build.build ^= 1;
        assert_ne!(compute_measurement(&TIK, &changed, api(20)).unwrap(), base);

        let mut tik = TIK;
        tik[7] ^= 1;
        assert_ne!(compute_measurement(&tik, &input(), api(20)).unwrap(), base);
    }

    #[test]
    fn old_api_skips_build() {
        let mut changed = input();
        changed.build.build ^= 1;
        assert_eq!(
            compute_measurement(&TIK, &input(), api(16)).unwrap(),
            compute_measurement(&TIK, &changed, api(16)).unwrap()
        );
    }

    #[test]
    fn major_version_counts() {
        let v1 = Version { major: 1, minor: 0 };
        let mut changed = input();
        changed.build.build ^= 1;
        assert_ne!(
            compute_measurement(&TIK, &input(), v1).unwrap(),
            compute_measurement(&TIK, &changed, v1).unwrap()
        );

        let data = [3u8; 16];
        let flags = HeaderFlags::default();
        let a = package_secret_with_iv(&data, &TEK, &TIK, flags, v1, &[0; 32], [4; 16]).unwrap();
        let b = package_secret_with_iv(&data, &TEK, &TIK, flags, v1, &[1; 32], [4; 16]).unwrap();
        assert_ne!(a.header.mac, b.header.mac);
    }

    #[test]
    fn secret_boundary() {
        let measure = [0u8; 32];
        let flags = HeaderFlags::default();
        assert!(matches!(
            package_secret(&[0u8; 7], &TEK, &TIK, flags, api(20), &measure),
            Err(Error::SecretTooShort(7))
        ));
        package_secret(&[0u8; 8], &TEK, &TIK, flags, api(20), &measure).unwrap();
    }

    fn packet(data: &[u8], minor: u8, measure: u8, iv: u8) -> Secret {
        let flags = HeaderFlags::default();
        package_secret_with_iv(data, &TEK, &TIK, flags, api(minor), &[measure; 32], [iv; 16])
            .unwrap()
    }

    #[test]
    fn secret_same_iv() {
        let data = b"correct horse battery staple";
        let a = packet(data, 20, 0, 1);
        let b = packet(data, 20, 0, 1);
        let c = packet(data, 20, 0, 2);

        assert_eq!(a, b);
        assert_ne!(a.ciphertext, c.ciphertext);
        assert_eq!(a.header.guest_len as usize, data.len());
        assert_eq!(a.header.trans_len as usize, a.ciphertext.len());
        assert_eq!(aes_128_ctr(&TEK, &[1u8; 16], &a.ciphertext).unwrap(), data);
    }

    #[test]
    fn secret_mac_gated_on_api() {
        let data = [3u8; 16];
        assert_ne!(packet(&data, 17, 0, 4).header.mac, packet(&data, 17, 1, 4).header.mac);
        assert_eq!(packet(&data, 16, 0, 4).header.mac, packet(&data, 16, 1, 4).header.mac);
    }
}

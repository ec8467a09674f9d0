// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0
//

use crate::{certs::Usage, session::Step};

use openssl::error::ErrorStack;
use std::{
    convert::From,
    error,
    fmt::{Debug, Display},
    io,
};

/// Shorthand for results carrying this crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Error conditions raised while validating certificates, establishing
/// a launch session, or packaging a secret, as well as errors reported
/// by the SEV platform or by layers below it (i.e., the Linux kernel).
#[derive(Debug)]
pub enum Error {
    /// Something went wrong when communicating with the kernel or
    /// the SEV platform, or when reading and writing artifacts.
    IoError(io::Error),

    /// A certificate could not be decoded: a declared length exceeds
    /// the buffer, a tag is unknown, or the signature slots do not fit
    /// the declared usage.
    MalformedCertificate,

    /// The certificate uses a key size or algorithm that cannot be
    /// verified.
    UnsupportedAlgorithm,

    /// The signature on the certificate with the given usage does not
    /// verify against its parent.
    InvalidSignature(Usage),

    /// The certificate with the given usage carries a number of
    /// signatures other than the number its usage requires.
    SignatureCountMismatch {
        /// Usage of the offending certificate.
        usage: Usage,
        /// Number of signatures the usage requires.
        expected: usize,
        /// Number of populated signature slots.
        found: usize,
    },

    /// No parent certificate with the given usage was supplied.
    MissingParent(Usage),

    /// Key derivation was asked for an empty key, an empty label, or
    /// a zero-length output.
    DerivationError,

    /// Session establishment aborted. `reached` is the last state the
    /// session completed before `cause` occurred.
    SessionEstablishmentFailed {
        /// Last completed state.
        reached: Step,
        /// Underlying failure.
        cause: Box<Error>,
    },

    /// The secret is shorter than the eight bytes the firmware accepts.
    SecretTooShort(usize),

    /// The locally computed launch measurement differs from the one
    /// reported by the firmware.
    MeasurementMismatch,

    /// The stored transport keys belong to a different session.
    TransportKeyMismatch,

    /// The guest policy sets reserved bits.
    InvalidPolicy(u32),

    /// The SEV firmware rejected a command with this status code.
    Firmware(u32),
}

/// There are a number of error conditions that can occur between this
/// layer all the way down to the SEV platform. Most of these cases have
/// been enumerated; however, there is a possibility that some error
/// conditions are not encapsulated here.
#[derive(Debug)]
pub enum Indeterminate<T: Debug> {
    /// The error condition is known.
    Known(T),

    /// The error condition is unknown.
    Unknown,
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "I/O Error: {e}"),
            Error::MalformedCertificate => write!(f, "Certificate is malformed"),
            Error::UnsupportedAlgorithm => write!(f, "Unsupported key size or algorithm"),
            Error::InvalidSignature(usage) => write!(f, "Invalid signature on {usage} certificate"),
            Error::SignatureCountMismatch {
                usage,
                expected,
                found,
            } => write!(
                f,
                "{usage} certificate requires {expected} signature(s), found {found}"
            ),
            Error::MissingParent(usage) => write!(f, "Missing {usage} parent certificate"),
            Error::DerivationError => write!(f, "Key derivation precondition violated"),
            Error::SessionEstablishmentFailed { reached, cause } => {
                write!(f, "Session establishment failed after {reached:?}: {cause}")
            }
            Error::SecretTooShort(len) => {
                write!(f, "Secret of {len} bytes is shorter than the 8 byte minimum")
            }
            Error::MeasurementMismatch => write!(f, "Launch measurement does not match"),
            Error::TransportKeyMismatch => {
                write!(f, "Stored transport keys belong to another session")
            }
            Error::InvalidPolicy(bits) => write!(f, "Invalid guest policy 0x{bits:08x}"),
            Error::Firmware(code) => write!(f, "Firmware error 0x{code:x}"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            Error::SessionEstablishmentFailed { cause, .. } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    #[inline]
    fn from(error: io::Error) -> Error {
        Error::IoError(error)
    }
}

impl From<ErrorStack> for Error {
    #[inline]
    fn from(error: ErrorStack) -> Error {
        Error::IoError(io::Error::from(error))
    }
}

impl From<io::ErrorKind> for Error {
    #[inline]
    fn from(kind: io::ErrorKind) -> Error {
        Error::IoError(kind.into())
    }
}

impl From<Error> for io::Error {
    #[inline]
    fn from(error: Error) -> io::Error {
        match error {
            Error::IoError(e) => e,
            e => io::Error::new(io::ErrorKind::Other, e),
        }
    }
}

impl error::Error for Indeterminate<Error> {}

impl Display for Indeterminate<Error> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let err_description = match self {
            Indeterminate::Known(error) => format!("Known Error: {error}"),
            Indeterminate::Unknown => "Unknown Error Encountered".to_string(),
        };

        write!(f, "{err_description}")
    }
}

impl From<io::Error> for Indeterminate<Error> {
    #[inline]
    fn from(error: io::Error) -> Indeterminate<Error> {
        Indeterminate::Known(error.into())
    }
}

impl From<Error> for Indeterminate<Error> {
    #[inline]
    fn from(error: Error) -> Indeterminate<Error> {
        Indeterminate::Known(error)
    }
}

impl From<u32> for Indeterminate<Error> {
    #[inline]
    fn from(code: u32) -> Indeterminate<Error> {
        Indeterminate::Known(Error::Firmware(code))
    }
}

impl From<Indeterminate<Error>> for Error {
    #[inline]
    fn from(indeterminate: Indeterminate<Error>) -> Error {
        match indeterminate {
            Indeterminate::Known(e) => e,
            Indeterminate::Unknown => {
                Error::IoError(io::Error::new(io::ErrorKind::Other, "unknown SEV error"))
            }
        }
    }
}

impl From<Indeterminate<Error>> for io::Error {
    #[inline]
    fn from(indeterminate: Indeterminate<Error>) -> io::Error {
        match indeterminate {
            Indeterminate::Known(e) => io::Error::new(io::ErrorKind::Other, e),
            Indeterminate::Unknown => io::Error::new(io::ErrorKind::Other, "unknown SEV error"),
        }
    }
}

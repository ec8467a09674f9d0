// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0

//! For operating on SEV platform certificates.

pub(crate) mod cert;
mod chain;
pub use cert::{Certificate, EccKey, Key, Slot, BODY_SIZE, SIZE};
pub use chain::Chain;

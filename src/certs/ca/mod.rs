// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0

//! For operating on Certificate Authority chains.

use super::*;
pub(crate) mod cert;
mod chain;
pub use cert::Certificate;
pub use chain::Chain;

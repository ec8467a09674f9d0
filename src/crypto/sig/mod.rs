// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0

//! Raw signature formats of platform certificates.

pub mod ecdsa;
pub mod rsa;

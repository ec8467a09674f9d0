// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0

//! Interfaces for public and private keys.

pub mod ecc;
pub mod group;
pub mod rsa;

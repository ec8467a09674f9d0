// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0

//! Modules for interfacing with SEV Firmware
//! Rust-friendly API wrappers to communicate the the FFI functions.

pub mod launch;
pub mod platform;

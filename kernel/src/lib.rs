// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Shared boot support.
//!
//! The kernel crate holds the pieces every arch and chip crate in this
//! workspace relies on: the `debug!` output path, the compile-time
//! configuration object, the common error type and the register interface
//! re-exports. Chip crates build on this rather than on the standard library.

#![no_std]

pub mod config;
pub mod debug;
pub mod errorcode;
pub mod utilities;

pub use crate::errorcode::ErrorCode;

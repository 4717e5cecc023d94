// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Support for the 32-bit RISC-V architecture.

#![no_std]

pub mod csr;
pub mod pmp;

/// Width of the integer registers on this architecture.
pub const XLEN: usize = 32;

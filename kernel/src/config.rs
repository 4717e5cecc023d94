// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Data structure for storing compile-time configuration options.
//!
//! Configuration lives in a typed `const` object instead of `#[cfg]` blocks
//! scattered through the code. Every code path stays type-checked, even the
//! ones a given image disables, and the compiler folds the constant booleans
//! away so a disabled branch costs nothing in the final binary.
//!
//! This is the only place in the workspace where Cargo features are read.

/// Data structure holding compile-time configuration options.
///
/// To change the configuration, enable the matching feature on the `kernel`
/// dependency of the board crate.
pub struct Config {
    /// Whether this image is the early-stage bootloader.
    ///
    /// The bootloader must leave memory protection entries for the combined
    /// code/data window unlocked so that the application image it hands over
    /// to can tighten them. Application images lock everything they write.
    pub bootloader_build: bool,

    /// Whether the hardened split code/data layout is compiled in.
    ///
    /// If enabled, the application image separates executable and writable
    /// memory with locked entries derived from linker-provided boundaries, so
    /// that no address is both writable and executable.
    pub pmp_idram_split: bool,

    /// Whether the memory protection configurator should print its decisions.
    ///
    /// If enabled, the resolved policy and both protection tables are written
    /// to the debug output once they have been installed.
    pub trace_pmp: bool,
}

/// A unique instance of `Config` where compile-time configuration options are
/// defined.
pub const CONFIG: Config = Config {
    bootloader_build: cfg!(feature = "bootloader_build"),
    pmp_idram_split: cfg!(feature = "pmp_idram_split"),
    trace_pmp: cfg!(feature = "trace_pmp"),
};

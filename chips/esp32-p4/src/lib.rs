// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Chip support for the ESP32-P4.
//!
//! Only the boot-time memory isolation pass lives here: the SoC memory map,
//! the boot context, and the planners that turn both into the vendor PMA
//! table (blocking invalid space) and the PMP table (granting access to valid
//! space).

#![no_std]

pub mod assist_debug;
pub mod boot_context;
pub mod boundaries;
pub mod gap_blocker;
pub mod memory_map;
pub mod pma;
pub mod policy;
pub mod region_protect;

#[cfg(test)]
mod fake;

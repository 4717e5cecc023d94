// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

use kernel::utilities::registers::{register_bitfields, Field};

// pmpcfgX packs the configuration octets of four consecutive entries on RV32.
register_bitfields![usize,
    pub pmpcfg [
        cfg0 OFFSET(0) NUMBITS(8) [],
        cfg1 OFFSET(8) NUMBITS(8) [],
        cfg2 OFFSET(16) NUMBITS(8) [],
        cfg3 OFFSET(24) NUMBITS(8) []
    ]
];

/// Entries configured by one pmpcfgX CSR.
pub const ENTRIES_PER_CSR: usize = 4;

/// The octet of `pmpcfg{entry / 4}` holding the configuration of `entry`.
pub const fn octet(entry: usize) -> Field<usize, pmpcfg::Register> {
    match entry % ENTRIES_PER_CSR {
        0 => pmpcfg::cfg0,
        1 => pmpcfg::cfg1,
        2 => pmpcfg::cfg2,
        _ => pmpcfg::cfg3,
    }
}

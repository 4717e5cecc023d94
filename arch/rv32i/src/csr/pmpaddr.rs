// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

use kernel::utilities::registers::register_bitfields;

// pmpaddrX holds bits 33:2 of a physical address.
register_bitfields![usize,
    pub pmpaddr [
        addr OFFSET(0) NUMBITS(crate::XLEN) []
    ]
];

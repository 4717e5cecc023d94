// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Split points provided by the linker script.

use kernel::ErrorCode;
use rv32i::pmp::AddressRange;

use crate::memory_map::SOC_MMU_PAGE_SIZE;

/// Round `addr` up to a multiple of `align`, which must be a power of two.
pub const fn align_up(addr: u64, align: u64) -> u64 {
    (addr + align - 1) & !(align - 1)
}

/// Two boundaries dividing one region into three consecutive slices.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SplitPoints {
    /// End of the first slice. For code/data memory the executable code
    /// starts here; for flash the code pages end here.
    pub first_end: u64,
    /// End of the second slice.
    pub second_end: u64,
}

impl SplitPoints {
    pub const fn new(first_end: u64, second_end: u64) -> Self {
        SplitPoints {
            first_end,
            second_end,
        }
    }

    /// The three slices of `region`. Fails with `INVAL` unless both points lie
    /// strictly inside `region` in order.
    pub fn slices(&self, region: AddressRange) -> Result<[AddressRange; 3], ErrorCode> {
        let low = region.low();
        let high = region.high();
        if !(low < self.first_end && self.first_end < self.second_end && self.second_end < high) {
            return Err(ErrorCode::INVAL);
        }
        Ok([
            AddressRange::new(low, self.first_end),
            AddressRange::new(self.first_end, self.second_end),
            AddressRange::new(self.second_end, high),
        ])
    }
}

/// Linker boundaries used when the split code/data layout is compiled in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LinkerBoundaries {
    /// Split of the combined code/data memory.
    pub code_data: SplitPoints,
    /// Split of the flash window. Points are rounded up to whole MMU pages.
    pub flash: SplitPoints,
}

impl LinkerBoundaries {
    pub const fn new(code_data: SplitPoints, text_end: u64, rodata_end: u64) -> Self {
        LinkerBoundaries {
            code_data,
            flash: SplitPoints::new(
                align_up(text_end, SOC_MMU_PAGE_SIZE),
                align_up(rodata_end, SOC_MMU_PAGE_SIZE),
            ),
        }
    }

    /// Read the boundaries of the running image.
    ///
    /// The board linker script must export these symbols, as the ESP-IDF
    /// scripts do:
    ///
    /// | Symbol                      | Marks                                       |
    /// |-----------------------------|---------------------------------------------|
    /// | `_iram_text_start`          | first executable byte in L2MEM              |
    /// | `_data_start`               | first writable byte in L2MEM                |
    /// | `_instruction_reserved_end` | end of the flash pages mapped for code      |
    /// | `_rodata_reserved_end`      | end of the flash pages mapped for rodata    |
    #[cfg(all(target_arch = "riscv32", target_os = "none"))]
    pub fn from_linker() -> Self {
        extern "C" {
            static _iram_text_start: u8;
            static _data_start: u8;
            static _instruction_reserved_end: u8;
            static _rodata_reserved_end: u8;
        }

        let code_data = SplitPoints::new(
            core::ptr::addr_of!(_iram_text_start) as usize as u64,
            core::ptr::addr_of!(_data_start) as usize as u64,
        );
        LinkerBoundaries::new(
            code_data,
            core::ptr::addr_of!(_instruction_reserved_end) as usize as u64,
            core::ptr::addr_of!(_rodata_reserved_end) as usize as u64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flash_points_are_page_aligned() {
        let boundaries = LinkerBoundaries::new(
            SplitPoints::new(0x4FF1_0000, 0x4FF2_0000),
            0x4002_3456,
            0x4005_0000,
        );
        assert_eq!(boundaries.flash, SplitPoints::new(0x4003_0000, 0x4005_0000));
        assert_eq!(
            boundaries.code_data,
            SplitPoints::new(0x4FF1_0000, 0x4FF2_0000)
        );
    }

    #[test]
    fn code_data_points_are_code_and_data_starts() {
        // _iram_text_start and _data_start inside l2mem.
        let l2mem = AddressRange::new(0x4FF0_0000, 0x4FFC_0000);
        let [reserved, code, data] = SplitPoints::new(0x4FF1_0000, 0x4FF4_0000)
            .slices(l2mem)
            .unwrap();
        assert_eq!(reserved, AddressRange::new(0x4FF0_0000, 0x4FF1_0000));
        assert_eq!(code.low(), 0x4FF1_0000);
        assert_eq!(data, AddressRange::new(0x4FF4_0000, 0x4FFC_0000));
    }

    #[test]
    fn slices_cover_the_region() {
        let region = AddressRange::new(0x1000, 0x2000);
        assert_eq!(
            SplitPoints::new(0x1800, 0x1C00).slices(region),
            Ok([
                AddressRange::new(0x1000, 0x1800),
                AddressRange::new(0x1800, 0x1C00),
                AddressRange::new(0x1C00, 0x2000),
            ])
        );
    }

    #[test]
    fn points_outside_or_out_of_order_are_rejected() {
        let region = AddressRange::new(0x1000, 0x2000);
        for points in [
            SplitPoints::new(0x1C00, 0x1800),
            SplitPoints::new(0x1000, 0x1800),
            SplitPoints::new(0x1800, 0x2000),
            SplitPoints::new(0x1800, 0x1800),
            SplitPoints::new(0x0800, 0x1800),
        ] {
            assert_eq!(points.slices(region), Err(ErrorCode::INVAL));
        }
    }
}

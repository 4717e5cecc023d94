// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! ESP32-P4 physical memory map.
//!
//! The catalog lists every valid address window of the SoC in ascending
//! order. Everything the protection planners emit is derived from it, so the
//! catalog is validated at compile time.

use rv32i::pmp::{AddressRange, Permissions, ADDRESS_SPACE_END};

/// Slots in the vendor PMA table.
pub const PMA_ENTRIES: usize = 16;
/// Slots in the standard PMP table.
pub const PMP_ENTRIES: usize = 16;

/// Granularity of the flash cache MMU.
pub const SOC_MMU_PAGE_SIZE: u64 = 0x1_0000;

/// What a window of the memory map holds. The kind selects the permissions
/// the window receives.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegionKind {
    /// CPU control and debug subsystem.
    CpuSubsystem,
    Memory,
    Peripheral,
    Rom,
    /// Flash seen through the instruction/data cache.
    Flash,
    /// The combined code/data memory the boot policy splits.
    CodeData,
    /// Low-power memory that survives deep sleep and may hold code.
    RetentionMemory,
}

impl RegionKind {
    /// Whether the permissions of this kind depend on the boot policy.
    pub const fn is_policy_driven(self) -> bool {
        matches!(self, RegionKind::Flash | RegionKind::CodeData)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MemoryRegion {
    pub name: &'static str,
    pub range: AddressRange,
    pub kind: RegionKind,
    /// Reachable through the cache, so part of the whitelisted window.
    pub cacheable: bool,
}

impl MemoryRegion {
    pub const fn new(
        name: &'static str,
        low: u64,
        high: u64,
        kind: RegionKind,
        cacheable: bool,
    ) -> Self {
        MemoryRegion {
            name,
            range: AddressRange::new(low, high),
            kind,
            cacheable,
        }
    }
}

/// A single address that must end up with at least `required` access.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PermissionHint {
    pub name: &'static str,
    pub addr: u64,
    pub required: Permissions,
}

pub struct RegionCatalog {
    /// Valid windows, ascending and non-overlapping.
    pub regions: &'static [MemoryRegion],
    /// Range left fully accessible by the gap table so that cached accesses
    /// keep working until the PMP narrows them.
    pub cacheable_window: Option<AddressRange>,
    pub hints: &'static [PermissionHint],
}

impl RegionCatalog {
    /// Panic on a malformed catalog. Evaluated in a `const` item this turns
    /// catalog defects into build failures.
    pub const fn validate(&self) {
        let regions = self.regions;
        assert!(!regions.is_empty(), "catalog has no regions");

        let mut code_data = 0;
        let mut flash = 0;
        let mut i = 0;
        while i < regions.len() {
            let region = &regions[i];
            if i + 1 < regions.len() {
                assert!(
                    region.range.high() <= regions[i + 1].range.low(),
                    "catalog regions must be ascending and must not overlap"
                );
            }
            match region.kind {
                RegionKind::CodeData => code_data += 1,
                RegionKind::Flash => flash += 1,
                _ => {}
            }
            if let Some(window) = self.cacheable_window {
                if window.intersects(&region.range) {
                    assert!(
                        region.cacheable && window.contains_range(&region.range),
                        "whitelisted window must consist of whole cacheable regions"
                    );
                }
            }
            i += 1;
        }
        assert!(code_data <= 1, "catalog has more than one code/data region");
        assert!(flash <= 1, "catalog has more than one flash region");

        if let Some(window) = self.cacheable_window {
            assert!(
                window.is_napot(),
                "whitelisted window must be a naturally aligned power of two"
            );
        }

        let mut h = 0;
        while h < self.hints.len() {
            assert!(
                self.region_index(self.hints[h].addr).is_some(),
                "permission hint outside of every region"
            );
            h += 1;
        }
    }

    /// Index of the region containing `addr`.
    pub const fn region_index(&self, addr: u64) -> Option<usize> {
        let mut i = 0;
        while i < self.regions.len() {
            if self.regions[i].range.contains(addr) {
                return Some(i);
            }
            i += 1;
        }
        None
    }

    pub fn region_containing(&self, addr: u64) -> Option<&MemoryRegion> {
        self.region_index(addr).map(|i| &self.regions[i])
    }

    /// The invalid space directly below region `index`, or above the last
    /// region when `index == regions.len()`. `None` where nothing is missing.
    pub const fn gap_before(&self, index: usize) -> Option<AddressRange> {
        let low = match index {
            0 => 0,
            _ => self.regions[index - 1].range.high(),
        };
        let high = if index == self.regions.len() {
            ADDRESS_SPACE_END
        } else {
            self.regions[index].range.low()
        };
        AddressRange::try_new(low, high)
    }

    /// Complement of the catalog in ascending order.
    pub fn gaps(&self) -> impl Iterator<Item = AddressRange> + '_ {
        (0..=self.regions.len()).filter_map(move |index| self.gap_before(index))
    }
}

const ESP32_P4_REGIONS: [MemoryRegion; 10] = [
    MemoryRegion::new(
        "cpu_subsystem",
        0x2000_0000,
        0x3000_0000,
        RegionKind::CpuSubsystem,
        false,
    ),
    MemoryRegion::new("hp_tcm", 0x3010_0000, 0x3010_2000, RegionKind::Memory, false),
    MemoryRegion::new(
        "cpu_peripherals",
        0x3FF0_0000,
        0x3FF2_0000,
        RegionKind::Peripheral,
        false,
    ),
    MemoryRegion::new("flash", 0x4000_0000, 0x4400_0000, RegionKind::Flash, true),
    MemoryRegion::new("psram", 0x4800_0000, 0x4C00_0000, RegionKind::Memory, true),
    MemoryRegion::new("rom", 0x4FC0_0000, 0x4FC2_0000, RegionKind::Rom, true),
    MemoryRegion::new("l2mem", 0x4FF0_0000, 0x4FFC_0000, RegionKind::CodeData, true),
    MemoryRegion::new(
        "hp_peripherals",
        0x5000_0000,
        0x5010_0000,
        RegionKind::Peripheral,
        false,
    ),
    MemoryRegion::new(
        "lp_sram",
        0x5010_8000,
        0x5011_0000,
        RegionKind::RetentionMemory,
        false,
    ),
    MemoryRegion::new(
        "lp_peripherals",
        0x5011_0000,
        0x5012_0000,
        RegionKind::Peripheral,
        false,
    ),
];

const ESP32_P4_HINTS: [PermissionHint; 2] = [
    PermissionHint {
        name: "debug",
        addr: 0x2000_0000,
        required: Permissions::ReadWriteOnly,
    },
    PermissionHint {
        name: "application",
        addr: 0x4000_0020,
        required: Permissions::ReadExecuteOnly,
    },
];

pub const ESP32_P4: RegionCatalog = RegionCatalog {
    regions: &ESP32_P4_REGIONS,
    cacheable_window: Some(AddressRange::new(0x4000_0000, 0x5000_0000)),
    hints: &ESP32_P4_HINTS,
};

const _: () = ESP32_P4.validate();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaps_complement_the_catalog() {
        let mut gaps = ESP32_P4.gaps();
        assert_eq!(gaps.next(), Some(AddressRange::new(0, 0x2000_0000)));
        assert_eq!(
            gaps.next(),
            Some(AddressRange::new(0x3000_0000, 0x3010_0000))
        );
        // lp_sram and lp_peripherals are adjacent, so the last gap starts
        // above lp_peripherals.
        assert_eq!(
            gaps.last(),
            Some(AddressRange::new(0x5012_0000, ADDRESS_SPACE_END))
        );
        assert_eq!(ESP32_P4.gaps().count(), 10);
    }

    #[test]
    fn adjacent_regions_leave_no_gap() {
        const ADJACENT: RegionCatalog = RegionCatalog {
            regions: &[
                MemoryRegion::new("a", 0, 0x1000, RegionKind::Memory, false),
                MemoryRegion::new("b", 0x1000, 0x2000, RegionKind::Peripheral, false),
            ],
            cacheable_window: None,
            hints: &[],
        };
        ADJACENT.validate();
        let gaps: [Option<AddressRange>; 3] = [
            ADJACENT.gap_before(0),
            ADJACENT.gap_before(1),
            ADJACENT.gap_before(2),
        ];
        assert_eq!(
            gaps,
            [None, None, Some(AddressRange::new(0x2000, ADDRESS_SPACE_END))]
        );
    }

    #[test]
    fn region_lookup() {
        assert_eq!(
            ESP32_P4.region_containing(0x4FF0_1234).map(|r| r.name),
            Some("l2mem")
        );
        assert_eq!(ESP32_P4.region_containing(0x4FFC_0000), None);
        assert_eq!(
            ESP32_P4.region_containing(0x5011_0000).map(|r| r.name),
            Some("lp_peripherals")
        );
    }

    #[test]
    #[should_panic(expected = "catalog regions must be ascending and must not overlap")]
    fn overlapping_regions_are_rejected() {
        const CATALOG: RegionCatalog = RegionCatalog {
            regions: &[
                MemoryRegion::new("a", 0x1000, 0x3000, RegionKind::Memory, false),
                MemoryRegion::new("b", 0x2000, 0x4000, RegionKind::Memory, false),
            ],
            cacheable_window: None,
            hints: &[],
        };
        CATALOG.validate();
    }

    #[test]
    #[should_panic(expected = "whitelisted window must consist of whole cacheable regions")]
    fn whitelist_over_uncached_region_is_rejected() {
        const CATALOG: RegionCatalog = RegionCatalog {
            regions: &[
                MemoryRegion::new("cached", 0x1000, 0x2000, RegionKind::Memory, true),
                MemoryRegion::new("mmio", 0x3000, 0x4000, RegionKind::Peripheral, false),
            ],
            cacheable_window: Some(AddressRange::new(0, 0x4000)),
            hints: &[],
        };
        CATALOG.validate();
    }

    #[test]
    #[should_panic(expected = "permission hint outside of every region")]
    fn stray_hint_is_rejected() {
        const CATALOG: RegionCatalog = RegionCatalog {
            regions: &[MemoryRegion::new("a", 0x1000, 0x2000, RegionKind::Memory, false)],
            cacheable_window: None,
            hints: &[PermissionHint {
                name: "stray",
                addr: 0x2000,
                required: Permissions::ReadOnly,
            }],
        };
        CATALOG.validate();
    }
}

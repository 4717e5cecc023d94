// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Deny-all entries for every address outside the memory map.
//!
//! Gaps are emitted bottom to top into the PMA table, each as one NAPOT entry
//! where possible and as a TOR pair otherwise. All entries are locked and
//! identical in every boot stage.
//!
//! The cacheable window is the one exception. It is granted full access so
//! that cached accesses work before the PMP narrows them, and is placed
//! directly above the last gap that intersects it. Those gaps keep their
//! lower slot numbers and therefore still deny their part of the window.

use kernel::ErrorCode;
use rv32i::pmp::{
    encode_range, AddressRange, EncodedEntry, NAPOTRegionSpec, Permissions, ProtectionTable,
};

use crate::memory_map::{RegionCatalog, ESP32_P4, PMA_ENTRIES};

const GAP_PERMISSIONS: Permissions = Permissions::NoAccess;
const WINDOW_PERMISSIONS: Permissions = Permissions::ReadWriteExecute;

/// Slots the gap table of `catalog` occupies.
pub const fn required_slots(catalog: &RegionCatalog) -> usize {
    let mut slots = 0;
    let mut tor_base = Some(0);
    let mut window_placed = catalog.cacheable_window.is_none();

    let mut index = 0;
    while index <= catalog.regions.len() {
        if let Some(gap) = catalog.gap_before(index) {
            if let Some(window) = catalog.cacheable_window {
                if !window_placed && gap.low() >= window.high() {
                    tor_base = Some(window_entry_base(window));
                    slots += 1;
                    window_placed = true;
                }
            }
            match encode_range(gap, GAP_PERMISSIONS, true, tor_base) {
                Ok(encoding) => {
                    slots += encoding.slots();
                    tor_base = Some(encoding.last().next_tor_base());
                }
                Err(_) => panic!("gap cannot be encoded"),
            }
        }
        index += 1;
    }
    if !window_placed {
        slots += 1;
    }
    slots
}

const fn window_entry_base(window: AddressRange) -> u64 {
    match NAPOTRegionSpec::new(window) {
        Some(spec) => EncodedEntry::napot(spec, WINDOW_PERMISSIONS, true).next_tor_base(),
        None => panic!("whitelisted window must be a naturally aligned power of two"),
    }
}

const _: () = assert!(
    required_slots(&ESP32_P4) <= PMA_ENTRIES,
    "ESP32-P4 gaps do not fit the PMA table"
);

/// The planned gap table.
pub struct GapPlan<const N: usize> {
    pub table: ProtectionTable<N>,
    /// Slot granting access to the cacheable window.
    pub window_slot: Option<usize>,
    overrides: [bool; N],
}

impl<const N: usize> GapPlan<N> {
    /// Gap slots that take precedence over the window entry inside the
    /// window.
    pub fn overriding_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.overrides
            .iter()
            .enumerate()
            .filter(|(_, overrides)| **overrides)
            .map(|(slot, _)| slot)
    }
}

/// Lay out the gap table for `catalog`. Every used slot is reset before it
/// is written, since an earlier stage may have left bits behind.
pub fn plan<const N: usize>(catalog: &RegionCatalog) -> Result<GapPlan<N>, ErrorCode> {
    let mut table = ProtectionTable::<N>::new();
    let mut window_slot = None;

    for gap in catalog.gaps() {
        if let Some(window) = catalog.cacheable_window {
            if window_slot.is_none() && gap.low() >= window.high() {
                window_slot = Some(table.push_napot(window, WINDOW_PERMISSIONS, true)?);
            }
        }
        table.push_range(gap, GAP_PERMISSIONS, true)?;
    }
    if let (Some(window), None) = (catalog.cacheable_window, window_slot) {
        window_slot = Some(table.push_napot(window, WINDOW_PERMISSIONS, true)?);
    }

    for slot in 0..table.next_slot() {
        if table.get(slot).is_some() {
            table.reset_before_install(slot)?;
        }
    }

    let overrides = check_window(catalog, &table, window_slot)?;
    Ok(GapPlan {
        table,
        window_slot,
        overrides,
    })
}

/// Verify that the window entry is overridden by every gap inside it and
/// covers only cacheable regions. Returns the overriding slots.
fn check_window<const N: usize>(
    catalog: &RegionCatalog,
    table: &ProtectionTable<N>,
    window_slot: Option<usize>,
) -> Result<[bool; N], ErrorCode> {
    let mut overrides = [false; N];
    let (Some(window), Some(window_slot)) = (catalog.cacheable_window, window_slot) else {
        return Ok(overrides);
    };

    if table.range_of(window_slot) != Some(window) {
        return Err(ErrorCode::INVAL);
    }
    for (slot, _) in table.entries() {
        if slot == window_slot {
            continue;
        }
        if let Some(gap) = table.range_of(slot) {
            if gap.intersects(&window) {
                if slot > window_slot {
                    return Err(ErrorCode::INVAL);
                }
                overrides[slot] = true;
            }
        }
    }

    let uncached = catalog.regions.iter().any(|region| {
        region.range.intersects(&window)
            && !(region.cacheable && window.contains_range(&region.range))
    });
    if uncached {
        return Err(ErrorCode::INVAL);
    }
    Ok(overrides)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_map::{MemoryRegion, RegionKind};
    use rv32i::pmp::{AddressMode, ADDRESS_SPACE_END};

    const TWO_REGIONS: RegionCatalog = RegionCatalog {
        regions: &[
            MemoryRegion::new("a", 0x1000, 0x2000, RegionKind::CodeData, false),
            MemoryRegion::new("b", 0x3000, 0x4000, RegionKind::Memory, false),
        ],
        cacheable_window: None,
        hints: &[],
    };

    #[test]
    fn two_region_catalog() {
        let plan = plan::<PMA_ENTRIES>(&TWO_REGIONS).unwrap();
        let table = &plan.table;
        assert_eq!(plan.window_slot, None);
        assert_eq!(table.next_slot(), required_slots(&TWO_REGIONS));

        assert_eq!(table.range_of(0), Some(AddressRange::new(0, 0x1000)));
        assert_eq!(table.range_of(1), Some(AddressRange::new(0x2000, 0x3000)));
        assert_eq!(table.get(2).map(|entry| entry.mode()), Some(AddressMode::Off));
        assert_eq!(
            table.range_of(3),
            Some(AddressRange::new(0x4000, ADDRESS_SPACE_END))
        );
        for (_, entry) in table.entries() {
            assert!(entry.locked());
            assert_eq!(entry.permissions(), Permissions::NoAccess);
        }
        assert_eq!(table.resets().count(), 4);
    }

    #[test]
    fn esp32_p4_layout() {
        let plan = plan::<PMA_ENTRIES>(&ESP32_P4).unwrap();
        let table = &plan.table;
        assert_eq!(required_slots(&ESP32_P4), PMA_ENTRIES);
        assert_eq!(table.next_slot(), PMA_ENTRIES);
        assert_eq!(plan.window_slot, Some(12));

        let expected: [(usize, u64, u64); 11] = [
            (0, 0, 0x2000_0000),
            (1, 0x3000_0000, 0x3010_0000),
            (3, 0x3010_2000, 0x3FF0_0000),
            (5, 0x3FF2_0000, 0x4000_0000),
            (6, 0x4400_0000, 0x4800_0000),
            (8, 0x4C00_0000, 0x4FC0_0000),
            (10, 0x4FC2_0000, 0x4FF0_0000),
            (11, 0x4FFC_0000, 0x5000_0000),
            (12, 0x4000_0000, 0x5000_0000),
            (13, 0x5010_0000, 0x5010_8000),
            (15, 0x5012_0000, ADDRESS_SPACE_END),
        ];
        for (slot, low, high) in expected {
            assert_eq!(
                table.range_of(slot),
                Some(AddressRange::new(low, high)),
                "slot {}",
                slot
            );
        }
        for anchor in [2, 4, 7, 9, 14] {
            assert_eq!(table.get(anchor).map(|e| e.mode()), Some(AddressMode::Off));
        }
    }

    #[test]
    fn window_dependencies_are_recorded() {
        let plan = plan::<PMA_ENTRIES>(&ESP32_P4).unwrap();
        let mut overriding = [0usize; 4];
        let mut count = 0;
        for slot in plan.overriding_slots() {
            overriding[count] = slot;
            count += 1;
        }
        assert_eq!((count, overriding), (4, [6, 8, 10, 11]));
    }

    #[test]
    fn adjacent_regions_emit_nothing_between_them() {
        const ADJACENT: RegionCatalog = RegionCatalog {
            regions: &[
                MemoryRegion::new("a", 0x1000, 0x2000, RegionKind::Memory, false),
                MemoryRegion::new("b", 0x2000, 0x4000, RegionKind::Memory, false),
            ],
            cacheable_window: None,
            hints: &[],
        };
        let plan = plan::<PMA_ENTRIES>(&ADJACENT).unwrap();
        let table = &plan.table;
        assert_eq!(table.next_slot(), 3);
        for addr in [0x1000, 0x1FFF, 0x2000, 0x3FFF] {
            assert_eq!(table.matching_entry(addr), None);
        }
        assert_eq!(table.matching_entry(0x0FFF).map(|(slot, _)| slot), Some(0));
        assert_eq!(table.matching_entry(0x4000).map(|(slot, _)| slot), Some(2));
    }

    #[test]
    fn catalog_covering_everything_needs_no_gaps() {
        const WHOLE: RegionCatalog = RegionCatalog {
            regions: &[MemoryRegion::new(
                "all",
                0,
                ADDRESS_SPACE_END,
                RegionKind::Memory,
                false,
            )],
            cacheable_window: None,
            hints: &[],
        };
        assert_eq!(required_slots(&WHOLE), 0);
        assert_eq!(plan::<PMA_ENTRIES>(&WHOLE).unwrap().table.next_slot(), 0);
    }

    #[test]
    fn too_many_gaps_are_reported() {
        assert_eq!(
            plan::<8>(&ESP32_P4).map(|plan| plan.table.next_slot()),
            Err(ErrorCode::SIZE)
        );
    }

    #[test]
    fn window_over_uncached_region_is_rejected() {
        const BAD_WINDOW: RegionCatalog = RegionCatalog {
            regions: &[
                MemoryRegion::new("cached", 0x1000, 0x2000, RegionKind::Memory, true),
                MemoryRegion::new("mmio", 0x3000, 0x4000, RegionKind::Peripheral, false),
            ],
            cacheable_window: Some(AddressRange::new(0, 0x4000)),
            hints: &[],
        };
        assert_eq!(
            plan::<PMA_ENTRIES>(&BAD_WINDOW).map(|plan| plan.window_slot),
            Err(ErrorCode::INVAL)
        );
    }
}

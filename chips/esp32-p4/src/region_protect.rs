// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Boot-time memory isolation.
//!
//! `configure_region_protection` runs once per hart, early in boot. It plans
//! the PMA table (deny everything outside the memory map) and the PMP table
//! (grant each region its access), checks both, and only then writes them to
//! the hardware, PMA first. Any planning error halts the boot.
//!
//! PMP slot usage does not depend on the boot stage. Regions whose layout
//! does depend on it reserve [`POLICY_REGION_SLOTS`] slots, which are reset
//! before being written so that bits left by the bootloader cannot survive
//! into the application.

use kernel::config::CONFIG;
use kernel::debug;
use kernel::ErrorCode;
use rv32i::pmp::{encode_range, EncodedEntry, EntryInstaller, Permissions, ProtectionTable};

use crate::boot_context::{BootContext, DebuggerProbe};
use crate::boundaries::LinkerBoundaries;
use crate::gap_blocker;
use crate::memory_map::{RegionCatalog, RegionKind, ESP32_P4, PMA_ENTRIES, PMP_ENTRIES};
use crate::policy::{flash_layout, Layout, Policy};

/// Slots reserved for a policy-driven region: an anchor and three TOR
/// entries when it is split.
pub const POLICY_REGION_SLOTS: usize = 4;

/// Access for regions whose permissions do not depend on the boot policy.
/// These entries are locked in every stage. Returns `None` for policy-driven
/// kinds.
pub const fn fixed_permissions(kind: RegionKind) -> Option<Permissions> {
    match kind {
        RegionKind::CpuSubsystem | RegionKind::Memory | RegionKind::Peripheral => {
            Some(Permissions::ReadWriteOnly)
        }
        RegionKind::Rom => Some(Permissions::ReadExecuteOnly),
        RegionKind::RetentionMemory => Some(Permissions::ReadWriteExecute),
        RegionKind::Flash | RegionKind::CodeData => None,
    }
}

/// Slots the PMP table of `catalog` occupies, in every boot stage.
pub const fn required_slots(catalog: &RegionCatalog) -> usize {
    let mut slots = 0;
    let mut tor_base = Some(0);

    let mut i = 0;
    while i < catalog.regions.len() {
        let region = &catalog.regions[i];
        if region.kind.is_policy_driven() {
            slots += POLICY_REGION_SLOTS;
            tor_base = None;
        } else {
            match encode_range(region.range, Permissions::NoAccess, true, tor_base) {
                Ok(encoding) => {
                    slots += encoding.slots();
                    tor_base = Some(encoding.last().next_tor_base());
                }
                Err(_) => panic!("region cannot be encoded"),
            }
        }
        i += 1;
    }
    slots
}

const _: () = assert!(
    required_slots(&ESP32_P4) <= PMP_ENTRIES,
    "ESP32-P4 regions do not fit the PMP table"
);

/// Lay out the PMP table for `catalog` under the policy `ctx` selects.
///
/// `boundaries` are required whenever a region is split.
pub fn plan_regions<const N: usize>(
    catalog: &RegionCatalog,
    ctx: &BootContext,
    boundaries: Option<&LinkerBoundaries>,
) -> Result<ProtectionTable<N>, ErrorCode> {
    let policy = Policy::resolve(ctx);
    let mut table = ProtectionTable::<N>::new();
    let mut tor_base = Some(0);

    for region in catalog.regions {
        if let Some(permissions) = fixed_permissions(region.kind) {
            let encoding = encode_range(region.range, permissions, true, tor_base)?;
            for entry in encoding.entries() {
                table.push(entry)?;
            }
            tor_base = Some(encoding.last().next_tor_base());
            continue;
        }

        let layout = match region.kind {
            RegionKind::Flash => flash_layout(ctx, region.range, boundaries.map(|b| b.flash))?,
            _ => policy.code_data_layout(region.range, boundaries.map(|b| b.code_data))?,
        };
        let first = table.next_slot();
        let end = first + POLICY_REGION_SLOTS;
        if end > N {
            return Err(ErrorCode::SIZE);
        }
        for slot in first..end {
            table.reset_before_install(slot)?;
        }
        push_layout(&mut table, &layout)?;
        table.skip_to(end)?;
        tor_base = None;
    }

    check_hints(catalog, &table)?;
    Ok(table)
}

fn push_layout<const N: usize>(
    table: &mut ProtectionTable<N>,
    layout: &Layout,
) -> Result<(), ErrorCode> {
    match layout {
        Layout::Span(slice) => {
            // The slot below belongs to another region, never use it as base.
            let encoding = encode_range(slice.range, slice.permissions, slice.locked, None)?;
            for entry in encoding.entries() {
                table.push(entry)?;
            }
        }
        Layout::Split(slices) => {
            table.push(EncodedEntry::anchor(slices[0].range.low(), slices[0].locked)?)?;
            for slice in slices {
                table.push(EncodedEntry::tor(
                    slice.range.high(),
                    slice.permissions,
                    slice.locked,
                )?)?;
            }
        }
    }
    Ok(())
}

fn check_hints<const N: usize>(
    catalog: &RegionCatalog,
    table: &ProtectionTable<N>,
) -> Result<(), ErrorCode> {
    for hint in catalog.hints {
        let granted = table
            .matching_entry(hint.addr)
            .map(|(_, entry)| entry.permissions());
        if !granted.is_some_and(|permissions| permissions.includes(hint.required)) {
            return Err(ErrorCode::INVAL);
        }
    }
    Ok(())
}

/// Plan both tables for `catalog` and install them through `pma` and `pmp`.
///
/// Panics on any planning error, and if `probe` no longer reports the
/// debugger that selected the debug override. Nothing is written in either
/// case.
pub fn configure_region_protection_with<P, G, R>(
    catalog: &RegionCatalog,
    ctx: &BootContext,
    boundaries: Option<&LinkerBoundaries>,
    probe: &P,
    pma: &G,
    pmp: &R,
) where
    P: DebuggerProbe + ?Sized,
    G: EntryInstaller + ?Sized,
    R: EntryInstaller + ?Sized,
{
    let policy = Policy::resolve(ctx);

    let gaps = match gap_blocker::plan::<PMA_ENTRIES>(catalog) {
        Ok(gaps) => gaps,
        Err(err) => panic!("PMA layout rejected: {:?}", err),
    };
    let regions = match plan_regions::<PMP_ENTRIES>(catalog, ctx, boundaries) {
        Ok(regions) => regions,
        Err(err) => panic!("PMP layout rejected: {:?}", err),
    };

    // A glitched branch must not leave the debug override installed.
    if policy == Policy::DebugOverride && !probe.debugger_attached() {
        panic!("debugger state changed while configuring memory protection");
    }

    if let Err(err) = gaps.table.install(pma) {
        panic!("PMA install failed: {:?}", err);
    }
    if let Err(err) = regions.install(pmp) {
        panic!("PMP install failed: {:?}", err);
    }

    if CONFIG.trace_pmp {
        debug!("memory protection: {:?} ({:?})", policy, ctx);
        debug!("PMA:\n{}", gaps.table);
        debug!("PMP:\n{}", regions);
    }
}

/// Configure memory isolation for the running image on this hart.
#[cfg(all(target_arch = "riscv32", target_os = "none"))]
pub fn configure_region_protection() {
    use crate::assist_debug::{AssistDebug, ASSIST_DEBUG_BASE};
    use crate::pma::Pma;
    use rv32i::pmp::CsrPmp;

    let probe = AssistDebug::new(ASSIST_DEBUG_BASE);
    let ctx = BootContext::snapshot(&probe);
    let boundaries = if CONFIG.pmp_idram_split && !CONFIG.bootloader_build {
        Some(LinkerBoundaries::from_linker())
    } else {
        None
    };

    configure_region_protection_with(
        &ESP32_P4,
        &ctx,
        boundaries.as_ref(),
        &probe,
        &Pma,
        &CsrPmp::<PMP_ENTRIES>::new(),
    );
}

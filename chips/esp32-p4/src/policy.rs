// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Boot policy for the regions whose permissions depend on the boot context.
//!
//! | debugger | stage       | split | policy          | code/data region              |
//! |----------|-------------|-------|-----------------|-------------------------------|
//! | yes      | any         | any   | `DebugOverride` | RWX, unlocked                 |
//! | no       | bootloader  | any   | `Bootloader`    | RWX, unlocked                 |
//! | no       | application | yes   | `SplitCodeData` | none / RX / RW, locked        |
//! | no       | application | no    | `Unified`       | RWX, locked                   |

use kernel::ErrorCode;
use rv32i::pmp::{AddressRange, Permissions};

use crate::boot_context::{BootContext, BootStage};
use crate::boundaries::SplitPoints;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Policy {
    /// A debugger needs to write and execute anywhere in code/data memory.
    DebugOverride,
    /// Leave code/data memory open for the application to reconfigure.
    Bootloader,
    /// No address of code/data memory is both writable and executable.
    SplitCodeData,
    Unified,
}

impl Policy {
    pub const fn resolve(ctx: &BootContext) -> Policy {
        match (ctx.debugger_attached, ctx.stage, ctx.split_code_data) {
            (true, _, _) => Policy::DebugOverride,
            (false, BootStage::Bootloader, _) => Policy::Bootloader,
            (false, BootStage::Application, true) => Policy::SplitCodeData,
            (false, BootStage::Application, false) => Policy::Unified,
        }
    }

    /// Layout of the combined code/data region. `points` are only needed for
    /// `SplitCodeData`.
    pub fn code_data_layout(
        self,
        region: AddressRange,
        points: Option<SplitPoints>,
    ) -> Result<Layout, ErrorCode> {
        match self {
            Policy::DebugOverride | Policy::Bootloader => Ok(Layout::Span(Slice::new(
                region,
                Permissions::ReadWriteExecute,
                false,
            ))),
            Policy::Unified => Ok(Layout::Span(Slice::new(
                region,
                Permissions::ReadWriteExecute,
                true,
            ))),
            Policy::SplitCodeData => {
                let [reserved, code, data] = points.ok_or(ErrorCode::INVAL)?.slices(region)?;
                Ok(Layout::Split([
                    Slice::new(reserved, Permissions::NoAccess, true),
                    Slice::new(code, Permissions::ReadExecuteOnly, true),
                    Slice::new(data, Permissions::ReadWriteOnly, true),
                ]))
            }
        }
    }
}

/// Layout of the flash window. It is split into text, rodata and unused pages
/// whenever an application with the split layout boots, debugger or not.
pub fn flash_layout(
    ctx: &BootContext,
    region: AddressRange,
    points: Option<SplitPoints>,
) -> Result<Layout, ErrorCode> {
    match (ctx.stage, ctx.split_code_data) {
        (BootStage::Application, true) => {
            let [text, rodata, unused] = points.ok_or(ErrorCode::INVAL)?.slices(region)?;
            Ok(Layout::Split([
                Slice::new(text, Permissions::ReadExecuteOnly, true),
                Slice::new(rodata, Permissions::ReadOnly, true),
                Slice::new(unused, Permissions::NoAccess, true),
            ]))
        }
        (stage, _) => Ok(Layout::Span(Slice::new(
            region,
            Permissions::ReadExecuteOnly,
            stage == BootStage::Application,
        ))),
    }
}

/// A contiguous piece of a region with uniform access.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Slice {
    pub range: AddressRange,
    pub permissions: Permissions,
    pub locked: bool,
}

impl Slice {
    pub const fn new(range: AddressRange, permissions: Permissions, locked: bool) -> Self {
        Slice {
            range,
            permissions,
            locked,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Layout {
    /// The whole region with one set of permissions.
    Span(Slice),
    /// Three consecutive slices, lowest first.
    Split([Slice; 3]),
}

impl Layout {
    pub fn slices(&self) -> &[Slice] {
        match self {
            Layout::Span(slice) => core::slice::from_ref(slice),
            Layout::Split(slices) => slices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGION: AddressRange = AddressRange::new(0x1000, 0x2000);
    const POINTS: SplitPoints = SplitPoints::new(0x1800, 0x1C00);

    fn policy(stage: BootStage, debugger: bool, split: bool) -> Policy {
        Policy::resolve(&BootContext::new(stage, debugger, split))
    }

    #[test]
    fn resolve_is_a_flat_table() {
        use BootStage::{Application, Bootloader};

        for split in [false, true] {
            assert_eq!(policy(Bootloader, true, split), Policy::DebugOverride);
            assert_eq!(policy(Application, true, split), Policy::DebugOverride);
            assert_eq!(policy(Bootloader, false, split), Policy::Bootloader);
        }
        assert_eq!(policy(Application, false, true), Policy::SplitCodeData);
        assert_eq!(policy(Application, false, false), Policy::Unified);
    }

    #[test]
    fn split_application_locks_three_slices() {
        let layout = Policy::SplitCodeData
            .code_data_layout(REGION, Some(POINTS))
            .unwrap();
        assert_eq!(
            layout.slices(),
            &[
                Slice::new(
                    AddressRange::new(0x1000, 0x1800),
                    Permissions::NoAccess,
                    true
                ),
                Slice::new(
                    AddressRange::new(0x1800, 0x1C00),
                    Permissions::ReadExecuteOnly,
                    true
                ),
                Slice::new(
                    AddressRange::new(0x1C00, 0x2000),
                    Permissions::ReadWriteOnly,
                    true
                ),
            ]
        );
    }

    #[test]
    fn split_without_boundaries_is_rejected() {
        assert_eq!(
            Policy::SplitCodeData.code_data_layout(REGION, None),
            Err(ErrorCode::INVAL)
        );
    }

    #[test]
    fn debugger_overrides_split() {
        for stage in [BootStage::Bootloader, BootStage::Application] {
            let layout = policy(stage, true, true)
                .code_data_layout(REGION, Some(POINTS))
                .unwrap();
            assert_eq!(
                layout,
                Layout::Span(Slice::new(REGION, Permissions::ReadWriteExecute, false))
            );
        }
    }

    #[test]
    fn only_debug_and_bootloader_layouts_coincide() {
        let policies = [
            Policy::DebugOverride,
            Policy::Bootloader,
            Policy::SplitCodeData,
            Policy::Unified,
        ];
        for (i, a) in policies.iter().enumerate() {
            for b in &policies[i + 1..] {
                let same = a.code_data_layout(REGION, Some(POINTS))
                    == b.code_data_layout(REGION, Some(POINTS));
                let expected = matches!(
                    (a, b),
                    (Policy::DebugOverride, Policy::Bootloader)
                );
                assert_eq!(same, expected, "{:?} vs {:?}", a, b);
            }
        }
    }

    #[test]
    fn flash_lock_follows_stage() {
        let flash = AddressRange::new(0x4000_0000, 0x4400_0000);
        let boot = BootContext::new(BootStage::Bootloader, false, true);
        assert_eq!(
            flash_layout(&boot, flash, None),
            Ok(Layout::Span(Slice::new(
                flash,
                Permissions::ReadExecuteOnly,
                false
            )))
        );

        let app = BootContext::new(BootStage::Application, true, false);
        assert_eq!(
            flash_layout(&app, flash, None),
            Ok(Layout::Span(Slice::new(
                flash,
                Permissions::ReadExecuteOnly,
                true
            )))
        );
    }

    #[test]
    fn split_flash_denies_unused_pages() {
        let flash = AddressRange::new(0x4000_0000, 0x4400_0000);
        let app = BootContext::new(BootStage::Application, false, true);
        let layout = flash_layout(
            &app,
            flash,
            Some(SplitPoints::new(0x4003_0000, 0x4005_0000)),
        )
        .unwrap();
        let perms: [Permissions; 3] = match layout {
            Layout::Split(slices) => slices.map(|slice| slice.permissions),
            Layout::Span(_) => panic!("flash was not split"),
        };
        assert_eq!(
            perms,
            [
                Permissions::ReadExecuteOnly,
                Permissions::ReadOnly,
                Permissions::NoAccess
            ]
        );
    }
}

// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Snapshot of the boot state the protection policy depends on.

use kernel::config::CONFIG;

/// Which firmware image is running.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BootStage {
    /// The early loader. It hands over to the application and must leave
    /// the entries the application tightens unlocked.
    Bootloader,
    Application,
}

/// Tells whether an external debugger currently controls the CPU.
pub trait DebuggerProbe {
    fn debugger_attached(&self) -> bool;
}

/// Boot state read once when protection is configured.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BootContext {
    pub stage: BootStage,
    pub debugger_attached: bool,
    pub split_code_data: bool,
}

impl BootContext {
    pub const fn new(stage: BootStage, debugger_attached: bool, split_code_data: bool) -> Self {
        BootContext {
            stage,
            debugger_attached,
            split_code_data,
        }
    }

    /// Combine the compile-time configuration of this image with the current
    /// state of `probe`.
    pub fn snapshot<P: DebuggerProbe + ?Sized>(probe: &P) -> Self {
        let stage = if CONFIG.bootloader_build {
            BootStage::Bootloader
        } else {
            BootStage::Application
        };
        BootContext::new(stage, probe.debugger_attached(), CONFIG.pmp_idram_split)
    }
}

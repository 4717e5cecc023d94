// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Assist debug unit, used to find out whether an external debugger has the
//! core under control.

use kernel::utilities::registers::interfaces::Readable;
use kernel::utilities::registers::{register_bitfields, register_structs, ReadOnly};
use kernel::utilities::StaticRef;

use crate::boot_context::DebuggerProbe;

pub const ASSIST_DEBUG_BASE: StaticRef<AssistDebugRegisters> =
    unsafe { StaticRef::new(0x3FF0_6000 as *const AssistDebugRegisters) };

register_structs! {
    pub AssistDebugRegisters {
        (0x000 => _reserved0),
        (0x098 => core_0_debug_mode: ReadOnly<u32, CORE_0_DEBUG_MODE::Register>),
        (0x09C => @END),
    }
}

register_bitfields![u32,
    CORE_0_DEBUG_MODE [
        /// The core is halted in debug mode.
        DEBUG_MODE OFFSET(0) NUMBITS(1) [],
        /// A debugger has been connected to the debug module.
        DEBUG_MODULE_ACTIVE OFFSET(1) NUMBITS(1) []
    ]
];

pub struct AssistDebug {
    registers: StaticRef<AssistDebugRegisters>,
}

impl AssistDebug {
    pub const fn new(base: StaticRef<AssistDebugRegisters>) -> Self {
        AssistDebug { registers: base }
    }
}

impl DebuggerProbe for AssistDebug {
    fn debugger_attached(&self) -> bool {
        self.registers
            .core_0_debug_mode
            .is_set(CORE_0_DEBUG_MODE::DEBUG_MODULE_ACTIVE)
    }
}

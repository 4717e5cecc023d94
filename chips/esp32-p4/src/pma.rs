// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Vendor physical memory attribute (PMA) table.
//!
//! Each of the 16 entries has its own configuration CSR (`pmacfgN`, at
//! `0xBC0 + N`) and address CSR (`pmaaddrN`, at `0xBD0 + N`). Addresses are
//! encoded like PMP addresses. The configuration word uses its own layout.

use kernel::utilities::registers::{register_bitfields, LocalRegisterCopy};
use riscv_csr::csr::ReadWriteRiscvCsr;
use rv32i::pmp::{AddressMode, EncodedEntry, EntryConfig, EntryInstaller, Permissions};

use crate::memory_map::PMA_ENTRIES;

register_bitfields![usize,
    pub pmacfg [
        en OFFSET(0) NUMBITS(1) [],
        x OFFSET(2) NUMBITS(1) [],
        w OFFSET(3) NUMBITS(1) [],
        r OFFSET(4) NUMBITS(1) [],
        l OFFSET(29) NUMBITS(1) [],
        a OFFSET(30) NUMBITS(2) [
            OFF = 0,
            TOR = 1,
            NA4 = 2,
            NAPOT = 3
        ]
    ],
    pub pmaaddr [
        addr OFFSET(0) NUMBITS(32) []
    ]
];

/// Serialize `config` into the PMA configuration layout. Entries that match
/// an address range are enabled.
pub fn pmacfg(config: &EntryConfig) -> LocalRegisterCopy<usize, pmacfg::Register> {
    let permissions = config.permissions;
    let mut reg = LocalRegisterCopy::new(0);
    reg.modify(match config.mode {
        AddressMode::Off => pmacfg::a::OFF + pmacfg::en::CLEAR,
        AddressMode::Tor => pmacfg::a::TOR + pmacfg::en::SET,
        AddressMode::Napot => pmacfg::a::NAPOT + pmacfg::en::SET,
    });
    reg.modify(pmacfg::r.val(permissions.readable() as usize));
    reg.modify(pmacfg::w.val(permissions.writable() as usize));
    reg.modify(pmacfg::x.val(permissions.executable() as usize));
    reg.modify(pmacfg::l.val(config.locked as usize));
    reg
}

/// Parse a PMA configuration word.
pub fn from_pmacfg(reg: LocalRegisterCopy<usize, pmacfg::Register>) -> Option<EntryConfig> {
    let mode = match (reg.read(pmacfg::a), reg.is_set(pmacfg::en)) {
        (0, false) => AddressMode::Off,
        (1, true) => AddressMode::Tor,
        (3, true) => AddressMode::Napot,
        _ => return None,
    };
    let permissions = Permissions::from_rwx(
        reg.is_set(pmacfg::r),
        reg.is_set(pmacfg::w),
        reg.is_set(pmacfg::x),
    )?;
    Some(EntryConfig {
        mode,
        permissions,
        locked: reg.is_set(pmacfg::l),
    })
}

const PMACFG0: usize = 0xBC0;
const PMAADDR0: usize = 0xBD0;

type Pmacfg<const V: usize> = ReadWriteRiscvCsr<usize, pmacfg::Register, V>;
type Pmaaddr<const V: usize> = ReadWriteRiscvCsr<usize, pmaaddr::Register, V>;

#[repr(C)]
pub struct PmaCsr {
    pub pmacfg0: Pmacfg<{ PMACFG0 }>,
    pub pmacfg1: Pmacfg<{ PMACFG0 + 1 }>,
    pub pmacfg2: Pmacfg<{ PMACFG0 + 2 }>,
    pub pmacfg3: Pmacfg<{ PMACFG0 + 3 }>,
    pub pmacfg4: Pmacfg<{ PMACFG0 + 4 }>,
    pub pmacfg5: Pmacfg<{ PMACFG0 + 5 }>,
    pub pmacfg6: Pmacfg<{ PMACFG0 + 6 }>,
    pub pmacfg7: Pmacfg<{ PMACFG0 + 7 }>,
    pub pmacfg8: Pmacfg<{ PMACFG0 + 8 }>,
    pub pmacfg9: Pmacfg<{ PMACFG0 + 9 }>,
    pub pmacfg10: Pmacfg<{ PMACFG0 + 10 }>,
    pub pmacfg11: Pmacfg<{ PMACFG0 + 11 }>,
    pub pmacfg12: Pmacfg<{ PMACFG0 + 12 }>,
    pub pmacfg13: Pmacfg<{ PMACFG0 + 13 }>,
    pub pmacfg14: Pmacfg<{ PMACFG0 + 14 }>,
    pub pmacfg15: Pmacfg<{ PMACFG0 + 15 }>,
    pub pmaaddr0: Pmaaddr<{ PMAADDR0 }>,
    pub pmaaddr1: Pmaaddr<{ PMAADDR0 + 1 }>,
    pub pmaaddr2: Pmaaddr<{ PMAADDR0 + 2 }>,
    pub pmaaddr3: Pmaaddr<{ PMAADDR0 + 3 }>,
    pub pmaaddr4: Pmaaddr<{ PMAADDR0 + 4 }>,
    pub pmaaddr5: Pmaaddr<{ PMAADDR0 + 5 }>,
    pub pmaaddr6: Pmaaddr<{ PMAADDR0 + 6 }>,
    pub pmaaddr7: Pmaaddr<{ PMAADDR0 + 7 }>,
    pub pmaaddr8: Pmaaddr<{ PMAADDR0 + 8 }>,
    pub pmaaddr9: Pmaaddr<{ PMAADDR0 + 9 }>,
    pub pmaaddr10: Pmaaddr<{ PMAADDR0 + 10 }>,
    pub pmaaddr11: Pmaaddr<{ PMAADDR0 + 11 }>,
    pub pmaaddr12: Pmaaddr<{ PMAADDR0 + 12 }>,
    pub pmaaddr13: Pmaaddr<{ PMAADDR0 + 13 }>,
    pub pmaaddr14: Pmaaddr<{ PMAADDR0 + 14 }>,
    pub pmaaddr15: Pmaaddr<{ PMAADDR0 + 15 }>,
}

pub const PMA_CSR: &PmaCsr = &PmaCsr {
    pmacfg0: ReadWriteRiscvCsr::new(),
    pmacfg1: ReadWriteRiscvCsr::new(),
    pmacfg2: ReadWriteRiscvCsr::new(),
    pmacfg3: ReadWriteRiscvCsr::new(),
    pmacfg4: ReadWriteRiscvCsr::new(),
    pmacfg5: ReadWriteRiscvCsr::new(),
    pmacfg6: ReadWriteRiscvCsr::new(),
    pmacfg7: ReadWriteRiscvCsr::new(),
    pmacfg8: ReadWriteRiscvCsr::new(),
    pmacfg9: ReadWriteRiscvCsr::new(),
    pmacfg10: ReadWriteRiscvCsr::new(),
    pmacfg11: ReadWriteRiscvCsr::new(),
    pmacfg12: ReadWriteRiscvCsr::new(),
    pmacfg13: ReadWriteRiscvCsr::new(),
    pmacfg14: ReadWriteRiscvCsr::new(),
    pmacfg15: ReadWriteRiscvCsr::new(),
    pmaaddr0: ReadWriteRiscvCsr::new(),
    pmaaddr1: ReadWriteRiscvCsr::new(),
    pmaaddr2: ReadWriteRiscvCsr::new(),
    pmaaddr3: ReadWriteRiscvCsr::new(),
    pmaaddr4: ReadWriteRiscvCsr::new(),
    pmaaddr5: ReadWriteRiscvCsr::new(),
    pmaaddr6: ReadWriteRiscvCsr::new(),
    pmaaddr7: ReadWriteRiscvCsr::new(),
    pmaaddr8: ReadWriteRiscvCsr::new(),
    pmaaddr9: ReadWriteRiscvCsr::new(),
    pmaaddr10: ReadWriteRiscvCsr::new(),
    pmaaddr11: ReadWriteRiscvCsr::new(),
    pmaaddr12: ReadWriteRiscvCsr::new(),
    pmaaddr13: ReadWriteRiscvCsr::new(),
    pmaaddr14: ReadWriteRiscvCsr::new(),
    pmaaddr15: ReadWriteRiscvCsr::new(),
};

impl PmaCsr {
    pub fn pmacfg_set_bits(&self, index: usize, bits: usize) {
        match index {
            0 => self.pmacfg0.read_and_set_bits(bits),
            1 => self.pmacfg1.read_and_set_bits(bits),
            2 => self.pmacfg2.read_and_set_bits(bits),
            3 => self.pmacfg3.read_and_set_bits(bits),
            4 => self.pmacfg4.read_and_set_bits(bits),
            5 => self.pmacfg5.read_and_set_bits(bits),
            6 => self.pmacfg6.read_and_set_bits(bits),
            7 => self.pmacfg7.read_and_set_bits(bits),
            8 => self.pmacfg8.read_and_set_bits(bits),
            9 => self.pmacfg9.read_and_set_bits(bits),
            10 => self.pmacfg10.read_and_set_bits(bits),
            11 => self.pmacfg11.read_and_set_bits(bits),
            12 => self.pmacfg12.read_and_set_bits(bits),
            13 => self.pmacfg13.read_and_set_bits(bits),
            14 => self.pmacfg14.read_and_set_bits(bits),
            15 => self.pmacfg15.read_and_set_bits(bits),
            _ => unreachable!(),
        };
    }

    pub fn pmacfg_reset(&self, index: usize) {
        match index {
            0 => self.pmacfg0.set(0),
            1 => self.pmacfg1.set(0),
            2 => self.pmacfg2.set(0),
            3 => self.pmacfg3.set(0),
            4 => self.pmacfg4.set(0),
            5 => self.pmacfg5.set(0),
            6 => self.pmacfg6.set(0),
            7 => self.pmacfg7.set(0),
            8 => self.pmacfg8.set(0),
            9 => self.pmacfg9.set(0),
            10 => self.pmacfg10.set(0),
            11 => self.pmacfg11.set(0),
            12 => self.pmacfg12.set(0),
            13 => self.pmacfg13.set(0),
            14 => self.pmacfg14.set(0),
            15 => self.pmacfg15.set(0),
            _ => unreachable!(),
        }
    }

    pub fn pmaaddr_set(&self, index: usize, value: usize) {
        let value = pmaaddr::addr.val(value);
        match index {
            0 => self.pmaaddr0.write(value),
            1 => self.pmaaddr1.write(value),
            2 => self.pmaaddr2.write(value),
            3 => self.pmaaddr3.write(value),
            4 => self.pmaaddr4.write(value),
            5 => self.pmaaddr5.write(value),
            6 => self.pmaaddr6.write(value),
            7 => self.pmaaddr7.write(value),
            8 => self.pmaaddr8.write(value),
            9 => self.pmaaddr9.write(value),
            10 => self.pmaaddr10.write(value),
            11 => self.pmaaddr11.write(value),
            12 => self.pmaaddr12.write(value),
            13 => self.pmaaddr13.write(value),
            14 => self.pmaaddr14.write(value),
            15 => self.pmaaddr15.write(value),
            _ => unreachable!(),
        }
    }
}

/// The PMA table of the running hart.
pub struct Pma;

impl EntryInstaller for Pma {
    fn entries(&self) -> usize {
        PMA_ENTRIES
    }

    fn reset_entry(&self, slot: usize) {
        PMA_CSR.pmacfg_reset(slot);
    }

    fn set_entry(&self, slot: usize, entry: &EncodedEntry) {
        PMA_CSR.pmaaddr_set(slot, entry.addr() as usize);
        PMA_CSR.pmacfg_set_bits(slot, pmacfg(&entry.config()).get());
    }
}

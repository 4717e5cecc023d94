// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Tock Register interface for the machine-mode memory protection CSRs.

use riscv_csr::csr::{
    ReadWriteRiscvCsr, PMPADDR0, PMPADDR1, PMPADDR10, PMPADDR11, PMPADDR12, PMPADDR13, PMPADDR14,
    PMPADDR15, PMPADDR2, PMPADDR3, PMPADDR4, PMPADDR5, PMPADDR6, PMPADDR7, PMPADDR8, PMPADDR9,
    PMPCFG0, PMPCFG1, PMPCFG2, PMPCFG3,
};

pub mod pmpaddr;
pub mod pmpconfig;

type Pmpcfg<const V: usize> = ReadWriteRiscvCsr<usize, pmpconfig::pmpcfg::Register, V>;
type Pmpaddr<const V: usize> = ReadWriteRiscvCsr<usize, pmpaddr::pmpaddr::Register, V>;

#[repr(C)]
pub struct CSR {
    pub pmpcfg0: Pmpcfg<PMPCFG0>,
    pub pmpcfg1: Pmpcfg<PMPCFG1>,
    pub pmpcfg2: Pmpcfg<PMPCFG2>,
    pub pmpcfg3: Pmpcfg<PMPCFG3>,
    pub pmpaddr0: Pmpaddr<PMPADDR0>,
    pub pmpaddr1: Pmpaddr<PMPADDR1>,
    pub pmpaddr2: Pmpaddr<PMPADDR2>,
    pub pmpaddr3: Pmpaddr<PMPADDR3>,
    pub pmpaddr4: Pmpaddr<PMPADDR4>,
    pub pmpaddr5: Pmpaddr<PMPADDR5>,
    pub pmpaddr6: Pmpaddr<PMPADDR6>,
    pub pmpaddr7: Pmpaddr<PMPADDR7>,
    pub pmpaddr8: Pmpaddr<PMPADDR8>,
    pub pmpaddr9: Pmpaddr<PMPADDR9>,
    pub pmpaddr10: Pmpaddr<PMPADDR10>,
    pub pmpaddr11: Pmpaddr<PMPADDR11>,
    pub pmpaddr12: Pmpaddr<PMPADDR12>,
    pub pmpaddr13: Pmpaddr<PMPADDR13>,
    pub pmpaddr14: Pmpaddr<PMPADDR14>,
    pub pmpaddr15: Pmpaddr<PMPADDR15>,
}

// Define the "addresses" of each CSR register.
pub const CSR: &CSR = &CSR {
    pmpcfg0: ReadWriteRiscvCsr::new(),
    pmpcfg1: ReadWriteRiscvCsr::new(),
    pmpcfg2: ReadWriteRiscvCsr::new(),
    pmpcfg3: ReadWriteRiscvCsr::new(),
    pmpaddr0: ReadWriteRiscvCsr::new(),
    pmpaddr1: ReadWriteRiscvCsr::new(),
    pmpaddr2: ReadWriteRiscvCsr::new(),
    pmpaddr3: ReadWriteRiscvCsr::new(),
    pmpaddr4: ReadWriteRiscvCsr::new(),
    pmpaddr5: ReadWriteRiscvCsr::new(),
    pmpaddr6: ReadWriteRiscvCsr::new(),
    pmpaddr7: ReadWriteRiscvCsr::new(),
    pmpaddr8: ReadWriteRiscvCsr::new(),
    pmpaddr9: ReadWriteRiscvCsr::new(),
    pmpaddr10: ReadWriteRiscvCsr::new(),
    pmpaddr11: ReadWriteRiscvCsr::new(),
    pmpaddr12: ReadWriteRiscvCsr::new(),
    pmpaddr13: ReadWriteRiscvCsr::new(),
    pmpaddr14: ReadWriteRiscvCsr::new(),
    pmpaddr15: ReadWriteRiscvCsr::new(),
};

impl CSR {
    // CSRs are indexed up to 16 entries on RV32, four configuration octets
    // per pmpcfgX register.

    pub fn pmpconfig_set_bits(&self, index: usize, bits: usize) {
        match index {
            0 => self.pmpcfg0.read_and_set_bits(bits),
            1 => self.pmpcfg1.read_and_set_bits(bits),
            2 => self.pmpcfg2.read_and_set_bits(bits),
            3 => self.pmpcfg3.read_and_set_bits(bits),
            _ => unreachable!(),
        };
    }

    pub fn pmpconfig_clear_bits(&self, index: usize, bits: usize) {
        match index {
            0 => self.pmpcfg0.read_and_clear_bits(bits),
            1 => self.pmpcfg1.read_and_clear_bits(bits),
            2 => self.pmpcfg2.read_and_clear_bits(bits),
            3 => self.pmpcfg3.read_and_clear_bits(bits),
            _ => unreachable!(),
        };
    }

    pub fn pmpaddr_set(&self, index: usize, value: usize) {
        let value = pmpaddr::pmpaddr::addr.val(value);
        match index {
            0 => self.pmpaddr0.write(value),
            1 => self.pmpaddr1.write(value),
            2 => self.pmpaddr2.write(value),
            3 => self.pmpaddr3.write(value),
            4 => self.pmpaddr4.write(value),
            5 => self.pmpaddr5.write(value),
            6 => self.pmpaddr6.write(value),
            7 => self.pmpaddr7.write(value),
            8 => self.pmpaddr8.write(value),
            9 => self.pmpaddr9.write(value),
            10 => self.pmpaddr10.write(value),
            11 => self.pmpaddr11.write(value),
            12 => self.pmpaddr12.write(value),
            13 => self.pmpaddr13.write(value),
            14 => self.pmpaddr14.write(value),
            15 => self.pmpaddr15.write(value),
            _ => unreachable!(),
        }
    }
}

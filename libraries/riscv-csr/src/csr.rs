// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! `ReadWriteRiscvCsr` type for RISC-V CSRs.
//!
//! The CSR number is a const generic parameter because the `csrr`/`csrw`
//! family of instructions encodes it as an immediate.

#[cfg(all(any(target_arch = "riscv32", target_arch = "riscv64"), target_os = "none"))]
use core::arch::asm;
use core::marker::PhantomData;

use tock_registers::fields::FieldValue;
use tock_registers::{RegisterLongName, UIntLike};

// Standard machine-mode memory protection CSRs.
pub const PMPCFG0: usize = 0x3A0;
pub const PMPCFG1: usize = 0x3A1;
pub const PMPCFG2: usize = 0x3A2;
pub const PMPCFG3: usize = 0x3A3;

pub const PMPADDR0: usize = 0x3B0;
pub const PMPADDR1: usize = 0x3B1;
pub const PMPADDR2: usize = 0x3B2;
pub const PMPADDR3: usize = 0x3B3;
pub const PMPADDR4: usize = 0x3B4;
pub const PMPADDR5: usize = 0x3B5;
pub const PMPADDR6: usize = 0x3B6;
pub const PMPADDR7: usize = 0x3B7;
pub const PMPADDR8: usize = 0x3B8;
pub const PMPADDR9: usize = 0x3B9;
pub const PMPADDR10: usize = 0x3BA;
pub const PMPADDR11: usize = 0x3BB;
pub const PMPADDR12: usize = 0x3BC;
pub const PMPADDR13: usize = 0x3BD;
pub const PMPADDR14: usize = 0x3BE;
pub const PMPADDR15: usize = 0x3BF;

/// Read/Write registers.
pub struct ReadWriteRiscvCsr<T: UIntLike, R: RegisterLongName, const V: usize> {
    associated_register: PhantomData<R>,
    associated_length: PhantomData<T>,
}

impl<R: RegisterLongName, const V: usize> ReadWriteRiscvCsr<usize, R, V> {
    pub const fn new() -> Self {
        ReadWriteRiscvCsr {
            associated_register: PhantomData,
            associated_length: PhantomData,
        }
    }

    /// The CSR number this register is bound to.
    pub const fn number(&self) -> usize {
        V
    }

    #[cfg(all(any(target_arch = "riscv32", target_arch = "riscv64"), target_os = "none"))]
    #[inline]
    pub fn set(&self, val_to_set: usize) {
        unsafe { asm!("csrw {csr}, {rs}", rs = in(reg) val_to_set, csr = const V) };
    }

    /// Atomically set the bits in `bitmask` (`csrs`), leaving all other bits.
    #[cfg(all(any(target_arch = "riscv32", target_arch = "riscv64"), target_os = "none"))]
    #[inline]
    pub fn read_and_set_bits(&self, bitmask: usize) -> usize {
        let r: usize;
        unsafe {
            asm!("csrrs {rd}, {csr}, {rs1}",
                 rd = out(reg) r,
                 csr = const V,
                 rs1 = in(reg) bitmask)
        };
        r
    }

    /// Atomically clear the bits in `bitmask` (`csrc`), leaving all other bits.
    #[cfg(all(any(target_arch = "riscv32", target_arch = "riscv64"), target_os = "none"))]
    #[inline]
    pub fn read_and_clear_bits(&self, bitmask: usize) -> usize {
        let r: usize;
        unsafe {
            asm!("csrrc {rd}, {csr}, {rs1}",
                 rd = out(reg) r,
                 csr = const V,
                 rs1 = in(reg) bitmask)
        };
        r
    }

    // Mock implementations for tests on host.
    #[cfg(not(all(any(target_arch = "riscv32", target_arch = "riscv64"), target_os = "none")))]
    pub fn set(&self, _val_to_set: usize) {
        unimplemented!("writing RISC-V CSR {:#x}", V)
    }

    #[cfg(not(all(any(target_arch = "riscv32", target_arch = "riscv64"), target_os = "none")))]
    pub fn read_and_set_bits(&self, _bitmask: usize) -> usize {
        unimplemented!("setting bits of RISC-V CSR {:#x}", V)
    }

    #[cfg(not(all(any(target_arch = "riscv32", target_arch = "riscv64"), target_os = "none")))]
    pub fn read_and_clear_bits(&self, _bitmask: usize) -> usize {
        unimplemented!("clearing bits of RISC-V CSR {:#x}", V)
    }

    #[inline]
    pub fn write(&self, field: FieldValue<usize, R>) {
        self.set(field.value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csr_numbers_are_carried_in_the_type() {
        let cfg: ReadWriteRiscvCsr<usize, (), PMPCFG2> = ReadWriteRiscvCsr::new();
        let addr: ReadWriteRiscvCsr<usize, (), PMPADDR15> = ReadWriteRiscvCsr::new();
        assert_eq!(cfg.number(), 0x3A2);
        assert_eq!(addr.number(), 0x3BF);
    }

    #[test]
    #[should_panic(expected = "writing RISC-V CSR 0x3a0")]
    fn host_builds_never_touch_csrs() {
        let cfg: ReadWriteRiscvCsr<usize, (), PMPCFG0> = ReadWriteRiscvCsr::new();
        cfg.set(0);
    }
}

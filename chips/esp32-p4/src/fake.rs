// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! In-memory protection table standing in for the PMA and PMP CSRs in host
//! tests.
//!
//! It keeps the hardware rules the planners rely on: setting an entry only
//! ORs configuration bits in, a locked entry ignores resets and writes, and
//! a locked TOR entry also freezes the address register below it.

use core::cell::Cell;

use kernel::utilities::registers::LocalRegisterCopy;
use rv32i::pmp::{
    pmpcfg_octet, AddressMode, AddressRange, EncodedEntry, EntryConfig, EntryInstaller,
};

#[derive(Copy, Clone, Default)]
struct Slot {
    addr: u64,
    cfg: u8,
}

impl Slot {
    fn octet(&self) -> LocalRegisterCopy<u8, pmpcfg_octet::Register> {
        LocalRegisterCopy::new(self.cfg)
    }

    fn locked(&self) -> bool {
        self.octet().is_set(pmpcfg_octet::l)
    }
}

pub struct FakeTable<const N: usize> {
    slots: [Cell<Slot>; N],
    writes: Cell<usize>,
    ignored_changes: Cell<usize>,
}

impl<const N: usize> FakeTable<N> {
    pub fn new() -> Self {
        FakeTable {
            slots: core::array::from_fn(|_| Cell::new(Slot::default())),
            writes: Cell::new(0),
            ignored_changes: Cell::new(0),
        }
    }

    /// Entries written so far, counting only writes the table accepted.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    /// Writes dropped by a lock although they would have changed the slot.
    pub fn ignored_changes(&self) -> usize {
        self.ignored_changes.get()
    }

    /// Current configuration of `slot`, or `None` if the accumulated bits do
    /// not form a valid configuration.
    pub fn config(&self, slot: usize) -> Option<EntryConfig> {
        EntryConfig::from_pmpcfg(self.slots[slot].get().octet())
    }

    pub fn range_of(&self, slot: usize) -> Option<AddressRange> {
        let current = self.slots[slot].get();
        let config = self.config(slot)?;
        let base = match slot {
            0 => 0,
            _ => self.slots[slot - 1].get().addr << 2,
        };
        EncodedEntry::from_raw(current.addr, config).decode(Some(base))
    }

    /// The entry deciding an access to `addr`.
    pub fn matching(&self, addr: u64) -> Option<(usize, EntryConfig)> {
        (0..N).find_map(|slot| {
            let range = self.range_of(slot)?;
            let config = self.config(slot)?;
            range.contains(addr).then_some((slot, config))
        })
    }

    fn address_frozen(&self, slot: usize) -> bool {
        let above = self.slots.get(slot + 1).map(Cell::get);
        let tor_locked_above = above.is_some_and(|above| {
            above.locked()
                && EntryConfig::from_pmpcfg(above.octet())
                    .is_some_and(|config| config.mode == AddressMode::Tor)
        });
        self.slots[slot].get().locked() || tor_locked_above
    }
}

impl<const N: usize> EntryInstaller for FakeTable<N> {
    fn entries(&self) -> usize {
        N
    }

    fn reset_entry(&self, slot: usize) {
        let mut current = self.slots[slot].get();
        if !current.locked() {
            current.cfg = 0;
            self.slots[slot].set(current);
        }
    }

    fn set_entry(&self, slot: usize, entry: &EncodedEntry) {
        let mut current = self.slots[slot].get();
        let octet = entry.config().pmpcfg().get();

        if current.locked() {
            if current.addr != entry.addr() || current.cfg | octet != current.cfg {
                self.ignored_changes.set(self.ignored_changes.get() + 1);
            }
            return;
        }
        if self.address_frozen(slot) {
            if current.addr != entry.addr() {
                self.ignored_changes.set(self.ignored_changes.get() + 1);
            }
        } else {
            current.addr = entry.addr();
        }
        current.cfg |= octet;
        self.slots[slot].set(current);
        self.writes.set(self.writes.get() + 1);
    }
}

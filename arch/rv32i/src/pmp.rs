// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Encoding of physical memory protection entries.
//!
//! A protection entry is an address register plus a configuration octet.
//! Ranges are described either as a single naturally aligned power-of-two
//! entry (NAPOT) or as a top-of-range entry (TOR) whose base is the address
//! register of the entry one slot below it.
//!
//! [`ProtectionTable`] lays out entries for a whole table in memory so that
//! the layout can be checked before any of it reaches the hardware, and
//! [`EntryInstaller`] is the seam through which a finished table is written.
//! Hardware evaluates entries with static priority: the lowest-numbered
//! matching entry decides the access.

use core::fmt;

use kernel::utilities::registers::{register_bitfields, FieldValue, LocalRegisterCopy};
use kernel::ErrorCode;

use crate::csr;
use crate::csr::pmpconfig::pmpcfg;

/// Exclusive end of the 32-bit physical address space.
pub const ADDRESS_SPACE_END: u64 = 1 << 32;

/// Smallest range a NAPOT entry can describe.
pub const NAPOT_MIN_SIZE: u64 = 8;

register_bitfields![u8,
    pub pmpcfg_octet [
        r OFFSET(0) NUMBITS(1) [],
        w OFFSET(1) NUMBITS(1) [],
        x OFFSET(2) NUMBITS(1) [],
        a OFFSET(3) NUMBITS(2) [
            OFF = 0,
            TOR = 1,
            NA4 = 2,
            NAPOT = 3
        ],
        l OFFSET(7) NUMBITS(1) []
    ]
];

/// A half-open physical address range `[low, high)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AddressRange {
    low: u64,
    high: u64,
}

impl AddressRange {
    /// Create a range, panicking if it is empty or leaves the address space.
    ///
    /// In a `const` item the panic becomes a build failure.
    pub const fn new(low: u64, high: u64) -> Self {
        assert!(low < high, "address range must not be empty");
        assert!(
            high <= ADDRESS_SPACE_END,
            "address range must end inside the physical address space"
        );
        AddressRange { low, high }
    }

    pub const fn try_new(low: u64, high: u64) -> Option<Self> {
        if low < high && high <= ADDRESS_SPACE_END {
            Some(AddressRange { low, high })
        } else {
            None
        }
    }

    pub const fn low(&self) -> u64 {
        self.low
    }

    pub const fn high(&self) -> u64 {
        self.high
    }

    pub const fn size(&self) -> u64 {
        self.high - self.low
    }

    pub const fn contains(&self, addr: u64) -> bool {
        self.low <= addr && addr < self.high
    }

    pub const fn contains_range(&self, other: &AddressRange) -> bool {
        self.low <= other.low && other.high <= self.high
    }

    pub const fn intersects(&self, other: &AddressRange) -> bool {
        self.low < other.high && other.low < self.high
    }

    /// Whether one NAPOT entry can describe this range exactly.
    pub const fn is_napot(&self) -> bool {
        let size = self.size();
        size >= NAPOT_MIN_SIZE && size.is_power_of_two() && self.low % size == 0
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#010X}, {:#010X})", self.low, self.high)
    }
}

/// Access rights granted by an entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Permissions {
    NoAccess,
    ReadOnly,
    ReadWriteOnly,
    ReadExecuteOnly,
    ReadWriteExecute,
}

impl Permissions {
    pub const fn readable(self) -> bool {
        !matches!(self, Permissions::NoAccess)
    }

    pub const fn writable(self) -> bool {
        matches!(
            self,
            Permissions::ReadWriteOnly | Permissions::ReadWriteExecute
        )
    }

    pub const fn executable(self) -> bool {
        matches!(
            self,
            Permissions::ReadExecuteOnly | Permissions::ReadWriteExecute
        )
    }

    /// Whether every right in `other` is also granted by `self`.
    pub const fn includes(self, other: Permissions) -> bool {
        (!other.readable() || self.readable())
            && (!other.writable() || self.writable())
            && (!other.executable() || self.executable())
    }

    /// Inverse of the accessors above. Write- or execute-only combinations
    /// are never produced by this crate and decode to `None`.
    pub const fn from_rwx(read: bool, write: bool, execute: bool) -> Option<Self> {
        match (read, write, execute) {
            (false, false, false) => Some(Permissions::NoAccess),
            (true, false, false) => Some(Permissions::ReadOnly),
            (true, true, false) => Some(Permissions::ReadWriteOnly),
            (true, false, true) => Some(Permissions::ReadExecuteOnly),
            (true, true, true) => Some(Permissions::ReadWriteExecute),
            _ => None,
        }
    }
}

/// How an entry interprets its address register.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AddressMode {
    /// Matches nothing. The address register still serves as the base of a
    /// following TOR entry.
    Off,
    Tor,
    Napot,
}

/// Logical content of an entry's configuration octet.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EntryConfig {
    pub mode: AddressMode,
    pub permissions: Permissions,
    pub locked: bool,
}

impl EntryConfig {
    /// Serialize into the standard pmpcfg octet layout.
    pub fn pmpcfg(&self) -> LocalRegisterCopy<u8, pmpcfg_octet::Register> {
        let access = match self.permissions {
            Permissions::NoAccess => {
                pmpcfg_octet::r::CLEAR + pmpcfg_octet::w::CLEAR + pmpcfg_octet::x::CLEAR
            }
            Permissions::ReadOnly => {
                pmpcfg_octet::r::SET + pmpcfg_octet::w::CLEAR + pmpcfg_octet::x::CLEAR
            }
            Permissions::ReadWriteOnly => {
                pmpcfg_octet::r::SET + pmpcfg_octet::w::SET + pmpcfg_octet::x::CLEAR
            }
            Permissions::ReadExecuteOnly => {
                pmpcfg_octet::r::SET + pmpcfg_octet::w::CLEAR + pmpcfg_octet::x::SET
            }
            Permissions::ReadWriteExecute => {
                pmpcfg_octet::r::SET + pmpcfg_octet::w::SET + pmpcfg_octet::x::SET
            }
        };
        let mode = match self.mode {
            AddressMode::Off => pmpcfg_octet::a::OFF,
            AddressMode::Tor => pmpcfg_octet::a::TOR,
            AddressMode::Napot => pmpcfg_octet::a::NAPOT,
        };
        let lock = if self.locked {
            pmpcfg_octet::l::SET
        } else {
            pmpcfg_octet::l::CLEAR
        };

        LocalRegisterCopy::new((access + mode + lock).value)
    }

    /// Parse a pmpcfg octet. NA4 entries and write-only grants are not
    /// representable and yield `None`.
    pub fn from_pmpcfg(reg: LocalRegisterCopy<u8, pmpcfg_octet::Register>) -> Option<Self> {
        let mode = match reg.read(pmpcfg_octet::a) {
            0 => AddressMode::Off,
            1 => AddressMode::Tor,
            3 => AddressMode::Napot,
            _ => return None,
        };
        let permissions = Permissions::from_rwx(
            reg.is_set(pmpcfg_octet::r),
            reg.is_set(pmpcfg_octet::w),
            reg.is_set(pmpcfg_octet::x),
        )?;

        Some(EntryConfig {
            mode,
            permissions,
            locked: reg.is_set(pmpcfg_octet::l),
        })
    }
}

/// A region representable by a single NAPOT entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NAPOTRegionSpec {
    start: u64,
    size: u64,
}

impl NAPOTRegionSpec {
    pub const fn new(range: AddressRange) -> Option<Self> {
        if range.is_napot() {
            Some(NAPOTRegionSpec {
                start: range.low(),
                size: range.size(),
            })
        } else {
            None
        }
    }

    /// The value of the address register: `(start + size / 2 - 1) >> 2`.
    pub const fn napot_addr(&self) -> u64 {
        (self.start + (self.size - 1) / 2) >> 2
    }

    /// Recover the region from an address register value: `n` trailing ones
    /// mean a size of `2^(n + 3)` bytes.
    pub const fn from_napot_addr(addr: u64) -> Option<Self> {
        let ones = addr.trailing_ones();
        if ones + 3 > 32 {
            return None;
        }
        let size = 1u64 << (ones + 3);
        let start = (addr & !((1u64 << ones) - 1)) << 2;
        if start + size > ADDRESS_SPACE_END {
            return None;
        }
        Some(NAPOTRegionSpec { start, size })
    }

    pub const fn range(&self) -> AddressRange {
        AddressRange::new(self.start, self.start + self.size)
    }
}

/// One fully encoded protection entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EncodedEntry {
    addr: u64,
    config: EntryConfig,
}

impl EncodedEntry {
    pub const fn napot(spec: NAPOTRegionSpec, permissions: Permissions, locked: bool) -> Self {
        EncodedEntry {
            addr: spec.napot_addr(),
            config: EntryConfig {
                mode: AddressMode::Napot,
                permissions,
                locked,
            },
        }
    }

    /// A TOR entry ending at the exclusive byte address `bound`.
    pub const fn tor(
        bound: u64,
        permissions: Permissions,
        locked: bool,
    ) -> Result<Self, ErrorCode> {
        if bound % 4 != 0 || bound == 0 || bound > ADDRESS_SPACE_END {
            return Err(ErrorCode::INVAL);
        }
        Ok(EncodedEntry {
            addr: bound >> 2,
            config: EntryConfig {
                mode: AddressMode::Tor,
                permissions,
                locked,
            },
        })
    }

    /// A disabled entry whose only job is to provide `base` to the TOR entry
    /// above it. Locking an anchor freezes the base of that TOR entry.
    pub const fn anchor(base: u64, locked: bool) -> Result<Self, ErrorCode> {
        if base % 4 != 0 || base >= ADDRESS_SPACE_END {
            return Err(ErrorCode::INVAL);
        }
        Ok(EncodedEntry {
            addr: base >> 2,
            config: EntryConfig {
                mode: AddressMode::Off,
                permissions: Permissions::NoAccess,
                locked,
            },
        })
    }

    /// Rebuild an entry from an address register value and its configuration,
    /// as read back from a table.
    pub const fn from_raw(addr: u64, config: EntryConfig) -> Self {
        EncodedEntry { addr, config }
    }

    /// Raw address register value.
    pub const fn addr(&self) -> u64 {
        self.addr
    }

    pub const fn config(&self) -> EntryConfig {
        self.config
    }

    pub const fn mode(&self) -> AddressMode {
        self.config.mode
    }

    pub const fn permissions(&self) -> Permissions {
        self.config.permissions
    }

    pub const fn locked(&self) -> bool {
        self.config.locked
    }

    /// Byte address a TOR entry in the next slot uses as its base.
    pub const fn next_tor_base(&self) -> u64 {
        self.addr << 2
    }

    /// The range this entry matches. `tor_base` is what the slot below
    /// provides, or `None` if that is unknown.
    pub const fn decode(&self, tor_base: Option<u64>) -> Option<AddressRange> {
        match self.config.mode {
            AddressMode::Off => None,
            AddressMode::Napot => match NAPOTRegionSpec::from_napot_addr(self.addr) {
                Some(spec) => Some(spec.range()),
                None => None,
            },
            AddressMode::Tor => match tor_base {
                Some(base) => AddressRange::try_new(base, self.addr << 2),
                None => None,
            },
        }
    }
}

/// The entries produced for one logical range.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Encoding {
    Napot(EncodedEntry),
    Tor {
        /// Absent when the slot below already provides the base.
        anchor: Option<EncodedEntry>,
        top: EncodedEntry,
    },
}

impl Encoding {
    pub const fn slots(&self) -> usize {
        match self {
            Encoding::Napot(_) => 1,
            Encoding::Tor { anchor: None, .. } => 1,
            Encoding::Tor {
                anchor: Some(_), ..
            } => 2,
        }
    }

    /// The entry carrying the permissions, which is also the one the next
    /// slot takes its TOR base from.
    pub const fn last(&self) -> EncodedEntry {
        match *self {
            Encoding::Napot(entry) => entry,
            Encoding::Tor { top, .. } => top,
        }
    }

    /// Entries in the order they occupy consecutive slots.
    pub fn entries(&self) -> impl Iterator<Item = EncodedEntry> {
        let (first, second) = match *self {
            Encoding::Napot(entry) => (Some(entry), None),
            Encoding::Tor { anchor, top } => (anchor, Some(top)),
        };
        first.into_iter().chain(second)
    }
}

/// Number of slots `encode_range` needs for `range`, given whether the slot
/// it lands on already has `range.low()` as its TOR base.
pub const fn slots_for(range: AddressRange, base_provided: bool) -> usize {
    if range.is_napot() || base_provided {
        1
    } else {
        2
    }
}

/// Encode `range`, preferring a single NAPOT entry and falling back to a TOR
/// pair. `tor_base` is the base the first slot would see for a TOR entry; if
/// it already equals `range.low()` the anchor is elided.
///
/// Returns `INVAL` if the range cannot be expressed at 4-byte granularity.
pub const fn encode_range(
    range: AddressRange,
    permissions: Permissions,
    locked: bool,
    tor_base: Option<u64>,
) -> Result<Encoding, ErrorCode> {
    if let Some(spec) = NAPOTRegionSpec::new(range) {
        return Ok(Encoding::Napot(EncodedEntry::napot(spec, permissions, locked)));
    }

    let anchor = match tor_base {
        Some(base) if base == range.low() => None,
        _ => match EncodedEntry::anchor(range.low(), locked) {
            Ok(anchor) => Some(anchor),
            Err(e) => return Err(e),
        },
    };
    match EncodedEntry::tor(range.high(), permissions, locked) {
        Ok(top) => Ok(Encoding::Tor { anchor, top }),
        Err(e) => Err(e),
    }
}

/// Writes entries into a physical protection table.
///
/// Setting an entry overwrites its address register but only ORs in
/// configuration bits, so a slot that may hold a previous configuration must
/// be reset first. Hardware ignores both operations on a locked entry.
pub trait EntryInstaller {
    /// Number of slots the table has.
    fn entries(&self) -> usize;

    /// Clear the configuration of `slot`.
    fn reset_entry(&self, slot: usize);

    /// Write the address register of `slot` and set its configuration bits.
    fn set_entry(&self, slot: usize, entry: &EncodedEntry);
}

/// In-memory layout of a protection table with `N` slots.
pub struct ProtectionTable<const N: usize> {
    slots: [Option<EncodedEntry>; N],
    resets: [bool; N],
    next: usize,
}

impl<const N: usize> ProtectionTable<N> {
    pub const fn new() -> Self {
        ProtectionTable {
            slots: [None; N],
            resets: [false; N],
            next: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Slot the next `push` lands on.
    pub const fn next_slot(&self) -> usize {
        self.next
    }

    pub fn get(&self, slot: usize) -> Option<EncodedEntry> {
        self.slots.get(slot).copied().flatten()
    }

    /// Base a TOR entry in `slot` would use. Slot 0 always sees address 0.
    pub fn tor_base(&self, slot: usize) -> Option<u64> {
        match slot {
            0 => Some(0),
            _ => self.get(slot - 1).map(|entry| entry.next_tor_base()),
        }
    }

    /// Place `entry` on the next free slot and return that slot.
    pub fn push(&mut self, entry: EncodedEntry) -> Result<usize, ErrorCode> {
        let slot = self.next;
        if slot >= N {
            return Err(ErrorCode::SIZE);
        }
        self.slots[slot] = Some(entry);
        self.next = slot + 1;
        Ok(slot)
    }

    /// Encode `range` on the next free slots. Returns the slot of the last
    /// entry, which is the one carrying the permissions.
    pub fn push_range(
        &mut self,
        range: AddressRange,
        permissions: Permissions,
        locked: bool,
    ) -> Result<usize, ErrorCode> {
        let encoding = encode_range(range, permissions, locked, self.tor_base(self.next))?;
        if self.next + encoding.slots() > N {
            return Err(ErrorCode::SIZE);
        }
        let mut last = self.next;
        for entry in encoding.entries() {
            last = self.push(entry)?;
        }
        Ok(last)
    }

    /// Like `push_range`, but `range` must be describable by one NAPOT entry.
    pub fn push_napot(
        &mut self,
        range: AddressRange,
        permissions: Permissions,
        locked: bool,
    ) -> Result<usize, ErrorCode> {
        let spec = NAPOTRegionSpec::new(range).ok_or(ErrorCode::INVAL)?;
        self.push(EncodedEntry::napot(spec, permissions, locked))
    }

    /// Leave slots up to (not including) `slot` unused.
    pub fn skip_to(&mut self, slot: usize) -> Result<(), ErrorCode> {
        if slot > N {
            return Err(ErrorCode::SIZE);
        }
        if slot < self.next {
            return Err(ErrorCode::ALREADY);
        }
        self.next = slot;
        Ok(())
    }

    /// Clear `slot` on the hardware before any entry of this table is set.
    pub fn reset_before_install(&mut self, slot: usize) -> Result<(), ErrorCode> {
        let reset = self.resets.get_mut(slot).ok_or(ErrorCode::SIZE)?;
        *reset = true;
        Ok(())
    }

    pub fn resets(&self) -> impl Iterator<Item = usize> + '_ {
        self.resets
            .iter()
            .enumerate()
            .filter(|(_, reset)| **reset)
            .map(|(slot, _)| slot)
    }

    /// Occupied slots in ascending order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, EncodedEntry)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| entry.map(|entry| (slot, entry)))
    }

    /// Range matched by the entry in `slot`, if it matches anything.
    pub fn range_of(&self, slot: usize) -> Option<AddressRange> {
        self.get(slot)?.decode(self.tor_base(slot))
    }

    /// The entry that decides an access to `addr`: the lowest matching slot.
    pub fn matching_entry(&self, addr: u64) -> Option<(usize, EncodedEntry)> {
        self.entries()
            .find(|(slot, _)| self.range_of(*slot).is_some_and(|range| range.contains(addr)))
    }

    /// Write the table through `installer`: every requested reset first,
    /// then the entries from the lowest slot up.
    pub fn install<I: EntryInstaller + ?Sized>(&self, installer: &I) -> Result<(), ErrorCode> {
        if self.next > installer.entries() {
            return Err(ErrorCode::SIZE);
        }
        for slot in self.resets() {
            installer.reset_entry(slot);
        }
        for (slot, entry) in self.entries() {
            installer.set_entry(slot, &entry);
        }
        Ok(())
    }
}

impl<const N: usize> Default for ProtectionTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Display for ProtectionTable<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (slot, entry) in self.entries() {
            let config = entry.config();
            let mode = match config.mode {
                AddressMode::Off => "OFF",
                AddressMode::Tor => "TOR",
                AddressMode::Napot => "NAPOT",
            };
            write!(f, "  [{:02}]: addr={:#010X}, ", slot, entry.addr())?;
            match self.range_of(slot) {
                Some(range) => write!(
                    f,
                    "start={:#010X}, end={:#010X}, ",
                    range.low(),
                    range.high() - 1
                )?,
                None => write!(f, "base={:#010X}, ", entry.next_tor_base())?,
            }
            writeln!(
                f,
                "cfg={:#04X} {} ({}{}{}{})",
                config.pmpcfg().get(),
                mode,
                if config.locked { "l" } else { "-" },
                if config.permissions.readable() { "r" } else { "-" },
                if config.permissions.writable() { "w" } else { "-" },
                if config.permissions.executable() { "x" } else { "-" },
            )?;
        }
        Ok(())
    }
}

/// The standard PMP, programmed through the pmpcfgX/pmpaddrX CSRs.
pub struct CsrPmp<const ENTRIES: usize>;

impl<const ENTRIES: usize> CsrPmp<ENTRIES> {
    const CONST_ASSERT_CHECK: () = assert!(ENTRIES <= 16, "RV32 exposes at most 16 PMP CSRs here");

    pub const fn new() -> Self {
        let _: () = Self::CONST_ASSERT_CHECK;
        CsrPmp
    }
}

/// The pmpcfgX register holding the octet of `slot`, and `bits` placed into
/// that octet.
fn pmpcfg_bits(slot: usize, bits: u8) -> (usize, FieldValue<usize, pmpcfg::Register>) {
    let index = slot / csr::pmpconfig::ENTRIES_PER_CSR;
    (index, csr::pmpconfig::octet(slot).val(bits as usize))
}

impl<const ENTRIES: usize> EntryInstaller for CsrPmp<ENTRIES> {
    fn entries(&self) -> usize {
        ENTRIES
    }

    fn reset_entry(&self, slot: usize) {
        let (index, octet) = pmpcfg_bits(slot, 0xFF);
        csr::CSR.pmpconfig_clear_bits(index, octet.value);
    }

    fn set_entry(&self, slot: usize, entry: &EncodedEntry) {
        let (index, octet) = pmpcfg_bits(slot, entry.config().pmpcfg().get());
        csr::CSR.pmpaddr_set(slot, entry.addr() as usize);
        csr::CSR.pmpconfig_set_bits(index, octet.value);
    }
}

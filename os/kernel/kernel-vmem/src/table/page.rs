//! # Page Table
//!
//! - [`PageIndex`]: index from VA bits `[19:12]`.
//! - [`PageTableEntry`]: a PTE mapping one 4 KiB frame.
//! - [`PageTable`]: 256 entries, 2 KiB.
//! - [`PteRef`]: the physical location of one PTE, as returned by a walk.
//!
//! A mapping entry is the frame address with every control bit clear, which
//! makes it valid, writable and executable. An empty entry has only the
//! page-invalid bit set.

use bitfield_struct::bitfield;
use core::fmt;
use kernel_memory_addresses::{
    MemoryAddressOffset, PhysicalAddress, PhysicalPage, Size4K, VirtualAddress,
};

use crate::level::TableLevel;
use crate::table::entry_offset;

/// Number of entries in a page table.
pub const PAGE_TABLE_ENTRIES: usize = 256;

/// Index into a page table (derived from VA bits `[19:12]`).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct PageIndex(u16);

impl PageIndex {
    #[inline]
    #[must_use]
    pub const fn from(va: VirtualAddress) -> Self {
        Self::new(TableLevel::Page.index_of(va))
    }

    #[inline]
    #[must_use]
    pub const fn new(v: u16) -> Self {
        debug_assert!((v as usize) < PAGE_TABLE_ENTRIES);
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// A page-table entry.
///
/// | Bits   | Field | Meaning |
/// |--------|-------|---------|
/// | 12..63 | frame | Page-frame real address >> 12 |
/// | 10     | I | Page invalid |
/// | 9      | P | DAT protection (read-only) |
/// | 8      | IEP | Instruction-execution protection (not used here) |
#[doc(alias = "PTE")]
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct PageTableEntry {
    /// Bits 0–8 — Software/reserved bits and IEP; always written as zero.
    #[bits(9)]
    __reserved0: u16,

    /// Bit 9 — P: DAT protection.
    pub protected: bool,

    /// Bit 10 — I: page-invalid bit.
    pub invalid: bool,

    /// Bit 11 — Reserved.
    #[bits(1)]
    __reserved11: u8,

    /// Bits 12–63 — frame number.
    #[bits(52)]
    frame_4k: u64,
}

impl PageTableEntry {
    /// An invalid entry.
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self::new().with_invalid(true)
    }

    /// A valid, unprotected mapping of `frame`.
    #[inline]
    #[must_use]
    pub const fn mapping(frame: PhysicalPage<Size4K>) -> Self {
        Self::new().with_frame_4k(frame.number())
    }

    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        !self.invalid()
    }

    /// Frame held in the entry, regardless of the invalid bit.
    #[inline]
    #[must_use]
    pub const fn frame(self) -> PhysicalPage<Size4K> {
        PhysicalPage::from_number(self.frame_4k())
    }

    /// Frame base plus `offset`, regardless of the invalid bit.
    #[inline]
    #[must_use]
    pub const fn translate(self, offset: MemoryAddressOffset<Size4K>) -> PhysicalAddress {
        self.frame().join(offset)
    }
}

/// A page table: 256 entries, 2 KiB aligned.
#[doc(alias = "PT")]
#[repr(C, align(2048))]
pub struct PageTable {
    entries: [PageTableEntry; PAGE_TABLE_ENTRIES],
}

impl PageTable {
    /// Mark every entry invalid.
    #[inline]
    pub fn clear(&mut self) {
        self.entries.fill(PageTableEntry::empty());
    }

    #[inline]
    #[must_use]
    pub const fn get(&self, i: PageIndex) -> PageTableEntry {
        self.entries[i.as_usize()]
    }

    #[inline]
    pub const fn set(&mut self, i: PageIndex, e: PageTableEntry) {
        self.entries[i.as_usize()] = e;
    }

    #[inline]
    #[must_use]
    pub const fn index_of(va: VirtualAddress) -> PageIndex {
        PageIndex::from(va)
    }
}

/// Location of one page-table entry: its page table and the slot within it.
///
/// Only produced by a walk of an [`AddressSpace`](crate::AddressSpace), so
/// the table is known to be a live page table of that space.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct PteRef {
    table: PhysicalAddress,
    index: PageIndex,
}

impl PteRef {
    #[inline]
    pub(crate) const fn new(table: PhysicalAddress, index: PageIndex) -> Self {
        debug_assert!(
            table.as_u64().trailing_zeros() >= 11,
            "page table not 2 KiB aligned"
        );
        Self { table, index }
    }

    /// Origin of the page table holding the entry (the `IPTE` table operand).
    #[inline]
    #[must_use]
    pub const fn table(self) -> PhysicalAddress {
        self.table
    }

    #[inline]
    #[must_use]
    pub const fn index(self) -> PageIndex {
        self.index
    }

    /// Physical address of the entry itself.
    #[inline]
    #[must_use]
    pub const fn address(self) -> PhysicalAddress {
        self.table.wrapping_add(entry_offset(self.index.as_usize()))
    }
}

impl fmt::Debug for PteRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PTE({}[{}])", self.table, self.index.as_usize())
    }
}

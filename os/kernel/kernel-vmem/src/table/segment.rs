//! # Segment Table
//!
//! - [`SegmentIndex`]: index from VA bits `[30:20]`.
//! - [`SegmentTableEntry`]: a segment-table entry pointing to a page table.
//! - [`SegmentTable`]: 2048 entries, 16 KiB.
//!
//! Page tables are 2 KiB, so a segment entry stores its origin with 2 KiB
//! granularity. A link entry is just that origin; the table-type code of a
//! segment table is zero.

use bitfield_struct::bitfield;
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};

use crate::level::TableLevel;

/// Number of entries in a segment table.
pub const SEGMENT_TABLE_ENTRIES: usize = 2048;

/// Index into the segment table (derived from VA bits `[30:20]`).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct SegmentIndex(u16);

impl SegmentIndex {
    #[inline]
    #[must_use]
    pub const fn from(va: VirtualAddress) -> Self {
        Self::new(TableLevel::Segment.index_of(va))
    }

    #[inline]
    #[must_use]
    pub const fn new(v: u16) -> Self {
        debug_assert!((v as usize) < SEGMENT_TABLE_ENTRIES);
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// A segment-table entry (format-control 0, i.e. not a large-page leaf).
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct SegmentTableEntry {
    /// Bits 0–1 — Reserved.
    #[bits(2)]
    __reserved0: u8,

    /// Bits 2–3 — TT: always `0b00` for a segment table.
    #[bits(2)]
    pub table_type: u8,

    /// Bit 4 — Reserved.
    #[bits(1)]
    __reserved4: u8,

    /// Bit 5 — I: segment-invalid bit.
    pub invalid: bool,

    /// Bits 6–8 — Reserved.
    #[bits(3)]
    __reserved6: u8,

    /// Bit 9 — P: DAT protection for the whole segment.
    pub protected: bool,

    /// Bit 10 — Reserved.
    #[bits(1)]
    __reserved10: u8,

    /// Bits 11–63 — page-table origin >> 11.
    #[bits(53)]
    origin_2k: u64,
}

impl SegmentTableEntry {
    /// An invalid segment entry.
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self::new().with_invalid(true)
    }

    /// A valid entry pointing to the page table at `page_table`.
    ///
    /// Debug-asserts the origin is 2 KiB aligned.
    #[inline]
    #[must_use]
    pub const fn link(page_table: PhysicalAddress) -> Self {
        debug_assert!(
            page_table.as_u64().trailing_zeros() >= 11,
            "page table not 2 KiB aligned"
        );
        Self::new().with_origin_2k(page_table.as_u64() >> 11)
    }

    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        !self.invalid()
    }

    /// Origin of the page table, if this entry is valid.
    #[inline]
    #[must_use]
    pub const fn next_table(self) -> Option<PhysicalAddress> {
        if self.invalid() {
            return None;
        }
        Some(PhysicalAddress::new(self.origin_2k() << 11))
    }
}

/// The segment table: 2048 entries.
#[repr(C, align(4096))]
pub struct SegmentTable {
    entries: [SegmentTableEntry; SEGMENT_TABLE_ENTRIES],
}

impl SegmentTable {
    /// Mark every entry invalid.
    #[inline]
    pub fn clear(&mut self) {
        self.entries.fill(SegmentTableEntry::empty());
    }

    #[inline]
    #[must_use]
    pub const fn get(&self, i: SegmentIndex) -> SegmentTableEntry {
        self.entries[i.as_usize()]
    }

    #[inline]
    pub const fn set(&mut self, i: SegmentIndex, e: SegmentTableEntry) {
        self.entries[i.as_usize()] = e;
    }

    #[inline]
    #[must_use]
    pub const fn index_of(va: VirtualAddress) -> SegmentIndex {
        SegmentIndex::from(va)
    }
}

//! # Region Tables (Region-First / Region-Second / Region-Third)
//!
//! The three region levels share one entry format and differ only in the
//! table-type code an entry carries and in which address bits index them.
//!
//! - [`RegionLevel`]: sealed marker trait implemented by [`Region1`],
//!   [`Region2`] and [`Region3`].
//! - [`RegionIndex<L>`]: 11-bit index for level `L`.
//! - [`RegionTableEntry`]: one 64-bit region-table entry.
//! - [`RegionTable<L>`]: 2048 entries, 16 KiB.
//!
//! ## Entry encoding
//!
//! A link is `origin | TT | TL=3`: the 4 KiB aligned origin of the next table,
//! the table-type code of the level the entry lives in, and a table length
//! covering the full 2048 entries of the child. An empty entry has only the
//! invalid bit and the table-type code set.

use crate::level::TableLevel;
use bitfield_struct::bitfield;
use core::fmt;
use core::marker::PhantomData;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K, VirtualAddress};
use kernel_registers::asce::DesignationType;

mod sealed {
    pub trait Sealed {}
}

/// Marker for one of the three region levels.
pub trait RegionLevel: sealed::Sealed + Copy + Eq + Ord + core::hash::Hash + fmt::Debug {
    /// The hierarchy level this marker stands for.
    const LEVEL: TableLevel;

    /// Level of the table an entry at this level links to.
    const CHILD: TableLevel = match Self::LEVEL.child() {
        Some(child) => child,
        None => panic!("region levels always link a child table"),
    };

    /// Table-type code written into entries of this level.
    const TABLE_TYPE: DesignationType = match Self::LEVEL.table_type() {
        Some(tt) => tt,
        None => panic!("region levels always carry a table type"),
    };
}

/// Region-first level (VA bits 53..63).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Region1;

/// Region-second level (VA bits 42..52).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Region2;

/// Region-third level (VA bits 31..41).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Region3;

impl sealed::Sealed for Region1 {}
impl sealed::Sealed for Region2 {}
impl sealed::Sealed for Region3 {}

impl RegionLevel for Region1 {
    const LEVEL: TableLevel = TableLevel::Region1;
}

impl RegionLevel for Region2 {
    const LEVEL: TableLevel = TableLevel::Region2;
}

impl RegionLevel for Region3 {
    const LEVEL: TableLevel = TableLevel::Region3;
}

/// Number of entries in a region table.
pub const REGION_TABLE_ENTRIES: usize = 2048;

/// Index into a region table of level `L`.
///
/// Range is `0..2048` (checked in debug builds).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct RegionIndex<L: RegionLevel>(u16, PhantomData<L>);

impl<L: RegionLevel> RegionIndex<L> {
    /// Extract the level-`L` index from a virtual address.
    #[inline]
    #[must_use]
    pub const fn from(va: VirtualAddress) -> Self {
        Self::new(L::LEVEL.index_of(va))
    }

    /// Construct from a raw `u16`.
    #[inline]
    #[must_use]
    pub const fn new(v: u16) -> Self {
        debug_assert!((v as usize) < REGION_TABLE_ENTRIES);
        Self(v, PhantomData)
    }

    /// Return the index as `usize` for table access.
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// A region-table entry.
///
/// | Bits   | Field | Meaning |
/// |--------|-------|---------|
/// | 12..63 | origin | Origin of the next-lower table (4 KiB aligned) |
/// | 9      | P | DAT protection for everything below |
/// | 6..7   | TF | Table offset, in 4 KiB units |
/// | 5      | I | Region invalid |
/// | 2..3   | TT | Table type (level of *this* table) |
/// | 0..1   | TL | Table length of the next table, minus one |
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct RegionTableEntry {
    /// Bits 0–1 — TL: length of the next-lower table.
    #[bits(2)]
    pub table_length: u8,

    /// Bits 2–3 — TT: table type of the table holding this entry.
    #[bits(2)]
    pub table_type: DesignationType,

    /// Bit 4 — Reserved.
    #[bits(1)]
    __reserved4: u8,

    /// Bit 5 — I: region-invalid bit.
    pub invalid: bool,

    /// Bits 6–7 — TF: table offset of the next-lower table.
    #[bits(2)]
    pub table_offset: u8,

    /// Bit 8 — Reserved.
    #[bits(1)]
    __reserved8: u8,

    /// Bit 9 — P: DAT protection.
    pub protected: bool,

    /// Bits 10–11 — Reserved.
    #[bits(2)]
    __reserved10: u8,

    /// Bits 12–63 — origin of the next-lower table >> 12.
    #[bits(52)]
    origin_4k: u64,
}

impl RegionTableEntry {
    /// Table length covering all 2048 entries of the next table.
    pub const FULL_TABLE_LENGTH: u8 = 3;

    /// An invalid entry for a level-`L` table.
    #[inline]
    #[must_use]
    pub const fn empty<L: RegionLevel>() -> Self {
        Self::new().with_invalid(true).with_table_type(L::TABLE_TYPE)
    }

    /// A valid entry in a level-`L` table linking to the table at `next`.
    #[inline]
    #[must_use]
    pub const fn link<L: RegionLevel>(next: PhysicalPage<Size4K>) -> Self {
        Self::new()
            .with_origin_4k(next.number())
            .with_table_type(L::TABLE_TYPE)
            .with_table_length(Self::FULL_TABLE_LENGTH)
    }

    /// `true` unless the region-invalid bit is set.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        !self.invalid()
    }

    /// Origin of the next-lower table, if this entry is valid.
    #[inline]
    #[must_use]
    pub const fn next_table(self) -> Option<PhysicalAddress> {
        if self.invalid() {
            return None;
        }
        Some(PhysicalPage::<Size4K>::from_number(self.origin_4k()).base())
    }
}

/// A region table of level `L`: 2048 entries.
///
/// Tables are handed out by the page allocator as four contiguous pages, so
/// the type only claims page alignment.
#[repr(C, align(4096))]
pub struct RegionTable<L: RegionLevel> {
    entries: [RegionTableEntry; REGION_TABLE_ENTRIES],
    _level: PhantomData<L>,
}

impl<L: RegionLevel> RegionTable<L> {
    /// Mark every entry invalid.
    #[inline]
    pub fn clear(&mut self) {
        self.entries.fill(RegionTableEntry::empty::<L>());
    }

    /// Read the entry at `i`.
    #[inline]
    #[must_use]
    pub const fn get(&self, i: RegionIndex<L>) -> RegionTableEntry {
        self.entries[i.as_usize()]
    }

    /// Write the entry at `i`.
    #[inline]
    pub const fn set(&mut self, i: RegionIndex<L>, e: RegionTableEntry) {
        self.entries[i.as_usize()] = e;
    }

    /// Derive this table's index from a virtual address.
    #[inline]
    #[must_use]
    pub const fn index_of(va: VirtualAddress) -> RegionIndex<L> {
        RegionIndex::from(va)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_entry_encodes_origin_type_and_length() {
        let next = PhysicalPage::<Size4K>::from_addr(PhysicalAddress::new(0x0012_8000));
        assert_eq!(
            RegionTableEntry::link::<Region1>(next).into_bits(),
            0x0012_8000 | 0x0c | 0x03
        );
        assert_eq!(
            RegionTableEntry::link::<Region2>(next).into_bits(),
            0x0012_8000 | 0x08 | 0x03
        );
        assert_eq!(
            RegionTableEntry::link::<Region3>(next).into_bits(),
            0x0012_8000 | 0x04 | 0x03
        );
        assert_eq!(
            RegionTableEntry::link::<Region2>(next).next_table(),
            Some(PhysicalAddress::new(0x0012_8000))
        );
    }

    #[test]
    fn empty_entry_is_invalid_with_table_type() {
        assert_eq!(RegionTableEntry::empty::<Region1>().into_bits(), 0x20 | 0x0c);
        assert_eq!(RegionTableEntry::empty::<Region3>().into_bits(), 0x20 | 0x04);
        assert!(!RegionTableEntry::empty::<Region2>().is_valid());
        assert_eq!(RegionTableEntry::empty::<Region2>().next_table(), None);
    }

    #[test]
    fn all_zero_entry_is_valid() {
        let zero = RegionTableEntry::from_bits(0);
        assert!(zero.is_valid());
        assert_eq!(zero.next_table(), Some(PhysicalAddress::zero()));
    }

    #[test]
    fn index_uses_level_bits() {
        let va = VirtualAddress::new(0x8000_0000_0000_0000 | (5 << 42) | (7 << 31));
        assert_eq!(RegionTable::<Region1>::index_of(va).as_usize(), 0x400);
        assert_eq!(RegionTable::<Region2>::index_of(va).as_usize(), 5);
        assert_eq!(RegionTable::<Region3>::index_of(va).as_usize(), 7);
    }

    #[test]
    fn markers_follow_the_level_chain() {
        assert_eq!(Region1::CHILD, TableLevel::Region2);
        assert_eq!(Region2::CHILD, TableLevel::Region3);
        assert_eq!(Region3::CHILD, TableLevel::Segment);
        assert_eq!(Region1::TABLE_TYPE, DesignationType::Region1);
        assert_eq!(Region3::TABLE_TYPE, DesignationType::Region3);
    }
}

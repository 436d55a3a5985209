//! # Translation Table Levels
//!
//! The five table kinds of a region-first rooted DAT hierarchy, with the
//! geometry each level contributes to a virtual address:
//!
//! ```text
//! | 63‒53 | 52‒42 | 41‒31 | 30‒20 | 19‒12 | 11‒0 |
//! |  RFX  |  RSX  |  RTX  |  SX   |  PX   |  BX  |
//! ```
//!
//! Region and segment tables hold 2048 entries (16 KiB, four contiguous pages).
//! A page table holds 256 entries (2 KiB) and is allocated from a single page.

use core::fmt;
use kernel_memory_addresses::VirtualAddress;
use kernel_registers::asce::DesignationType;

/// One level of the translation hierarchy, root first.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum TableLevel {
    /// Region-first table, designated by the ASCE.
    Region1,
    /// Region-second table.
    Region2,
    /// Region-third table.
    Region3,
    /// Segment table; entries point to page tables.
    Segment,
    /// Page table; entries map 4 KiB frames.
    Page,
}

impl TableLevel {
    /// Bit position of the lowest index bit this level consumes.
    #[inline]
    #[must_use]
    pub const fn index_shift(self) -> u32 {
        match self {
            Self::Region1 => 53,
            Self::Region2 => 42,
            Self::Region3 => 31,
            Self::Segment => 20,
            Self::Page => 12,
        }
    }

    /// Width of this level's index field.
    #[inline]
    #[must_use]
    pub const fn index_bits(self) -> u32 {
        match self {
            Self::Page => 8,
            _ => 11,
        }
    }

    /// Number of entries in a table of this level.
    #[inline]
    #[must_use]
    pub const fn entries(self) -> usize {
        1 << self.index_bits()
    }

    /// Size of a table of this level in bytes.
    #[inline]
    #[must_use]
    pub const fn table_bytes(self) -> usize {
        self.entries() * size_of::<u64>()
    }

    /// Page-allocator order used for a table of this level.
    ///
    /// Page tables only need 2 KiB but are handed out as one whole page.
    #[inline]
    #[must_use]
    pub const fn alloc_order(self) -> u32 {
        match self {
            Self::Page => 0,
            _ => 2,
        }
    }

    /// Extract this level's table index from `va`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn index_of(self, va: VirtualAddress) -> u16 {
        ((va.as_u64() >> self.index_shift()) & ((1 << self.index_bits()) - 1)) as u16
    }

    /// The level an entry of this level links to, if any.
    #[inline]
    #[must_use]
    pub const fn child(self) -> Option<Self> {
        match self {
            Self::Region1 => Some(Self::Region2),
            Self::Region2 => Some(Self::Region3),
            Self::Region3 => Some(Self::Segment),
            Self::Segment => Some(Self::Page),
            Self::Page => None,
        }
    }

    /// Table-type code carried in region and segment entries of this level.
    #[inline]
    #[must_use]
    pub const fn table_type(self) -> Option<DesignationType> {
        match self {
            Self::Region1 => Some(DesignationType::Region1),
            Self::Region2 => Some(DesignationType::Region2),
            Self::Region3 => Some(DesignationType::Region3),
            Self::Segment => Some(DesignationType::Segment),
            Self::Page => None,
        }
    }
}

impl fmt::Display for TableLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Region1 => "region-first table",
            Self::Region2 => "region-second table",
            Self::Region3 => "region-third table",
            Self::Segment => "segment table",
            Self::Page => "page table",
        })
    }
}

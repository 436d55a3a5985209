//! # Table Allocation
//!
//! Obtains zeroed memory for translation tables from a [`PageAlloc`] and
//! fills it with the invalid pattern of the requested level, so a table is
//! never linked while any of its entries still reads as valid.

use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K};
use log::trace;

use crate::level::TableLevel;
use crate::table::page::PageTable;
use crate::table::region::{Region1, Region2, Region3, RegionLevel, RegionTable};
use crate::table::segment::SegmentTable;
use crate::{PageAlloc, PhysMapper};

/// Failure to obtain backing memory for a translation table.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum TableAllocError {
    /// The page allocator had no block for a table of this level.
    #[error("out of memory allocating a {0}")]
    OutOfMemory(TableLevel),
}

/// Allocates and initializes tables through a page allocator and a mapper.
pub(crate) struct TableAllocator<'a, A: ?Sized, M> {
    alloc: &'a mut A,
    mapper: &'a M,
}

impl<'a, A: PageAlloc + ?Sized, M: PhysMapper> TableAllocator<'a, A, M> {
    pub(crate) const fn new(alloc: &'a mut A, mapper: &'a M) -> Self {
        Self { alloc, mapper }
    }

    /// Allocate an empty region-first table.
    pub(crate) fn allocate_root(&mut self) -> Result<PhysicalPage<Size4K>, TableAllocError> {
        self.allocate_region::<Region1>().map(PhysicalAddress::page::<Size4K>)
    }

    /// Allocate an empty table for `level`, the level below an entry being linked.
    pub(crate) fn allocate_next_level(
        &mut self,
        level: TableLevel,
    ) -> Result<PhysicalAddress, TableAllocError> {
        match level {
            TableLevel::Region1 => self.allocate_region::<Region1>(),
            TableLevel::Region2 => self.allocate_region::<Region2>(),
            TableLevel::Region3 => self.allocate_region::<Region3>(),
            TableLevel::Segment => {
                let pa = self.allocate_raw(level)?;
                // SAFETY: `pa` is a fresh, exclusively owned block of `level.table_bytes()`.
                unsafe { self.mapper.phys_to_mut::<SegmentTable>(pa) }.clear();
                Ok(pa)
            }
            TableLevel::Page => {
                let pa = self.allocate_raw(level)?;
                // SAFETY: as above; the page holds a 2 KiB table in its first half.
                unsafe { self.mapper.phys_to_mut::<PageTable>(pa) }.clear();
                Ok(pa)
            }
        }
    }

    fn allocate_region<L: RegionLevel>(&mut self) -> Result<PhysicalAddress, TableAllocError> {
        let pa = self.allocate_raw(L::LEVEL)?;
        // SAFETY: `pa` is a fresh, exclusively owned block of four pages.
        unsafe { self.mapper.phys_to_mut::<RegionTable<L>>(pa) }.clear();
        Ok(pa)
    }

    fn allocate_raw(&mut self, level: TableLevel) -> Result<PhysicalAddress, TableAllocError> {
        let order = level.alloc_order();
        let pa = self
            .alloc
            .alloc_zeroed(order)
            .ok_or(TableAllocError::OutOfMemory(level))?;
        debug_assert!(
            pa.as_u64() % (level.table_bytes() as u64) == 0,
            "{level} at {pa} is not naturally aligned"
        );
        trace!("allocated {level} at {pa} (order {order})");
        Ok(pa)
    }
}

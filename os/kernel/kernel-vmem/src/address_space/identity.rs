//! # Identity Mapping
//!
//! [`IdentityRange`] enumerates the 4 KiB pages of a half-open physical range
//! `[start, end)` whose start is rounded down to a page boundary. The range is
//! measured modulo 2⁶⁴, so an `end` numerically below `start` wraps through
//! the top of the address space: `[0xFFFF_FFFF_FFFF_F000, 0)` is exactly the
//! last page, and `[0xFFFF_FFFF_FFFF_E000, 0x2000)` is four pages. An `end`
//! equal to the rounded start is empty.

use core::iter::FusedIterator;

use kernel_memory_addresses::{PageSize, PhysicalAddress, PhysicalPage, Size4K, VirtualAddress};
use log::debug;

use crate::address_space::AddressSpace;
use crate::table_alloc::TableAllocError;
use crate::{Cpu, PageAlloc, PhysMapper};

/// Pages of `[start & !0xfff, end)`, counted modulo 2⁶⁴.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IdentityRange {
    next: PhysicalPage<Size4K>,
    remaining: u64,
}

impl IdentityRange {
    #[must_use]
    pub const fn new(start: PhysicalAddress, end: PhysicalAddress) -> Self {
        let first = start.page::<Size4K>();
        let bytes = end.wrapping_distance_from(first.base());
        Self {
            next: first,
            remaining: bytes.div_ceil(Size4K::SIZE),
        }
    }

    /// Number of pages not yet yielded.
    #[inline]
    #[must_use]
    pub const fn pages(&self) -> u64 {
        self.remaining
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.remaining == 0
    }
}

impl Iterator for IdentityRange {
    type Item = PhysicalPage<Size4K>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let page = self.next;
        self.next = page.wrapping_next();
        self.remaining -= 1;
        Some(page)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

impl FusedIterator for IdentityRange {}

impl<M: PhysMapper> AddressSpace<'_, M> {
    /// Map every page of [`IdentityRange::new(start, end)`](IdentityRange::new)
    /// to itself and return how many pages were installed.
    ///
    /// # Errors
    /// Propagates the first allocation failure; pages before it stay mapped.
    pub fn map_identity<A: PageAlloc + ?Sized, C: Cpu + ?Sized>(
        &mut self,
        alloc: &mut A,
        cpu: &mut C,
        start: PhysicalAddress,
        end: PhysicalAddress,
    ) -> Result<u64, TableAllocError> {
        let range = IdentityRange::new(start, end);
        debug!("identity mapping [{start}, {end}): {} pages", range.pages());

        let mut mapped = 0;
        for page in range {
            let pa = page.base();
            self.install_page(alloc, cpu, pa, VirtualAddress::identity(pa))?;
            mapped += 1;
        }
        Ok(mapped)
    }
}

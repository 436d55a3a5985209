//! # Address Space (region-first rooted)
//!
//! Builds and edits a **single** translation hierarchy rooted at a
//! region-first table, covering the full 64-bit virtual address space.
//!
//! ## Highlights
//!
//! - [`AddressSpace::leaf_entry`] walks region-first → region-second →
//!   region-third → segment → page table, creating and linking any missing
//!   table on the way, and returns the location of the page-table entry.
//! - [`AddressSpace::install_page`] writes one 4 KiB mapping, invalidating a
//!   previous valid mapping through the [`Cpu`] first.
//! - [`AddressSpace::virt_to_pte_phys`] reads back the translation from the
//!   entry the walk finds.
//! - [`AddressSpace::query`] translates without allocating.
//! - [`AddressSpace::map_identity`] installs `va == pa` over a range.
//!
//! ## Safety
//!
//! - The provided [`PhysMapper`] must yield writable references to table memory.
//! - Tables are never freed; an address space lives for the rest of the boot.

mod identity;

pub use crate::address_space::identity::IdentityRange;

use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K, VirtualAddress};
use kernel_registers::asce::{Asce, DesignationType};
use log::trace;

use crate::table::page::{PageIndex, PageTableEntry, PteRef};
use crate::table::region::{
    Region1, Region2, Region3, RegionIndex, RegionLevel, RegionTable, RegionTableEntry,
};
use crate::table::segment::{SegmentIndex, SegmentTable, SegmentTableEntry};
use crate::table_alloc::{TableAllocError, TableAllocator};
use crate::{Cpu, PageAlloc, PhysMapper};

/// Handle to a single, concrete address space.
pub struct AddressSpace<'m, M: PhysMapper> {
    root: RootPage,
    mapper: &'m M,
}

/// The region-first table of an [`AddressSpace`].
pub type RootPage = PhysicalPage<Size4K>;

impl<'m, M: PhysMapper> AddressSpace<'m, M> {
    /// Allocate an empty region-first table and wrap it.
    ///
    /// # Errors
    /// [`TableAllocError::OutOfMemory`] if the root table cannot be allocated.
    pub fn new<A: PageAlloc + ?Sized>(
        mapper: &'m M,
        alloc: &mut A,
    ) -> Result<Self, TableAllocError> {
        let root = TableAllocator::new(alloc, mapper).allocate_root()?;
        Ok(Self { root, mapper })
    }

    /// Physical page of the region-first table.
    #[inline]
    #[must_use]
    pub const fn root_page(&self) -> RootPage {
        self.root
    }

    /// The ASCE designating this space: root origin, region-first type, full length.
    #[inline]
    #[must_use]
    pub const fn asce(&self) -> Asce {
        Asce::designate(self.root, DesignationType::Region1)
    }

    #[inline]
    fn region<L: RegionLevel>(&self, origin: PhysicalAddress) -> &RegionTable<L> {
        // SAFETY: `origin` was read from this space's own links (or is the root)
        // and the table was initialized for level `L` when it was allocated.
        // Tables are only written through `&mut self`.
        unsafe { self.mapper.phys_to_ref::<RegionTable<L>>(origin) }
    }

    #[inline]
    fn region_mut<L: RegionLevel>(&mut self, origin: PhysicalAddress) -> &mut RegionTable<L> {
        // SAFETY: as in `region`; `&mut self` excludes any other live table reference.
        unsafe { self.mapper.phys_to_mut::<RegionTable<L>>(origin) }
    }

    #[inline]
    fn segment(&self, origin: PhysicalAddress) -> &SegmentTable {
        // SAFETY: as in `region`.
        unsafe { self.mapper.phys_to_ref::<SegmentTable>(origin) }
    }

    #[inline]
    fn segment_mut(&mut self, origin: PhysicalAddress) -> &mut SegmentTable {
        // SAFETY: as in `region_mut`.
        unsafe { self.mapper.phys_to_mut::<SegmentTable>(origin) }
    }

    #[inline]
    fn entry_mut(&mut self, pte: PteRef) -> &mut PageTableEntry {
        // SAFETY: a `PteRef` only comes out of a walk of a live page table.
        unsafe { self.mapper.phys_to_mut::<PageTableEntry>(pte.address()) }
    }

    /// Current contents of the entry at `pte`.
    #[inline]
    #[must_use]
    pub fn pte(&self, pte: PteRef) -> PageTableEntry {
        // SAFETY: a `PteRef` only comes out of a walk of a live page table.
        *unsafe { self.mapper.phys_to_ref::<PageTableEntry>(pte.address()) }
    }

    /// Overwrite the entry at `pte`.
    ///
    /// No TLB maintenance is performed; use [`install_page`](Self::install_page)
    /// to replace a live mapping.
    #[inline]
    pub fn set_pte(&mut self, pte: PteRef, entry: PageTableEntry) {
        *self.entry_mut(pte) = entry;
    }

    /// Locate the page-table entry for `va`, creating missing tables.
    ///
    /// Every step that finds an invalid entry allocates the next table, fills
    /// it with invalid entries and links it. Walking twice for the same `va`
    /// returns the same entry and allocates nothing the second time.
    ///
    /// # Errors
    /// [`TableAllocError::OutOfMemory`] naming the level that could not be
    /// allocated. Tables linked before the failure stay in place.
    pub fn leaf_entry<A: PageAlloc + ?Sized>(
        &mut self,
        alloc: &mut A,
        va: VirtualAddress,
    ) -> Result<PteRef, TableAllocError> {
        let mut tables = TableAllocator::new(alloc, self.mapper);
        let rst = self.descend_region::<Region1, A>(&mut tables, self.root.base(), va)?;
        let rtt = self.descend_region::<Region2, A>(&mut tables, rst, va)?;
        let sgt = self.descend_region::<Region3, A>(&mut tables, rtt, va)?;
        let pt = self.descend_segment(&mut tables, sgt, va)?;
        Ok(PteRef::new(pt, PageIndex::from(va)))
    }

    fn descend_region<L: RegionLevel, A: PageAlloc + ?Sized>(
        &mut self,
        tables: &mut TableAllocator<'_, A, M>,
        origin: PhysicalAddress,
        va: VirtualAddress,
    ) -> Result<PhysicalAddress, TableAllocError> {
        let index = RegionIndex::<L>::from(va);
        if let Some(next) = self.region::<L>(origin).get(index).next_table() {
            return Ok(next);
        }

        let next = tables.allocate_next_level(L::CHILD)?;
        self.region_mut::<L>(origin)
            .set(index, RegionTableEntry::link::<L>(next.page()));
        Ok(next)
    }

    fn descend_segment<A: PageAlloc + ?Sized>(
        &mut self,
        tables: &mut TableAllocator<'_, A, M>,
        origin: PhysicalAddress,
        va: VirtualAddress,
    ) -> Result<PhysicalAddress, TableAllocError> {
        let index = SegmentIndex::from(va);
        if let Some(pt) = self.segment(origin).get(index).next_table() {
            return Ok(pt);
        }

        let pt = tables.allocate_next_level(crate::TableLevel::Page)?;
        self.segment_mut(origin)
            .set(index, SegmentTableEntry::link(pt));
        Ok(pt)
    }

    /// Map the 4 KiB page at `va` to the frame at `pa`.
    ///
    /// If the entry already holds a valid mapping it is invalidated through
    /// `cpu` before the new value is written, so no translation of the old
    /// frame survives in the TLB. Returns the entry that was written.
    ///
    /// Debug-asserts that `pa` is page aligned.
    ///
    /// # Errors
    /// Propagates allocation failures from [`leaf_entry`](Self::leaf_entry);
    /// the entry is left untouched in that case.
    pub fn install_page<A: PageAlloc + ?Sized, C: Cpu + ?Sized>(
        &mut self,
        alloc: &mut A,
        cpu: &mut C,
        pa: PhysicalAddress,
        va: VirtualAddress,
    ) -> Result<PteRef, TableAllocError> {
        debug_assert!(pa.is_aligned::<Size4K>(), "physical address not aligned");

        let pte = self.leaf_entry(alloc, va)?;
        let old = self.pte(pte);
        if old.is_valid() {
            trace!("replacing mapping of {va}: {} -> {pa}", old.frame());
            // SAFETY: `pte` was just found by walking this space for `va`.
            unsafe { cpu.invalidate_pte(va, pte) };
        }
        self.set_pte(pte, PageTableEntry::mapping(pa.page()));
        Ok(pte)
    }

    /// Physical address the entry for `va` designates, plus the byte index of `va`.
    ///
    /// Walks with table creation like [`leaf_entry`](Self::leaf_entry) and
    /// does not look at the entry's invalid bit; use [`query`](Self::query)
    /// for a read-only translation.
    ///
    /// # Errors
    /// Propagates allocation failures from [`leaf_entry`](Self::leaf_entry).
    pub fn virt_to_pte_phys<A: PageAlloc + ?Sized>(
        &mut self,
        alloc: &mut A,
        va: VirtualAddress,
    ) -> Result<PhysicalAddress, TableAllocError> {
        let pte = self.leaf_entry(alloc, va)?;
        Ok(self.pte(pte).translate(va.offset()))
    }

    /// Translate `va` if it is mapped, without allocating anything.
    #[must_use]
    pub fn query(&self, va: VirtualAddress) -> Option<PhysicalAddress> {
        let rst = self
            .region::<Region1>(self.root.base())
            .get(RegionIndex::from(va))
            .next_table()?;
        let rtt = self
            .region::<Region2>(rst)
            .get(RegionIndex::from(va))
            .next_table()?;
        let sgt = self
            .region::<Region3>(rtt)
            .get(RegionIndex::from(va))
            .next_table()?;
        let pt = self.segment(sgt).get(SegmentIndex::from(va)).next_table()?;

        let entry = self.pte(PteRef::new(pt, PageIndex::from(va)));
        entry.is_valid().then(|| entry.translate(va.offset()))
    }
}

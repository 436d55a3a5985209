//! Bump allocator for early page-table and data pages.
//!
//! Hands out naturally aligned blocks of `2^order` pages from a fixed
//! physical window and never frees them. Alignment padding is skipped, not
//! reused. Blocks are zero-filled through the [`PhysMapper`] before they are
//! returned.

use kernel_info::memory::PAGE_SIZE;
use kernel_memory_addresses::PhysicalAddress;
use kernel_vmem::{PageAlloc, PhysMapper};
use log::trace;

pub struct BumpPageAlloc<'m, M: PhysMapper> {
    mapper: &'m M,
    next: u64,
    end: u64,
    allocations: usize,
}

impl<'m, M: PhysMapper> BumpPageAlloc<'m, M> {
    /// Allocator over `[start, end)`.
    pub const fn new(mapper: &'m M, start: PhysicalAddress, end: PhysicalAddress) -> Self {
        Self {
            mapper,
            next: start.as_u64(),
            end: end.as_u64(),
            allocations: 0,
        }
    }

    /// Number of blocks handed out so far.
    #[must_use]
    pub const fn allocations(&self) -> usize {
        self.allocations
    }

    /// Lowest address not yet handed out or skipped.
    #[must_use]
    pub const fn next_free(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.next)
    }

    /// Bytes left between the cursor and the end of the window.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.end.saturating_sub(self.next)
    }
}

impl<M: PhysMapper> PageAlloc for BumpPageAlloc<'_, M> {
    fn alloc_zeroed(&mut self, order: u32) -> Option<PhysicalAddress> {
        let size = PAGE_SIZE.checked_shl(order)?;
        let base = self.next.checked_next_multiple_of(size)?;
        let block_end = base.checked_add(size)?;
        if block_end > self.end {
            trace!(
                "bump allocator exhausted: order {order} at {:#x}",
                self.next
            );
            return None;
        }

        let pa = PhysicalAddress::new(base);
        let len = usize::try_from(size).ok()?;
        // SAFETY: the block lies in the window this allocator owns and has
        // never been handed out.
        unsafe { core::ptr::write_bytes(self.mapper.phys_to_ptr(pa), 0, len) };

        self.next = block_end;
        self.allocations += 1;
        Some(pa)
    }
}

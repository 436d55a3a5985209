//! Host-side stand-ins for physical memory, the page allocator and the CPU.

use core::ptr::NonNull;
use std::alloc::{Layout, alloc_zeroed, dealloc};

use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
use kernel_registers::asce::Asce;
use kernel_registers::psw::PswMask;

use crate::table::page::{PageTableEntry, PteRef};
use crate::{Cpu, PageAlloc, PhysMapper};

/// A zeroed, 16 KiB aligned block of host memory standing in for RAM.
///
/// Physical addresses are byte offsets into the block. Addresses outside it
/// may be installed in mappings but never dereferenced.
pub struct TestPhys {
    base: NonNull<u8>,
    layout: Layout,
}

impl TestPhys {
    pub fn new(len: usize) -> Self {
        let layout = Layout::from_size_align(len, 16 * 1024).expect("layout");
        // SAFETY: the layout has a non-zero size.
        let base = NonNull::new(unsafe { alloc_zeroed(layout) }).expect("host allocation");
        Self { base, layout }
    }

    pub const fn len(&self) -> usize {
        self.layout.size()
    }

    pub fn read_u64(&self, pa: PhysicalAddress) -> u64 {
        // SAFETY: bounds are checked by `phys_to_ptr`.
        unsafe { self.phys_to_ptr(pa).cast::<u64>().read_unaligned() }
    }

    pub fn write_u64(&self, pa: PhysicalAddress, value: u64) {
        // SAFETY: as above.
        unsafe { self.phys_to_ptr(pa).cast::<u64>().write_unaligned(value) }
    }

    /// `count` consecutive 64-bit words starting at `pa`.
    pub fn words(&self, pa: PhysicalAddress, count: usize) -> impl Iterator<Item = u64> + '_ {
        (0..count as u64).map(move |i| self.read_u64(pa.wrapping_add(i * 8)))
    }
}

impl Drop for TestPhys {
    fn drop(&mut self) {
        // SAFETY: allocated in `new` with the same layout.
        unsafe { dealloc(self.base.as_ptr(), self.layout) }
    }
}

impl PhysMapper for TestPhys {
    fn phys_to_ptr(&self, pa: PhysicalAddress) -> *mut u8 {
        let offset = usize::try_from(pa.as_u64()).expect("address fits usize");
        assert!(offset < self.len(), "{pa} is outside simulated RAM");
        // SAFETY: `offset` is within the allocation.
        unsafe { self.base.as_ptr().add(offset) }
    }
}

/// Naturally aligned bump allocator over a window of a [`TestPhys`] that
/// records the order of every successful request.
pub struct CountingAlloc<'p> {
    phys: &'p TestPhys,
    next: u64,
    end: u64,
    orders: Vec<u32>,
}

impl<'p> CountingAlloc<'p> {
    pub fn new(phys: &'p TestPhys, start: u64, end: u64) -> Self {
        Self {
            phys,
            next: start,
            end,
            orders: Vec::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.orders.len()
    }

    pub fn orders(&self) -> Vec<u32> {
        self.orders.clone()
    }
}

impl PageAlloc for CountingAlloc<'_> {
    fn alloc_zeroed(&mut self, order: u32) -> Option<PhysicalAddress> {
        let size = 4096u64 << order;
        let base = self.next.next_multiple_of(size);
        if base + size > self.end {
            return None;
        }
        self.next = base + size;
        self.orders.push(order);
        let pa = PhysicalAddress::new(base);
        let len = usize::try_from(size).expect("block fits usize");
        // SAFETY: the block lies inside the arena and was never handed out before.
        unsafe { core::ptr::write_bytes(self.phys.phys_to_ptr(pa), 0, len) };
        Some(pa)
    }
}

/// One `IPTE` as seen by [`RecordingCpu`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Invalidation {
    pub va: VirtualAddress,
    pub pte: PteRef,
    /// The entry as it was when the invalidation was issued.
    pub entry: PageTableEntry,
}

/// A CPU model that keeps control state in fields and performs `IPTE` by
/// setting the invalid bit in simulated memory.
pub struct RecordingCpu<'p> {
    phys: &'p TestPhys,
    pub asce: Asce,
    pub psw: PswMask,
    /// Mask applied with XOR to every primary-ASCE read, to simulate a faulty readback.
    pub asce_readback_xor: u64,
    pub asce_loads: Vec<Asce>,
    pub invalidations: Vec<Invalidation>,
}

impl<'p> RecordingCpu<'p> {
    pub fn new(phys: &'p TestPhys) -> Self {
        Self {
            phys,
            asce: Asce::new(),
            psw: PswMask::from_bits(0x0304_0001_8000_0000),
            asce_readback_xor: 0,
            asce_loads: Vec::new(),
            invalidations: Vec::new(),
        }
    }
}

impl Cpu for RecordingCpu<'_> {
    fn primary_asce(&self) -> Asce {
        Asce::from_bits(self.asce.into_bits() ^ self.asce_readback_xor)
    }

    unsafe fn set_primary_asce(&mut self, asce: Asce) {
        self.asce_loads.push(asce);
        self.asce = asce;
    }

    fn psw_mask(&self) -> PswMask {
        self.psw
    }

    unsafe fn set_psw_mask(&mut self, mask: PswMask) {
        self.psw = mask;
    }

    unsafe fn invalidate_pte(&mut self, va: VirtualAddress, pte: PteRef) {
        let entry = PageTableEntry::from_bits(self.phys.read_u64(pte.address()));
        self.invalidations.push(Invalidation { va, pte, entry });
        self.phys
            .write_u64(pte.address(), entry.with_invalid(true).into_bits());
    }
}

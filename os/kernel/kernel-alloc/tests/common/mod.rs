//! Simulated machine for driving the bootstrap on the host.

#![allow(dead_code)]

use std::alloc::{Layout, alloc_zeroed, dealloc};
use std::ptr::NonNull;

use kernel_alloc::frame_alloc::BumpPageAlloc;
use kernel_alloc::vmm::Vmm;
use kernel_vmem::{
    Asce, Cpu, PageTableEntry, PhysMapper, PhysicalAddress, PswMask, PteRef, VirtualAddress,
};

/// Simulated RAM: physical address `n` is byte `n` of a host allocation.
pub struct HostRam {
    base: NonNull<u8>,
    layout: Layout,
}

impl HostRam {
    pub fn new(len: usize) -> Self {
        let layout = Layout::from_size_align(len, 16 * 1024).expect("layout");
        let base = NonNull::new(unsafe { alloc_zeroed(layout) }).expect("host allocation");
        Self { base, layout }
    }

    pub fn len(&self) -> u64 {
        self.layout.size() as u64
    }

    pub fn read_u64(&self, pa: PhysicalAddress) -> u64 {
        unsafe { self.phys_to_ptr(pa).cast::<u64>().read_unaligned() }
    }

    pub fn write_u64(&self, pa: PhysicalAddress, value: u64) {
        unsafe { self.phys_to_ptr(pa).cast::<u64>().write_unaligned(value) }
    }
}

impl Drop for HostRam {
    fn drop(&mut self) {
        unsafe { dealloc(self.base.as_ptr(), self.layout) }
    }
}

impl PhysMapper for HostRam {
    fn phys_to_ptr(&self, pa: PhysicalAddress) -> *mut u8 {
        assert!(pa.as_u64() < self.len(), "{pa} is outside simulated RAM");
        let offset = usize::try_from(pa.as_u64()).expect("address fits usize");
        unsafe { self.base.as_ptr().add(offset) }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Ipte {
    pub va: VirtualAddress,
    pub table: PhysicalAddress,
    pub entry: PageTableEntry,
}

/// CPU model: control state in fields, `IPTE` sets the invalid bit in RAM.
pub struct SimCpu<'r> {
    ram: &'r HostRam,
    pub cr1: Asce,
    pub psw: PswMask,
    pub cr1_readback_xor: u64,
    pub iptes: Vec<Ipte>,
}

impl<'r> SimCpu<'r> {
    /// 64-bit supervisor mask with I/O, external and machine-check interrupts enabled.
    pub const INITIAL_PSW: u64 = 0x0304_0001_8000_0000;

    pub fn new(ram: &'r HostRam) -> Self {
        Self {
            ram,
            cr1: Asce::new(),
            psw: PswMask::from_bits(Self::INITIAL_PSW),
            cr1_readback_xor: 0,
            iptes: Vec::new(),
        }
    }
}

impl Cpu for SimCpu<'_> {
    fn primary_asce(&self) -> Asce {
        Asce::from_bits(self.cr1.into_bits() ^ self.cr1_readback_xor)
    }

    unsafe fn set_primary_asce(&mut self, asce: Asce) {
        self.cr1 = asce;
    }

    fn psw_mask(&self) -> PswMask {
        self.psw
    }

    unsafe fn set_psw_mask(&mut self, mask: PswMask) {
        self.psw = mask;
    }

    unsafe fn invalidate_pte(&mut self, va: VirtualAddress, pte: PteRef) {
        let entry = PageTableEntry::from_bits(self.ram.read_u64(pte.address()));
        self.iptes.push(Ipte {
            va,
            table: pte.table(),
            entry,
        });
        self.ram
            .write_u64(pte.address(), entry.with_invalid(true).into_bits());
    }
}

/// RAM size backing the tables; installed memory may be reported larger.
pub const RAM: usize = 4 << 20;

/// Tables and data pages come from `[1 MiB, 4 MiB)`.
pub fn allocator(ram: &HostRam) -> BumpPageAlloc<'_, HostRam> {
    let end = PhysicalAddress::new(ram.len());
    BumpPageAlloc::new(ram, PhysicalAddress::new(0x0010_0000), end)
}

pub type TestVmm<'r, 'c> = Vmm<'r, HostRam, BumpPageAlloc<'r, HostRam>, &'c mut SimCpu<'r>>;

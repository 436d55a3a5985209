//! Virtual Memory Manager (VMM) for the kernel's single address space.
//!
//! [`Vmm::setup`] performs the DAT bootstrap: it builds a region-first rooted
//! address space, identity maps installed memory and the guard region at the
//! top of the address space, and turns translation on. The returned `Vmm`
//! owns the address space, the page allocator and the CPU handle for the rest
//! of the kernel's life.
//!
//! Failures in the bootstrap and in the plain operations are fatal: they are
//! logged and the kernel panics. The `try_*` variants return the error.
//!
//! # Example
//! ```ignore
//! use kernel_alloc::{frame_alloc::BumpPageAlloc, phys_mapper::IdentityPhysMapper, vmm::Vmm};
//! use kernel_vmem::{PhysicalAddress, S390Cpu};
//!
//! let mapper = IdentityPhysMapper;
//! let pages = BumpPageAlloc::new(&mapper, free_start, free_end);
//! let mut vmm = unsafe { Vmm::setup(&mapper, pages, S390Cpu::new(), ram_end) };
//! let buffer = vmm.map_fresh_pages(4)?;
//! ```

use kernel_info::memory::{GUARD_REGION_BASE, GUARD_REGION_END, PAGE_SIZE, VPAGE_TOP};
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
use kernel_registers::asce::Asce;
use kernel_vmem::{
    ActivationError, AddressSpace, Cpu, PageAlloc, PhysMapper, PteRef, TableAllocError, dat,
};
use log::{error, info};

/// Owner of the kernel address space and its collaborators.
pub struct Vmm<'m, M: PhysMapper, A: PageAlloc, C: Cpu> {
    aspace: AddressSpace<'m, M>,
    alloc: A,
    cpu: C,
    /// Next free virtual page boundary; [`Vmm::alloc_vpages`] grows down from here.
    vpage_top: u64,
    /// Lowest address `alloc_vpages` may hand out: the end of identity-mapped RAM.
    vpage_floor: u64,
}

impl<'m, M: PhysMapper, A: PageAlloc, C: Cpu> Vmm<'m, M, A, C> {
    /// Build the kernel address space and enable DAT.
    ///
    /// # Panics
    /// On any failure (see [`try_setup`](Self::try_setup)), after logging it.
    ///
    /// # Safety
    /// See [`try_setup`](Self::try_setup).
    pub unsafe fn setup(mapper: &'m M, alloc: A, cpu: C, phys_end: PhysicalAddress) -> Self {
        match unsafe { Self::try_setup(mapper, alloc, cpu, phys_end) } {
            Ok(vmm) => vmm,
            Err(e) => fatal(&e),
        }
    }

    /// Build the kernel address space and enable DAT.
    ///
    /// 1. Allocate an empty region-first table.
    /// 2. Identity map `[0, phys_end)`.
    /// 3. Start the virtual page allocator just below the guard region.
    /// 4. Identity map the guard region, the top 128 MiB of the address space.
    ///    No memory is installed there, so a stray access faults with an
    ///    address that points into the region.
    /// 5. Load the primary ASCE and set the PSW DAT bit.
    ///
    /// # Errors
    /// - [`VmmError::OutOfMemory`] if a translation table cannot be allocated.
    /// - [`VmmError::Activation`] if CR1 does not read back the loaded ASCE.
    ///
    /// # Safety
    /// Must run once, with DAT off, in supervisor state. `[0, phys_end)` must
    /// contain the executing code, its stack and every table `alloc` hands
    /// out, and `mapper` must stay valid once the identity map is active.
    pub unsafe fn try_setup(
        mapper: &'m M,
        mut alloc: A,
        mut cpu: C,
        phys_end: PhysicalAddress,
    ) -> Result<Self, VmmError> {
        let mut aspace = AddressSpace::new(mapper, &mut alloc)?;

        let ram = aspace.map_identity(&mut alloc, &mut cpu, PhysicalAddress::zero(), phys_end)?;
        info!("identity mapped {ram} pages of installed memory below {phys_end}");

        let vpage_top = VPAGE_TOP;
        let vpage_floor = phys_end
            .as_u64()
            .checked_next_multiple_of(PAGE_SIZE)
            .unwrap_or(u64::MAX);

        let guard = aspace.map_identity(
            &mut alloc,
            &mut cpu,
            PhysicalAddress::new(GUARD_REGION_BASE),
            PhysicalAddress::new(GUARD_REGION_END),
        )?;
        info!("identity mapped {guard} guard pages from {GUARD_REGION_BASE:#018x}");

        unsafe { dat::enable(&mut cpu, &aspace)? };

        Ok(Self {
            aspace,
            alloc,
            cpu,
            vpage_top,
            vpage_floor,
        })
    }

    /// Map the page at `va` to the frame at `pa`, replacing any previous mapping.
    ///
    /// # Panics
    /// If a translation table cannot be allocated, after logging it.
    pub fn install_page(&mut self, pa: PhysicalAddress, va: VirtualAddress) -> PteRef {
        self.try_install_page(pa, va).unwrap_or_else(|e| fatal(&e))
    }

    /// Map the page at `va` to the frame at `pa`, replacing any previous mapping.
    ///
    /// # Errors
    /// [`VmmError::OutOfMemory`] if a translation table cannot be allocated.
    pub fn try_install_page(
        &mut self,
        pa: PhysicalAddress,
        va: VirtualAddress,
    ) -> Result<PteRef, VmmError> {
        Ok(self
            .aspace
            .install_page(&mut self.alloc, &mut self.cpu, pa, va)?)
    }

    /// Physical address designated by the page-table entry for `va`.
    ///
    /// Only meaningful for addresses that have been mapped; see
    /// [`AddressSpace::virt_to_pte_phys`].
    ///
    /// # Panics
    /// If a translation table cannot be allocated, after logging it.
    pub fn virt_to_pte_phys(&mut self, va: VirtualAddress) -> PhysicalAddress {
        self.try_virt_to_pte_phys(va).unwrap_or_else(|e| fatal(&e))
    }

    /// Physical address designated by the page-table entry for `va`.
    ///
    /// # Errors
    /// [`VmmError::OutOfMemory`] if a translation table cannot be allocated.
    pub fn try_virt_to_pte_phys(
        &mut self,
        va: VirtualAddress,
    ) -> Result<PhysicalAddress, VmmError> {
        Ok(self.aspace.virt_to_pte_phys(&mut self.alloc, va)?)
    }

    /// Translate VA→PA if mapped, without allocating.
    #[must_use]
    pub fn query(&self, va: VirtualAddress) -> Option<PhysicalAddress> {
        self.aspace.query(va)
    }

    /// Reserve `pages` contiguous virtual pages below the previous reservation
    /// and return the lowest address. Nothing is mapped.
    ///
    /// # Errors
    /// [`VmmError::VirtualSpaceExhausted`] if the reservation would reach
    /// into identity-mapped memory.
    pub fn alloc_vpages(&mut self, pages: u64) -> Result<VirtualAddress, VmmError> {
        let base = pages
            .checked_mul(PAGE_SIZE)
            .and_then(|bytes| self.vpage_top.checked_sub(bytes))
            .filter(|&base| base >= self.vpage_floor)
            .ok_or(VmmError::VirtualSpaceExhausted(pages))?;
        self.vpage_top = base;
        Ok(VirtualAddress::new(base))
    }

    /// Reserve `pages` virtual pages and back each with a fresh zeroed frame.
    ///
    /// If the very first page cannot be backed, the reservation is returned
    /// and [`vpage_top`](Self::vpage_top) is unchanged. A later failure keeps
    /// the whole reservation, and the pages mapped so far stay mapped.
    ///
    /// # Errors
    /// - [`VmmError::VirtualSpaceExhausted`] from [`alloc_vpages`](Self::alloc_vpages).
    /// - [`VmmError::OutOfPages`] if no frame is left.
    /// - [`VmmError::OutOfMemory`] if a translation table cannot be allocated.
    pub fn map_fresh_pages(&mut self, pages: u64) -> Result<VirtualAddress, VmmError> {
        let top = self.vpage_top;
        let base = self.alloc_vpages(pages)?;
        let mut va = base;
        for mapped in 0..pages {
            if let Err(err) = self.back_page(va) {
                if mapped == 0 {
                    self.vpage_top = top;
                }
                return Err(err);
            }
            va = va.wrapping_add(PAGE_SIZE);
        }
        Ok(base)
    }

    fn back_page(&mut self, va: VirtualAddress) -> Result<PteRef, VmmError> {
        let pa = self.alloc.alloc_zeroed(0).ok_or(VmmError::OutOfPages)?;
        self.try_install_page(pa, va)
    }

    /// The ASCE designating this address space.
    #[must_use]
    pub const fn asce(&self) -> Asce {
        self.aspace.asce()
    }

    /// Current top of the virtual page allocator (exclusive).
    #[must_use]
    pub const fn vpage_top(&self) -> VirtualAddress {
        VirtualAddress::new(self.vpage_top)
    }

    #[must_use]
    pub const fn address_space(&self) -> &AddressSpace<'m, M> {
        &self.aspace
    }

    pub const fn address_space_mut(&mut self) -> &mut AddressSpace<'m, M> {
        &mut self.aspace
    }

    #[must_use]
    pub const fn allocator(&self) -> &A {
        &self.alloc
    }

    pub const fn allocator_mut(&mut self) -> &mut A {
        &mut self.alloc
    }

    #[must_use]
    pub const fn cpu(&self) -> &C {
        &self.cpu
    }

    pub const fn cpu_mut(&mut self) -> &mut C {
        &mut self.cpu
    }
}

/// Report an unrecoverable memory-management failure and stop.
#[cold]
fn fatal(err: &VmmError) -> ! {
    error!("fatal: {err}");
    panic!("{err}");
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum VmmError {
    #[error("translation table allocation failed: {0}")]
    OutOfMemory(TableAllocError),
    #[error("failed to activate address space: {0}")]
    Activation(ActivationError),
    #[error("out of physical pages")]
    OutOfPages,
    #[error("virtual address space exhausted reserving {0} pages")]
    VirtualSpaceExhausted(u64),
}

impl From<TableAllocError> for VmmError {
    fn from(value: TableAllocError) -> Self {
        Self::OutOfMemory(value)
    }
}

impl From<ActivationError> for VmmError {
    fn from(value: ActivationError) -> Self {
        Self::Activation(value)
    }
}

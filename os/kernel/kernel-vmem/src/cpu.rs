//! # CPU Seam
//!
//! The translation code touches three pieces of processor state: control
//! register 1 (primary ASCE), the PSW mask (DAT bit) and the TLB (through
//! `IPTE`). [`Cpu`] abstracts them so the same code drives real hardware
//! ([`S390Cpu`], with the `asm` feature on `s390x`) and host-side models.

use kernel_memory_addresses::VirtualAddress;
use kernel_registers::asce::Asce;
use kernel_registers::psw::PswMask;

use crate::table::page::PteRef;

/// Processor state used by the DAT bootstrap.
pub trait Cpu {
    /// Current primary ASCE (CR1).
    fn primary_asce(&self) -> Asce;

    /// Load the primary ASCE (CR1).
    ///
    /// # Safety
    /// With DAT enabled, the new address space must map the executing code
    /// and stack.
    unsafe fn set_primary_asce(&mut self, asce: Asce);

    /// Current PSW mask.
    fn psw_mask(&self) -> PswMask;

    /// Replace the PSW mask, continuing at the next instruction.
    ///
    /// # Safety
    /// Changes the translation mode, interruption masks and addressing mode
    /// of every following instruction.
    unsafe fn set_psw_mask(&mut self, mask: PswMask);

    /// Invalidate the page-table entry `pte` mapping `va` and purge any TLB
    /// copies (`IPTE`). Afterwards the entry has its invalid bit set.
    ///
    /// # Safety
    /// `pte` must be the entry of a live page table that translates `va`.
    unsafe fn invalidate_pte(&mut self, va: VirtualAddress, pte: PteRef);
}

impl<C: Cpu + ?Sized> Cpu for &mut C {
    #[inline]
    fn primary_asce(&self) -> Asce {
        (**self).primary_asce()
    }

    #[inline]
    unsafe fn set_primary_asce(&mut self, asce: Asce) {
        unsafe { (**self).set_primary_asce(asce) }
    }

    #[inline]
    fn psw_mask(&self) -> PswMask {
        (**self).psw_mask()
    }

    #[inline]
    unsafe fn set_psw_mask(&mut self, mask: PswMask) {
        unsafe { (**self).set_psw_mask(mask) }
    }

    #[inline]
    unsafe fn invalidate_pte(&mut self, va: VirtualAddress, pte: PteRef) {
        unsafe { (**self).invalidate_pte(va, pte) }
    }
}

/// The executing z/Architecture processor.
#[cfg(all(feature = "asm", target_arch = "s390x"))]
#[derive(Debug)]
pub struct S390Cpu {
    _private: (),
}

#[cfg(all(feature = "asm", target_arch = "s390x"))]
impl S390Cpu {
    /// # Safety
    /// The caller must be running in supervisor state; every method issues
    /// privileged instructions.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

#[cfg(all(feature = "asm", target_arch = "s390x"))]
impl Cpu for S390Cpu {
    #[inline]
    fn primary_asce(&self) -> Asce {
        use kernel_registers::LoadRegisterUnsafe;
        // SAFETY: supervisor state is a construction precondition.
        unsafe { Asce::load_unsafe() }
    }

    #[inline]
    unsafe fn set_primary_asce(&mut self, asce: Asce) {
        use kernel_registers::StoreRegisterUnsafe;
        unsafe { asce.store_unsafe() }
    }

    #[inline]
    fn psw_mask(&self) -> PswMask {
        use kernel_registers::LoadRegisterUnsafe;
        // SAFETY: supervisor state is a construction precondition.
        unsafe { PswMask::load_unsafe() }
    }

    #[inline]
    unsafe fn set_psw_mask(&mut self, mask: PswMask) {
        use kernel_registers::StoreRegisterUnsafe;
        unsafe { mask.store_unsafe() }
    }

    #[inline]
    unsafe fn invalidate_pte(&mut self, va: VirtualAddress, pte: PteRef) {
        unsafe { ipte(va, pte) }
    }
}

/// `IPTE` with the page-table origin of `pte` and the page of `va`.
///
/// # Safety
/// Supervisor state; `pte` must be the live entry translating `va`.
#[cfg(all(feature = "asm", target_arch = "s390x"))]
#[inline]
pub unsafe fn ipte(va: VirtualAddress, pte: PteRef) {
    use kernel_memory_addresses::Size4K;

    let origin = pte.table().as_u64();
    let page = va.page::<Size4K>().base().as_u64();
    unsafe {
        core::arch::asm!(
            "ipte {origin},{page}",
            origin = in(reg_addr) origin,
            page = in(reg_addr) page,
            options(nostack, preserves_flags),
        );
    }
}

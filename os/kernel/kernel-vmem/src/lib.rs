//! # Virtual Memory Support
//!
//! Builds the z/Architecture dynamic-address-translation (DAT) hierarchy for
//! a freshly booted kernel and switches translation on.
//!
//! ## What you get
//! - An [`address space`](address_space) rooted at a region-first table,
//!   with a creating walker, a single-page installer and an identity-range
//!   mapper.
//! - Typed [`table`] formats for region, segment and page tables.
//! - [`dat::enable`] to load the primary ASCE and set the PSW DAT bit.
//! - Collaborator seams: [`PageAlloc`] for table memory, [`PhysMapper`] to
//!   reach that memory, and [`Cpu`] for control registers and `IPTE`.
//!
//! ## Virtual Address → Real Address Walk
//!
//! A 64-bit virtual address is split into five indices and a byte index:
//!
//! ```text
//! | 63‒53 | 52‒42 | 41‒31 | 30‒20 | 19‒12 | 11‒0 |
//! |  RFX  |  RSX  |  RTX  |  SX   |  PX   |  BX  |
//! ```
//!
//! ```text
//!  ASCE (CR1)
//!   └─► Region-first table  ─RFX─► Region-second table ─RSX─► Region-third table
//!        ─RTX─► Segment table ─SX─► Page table ─PX─► 4 KiB frame + BX
//! ```
//!
//! | Level | Entries | Size | Entry points to |
//! |:------|--------:|-----:|:----------------|
//! | Region-first | 2048 | 16 KiB | region-second table |
//! | Region-second | 2048 | 16 KiB | region-third table |
//! | Region-third | 2048 | 16 KiB | segment table |
//! | Segment | 2048 | 16 KiB | page table (2 KiB aligned) |
//! | Page | 256 | 2 KiB | 4 KiB frame |
//!
//! Unlike other architectures, an entry is valid when its **invalid** bit is
//! clear; an all-zero entry is a valid link to address zero. Every table is
//! filled with invalid entries before it is linked.

#![cfg_attr(not(test), no_std)]
#![allow(unsafe_code)]

pub mod address_space;
mod cpu;
pub mod dat;
mod level;
pub mod table;
mod table_alloc;

#[cfg(test)]
mod testing;

pub use crate::address_space::{AddressSpace, IdentityRange, RootPage};
pub use crate::cpu::Cpu;
#[cfg(all(feature = "asm", target_arch = "s390x"))]
pub use crate::cpu::{S390Cpu, ipte};
pub use crate::dat::ActivationError;
pub use crate::level::TableLevel;
pub use crate::table::page::{PageTableEntry, PteRef};
pub use crate::table_alloc::TableAllocError;

pub use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
pub use kernel_registers::asce::Asce;
pub use kernel_registers::psw::PswMask;

/// Re-export constants as info module.
pub use kernel_info::memory as info;

/// Source of physical memory for translation tables.
///
/// Returns `None` when no block of the requested size is left.
pub trait PageAlloc {
    /// Allocate `2^order` contiguous 4 KiB pages, zero-filled and aligned to
    /// their own size.
    fn alloc_zeroed(&mut self, order: u32) -> Option<PhysicalAddress>;
}

impl<A: PageAlloc + ?Sized> PageAlloc for &mut A {
    #[inline]
    fn alloc_zeroed(&mut self, order: u32) -> Option<PhysicalAddress> {
        (**self).alloc_zeroed(order)
    }
}

/// Converts physical addresses to pointers usable in the current address space.
///
/// During the bootstrap, before DAT is on, this is the identity. Host-side
/// tests back it with an ordinary allocation.
pub trait PhysMapper {
    /// Pointer through which the byte at `pa` can be read and written.
    fn phys_to_ptr(&self, pa: PhysicalAddress) -> *mut u8;

    /// View the memory at `pa` as a `T`.
    ///
    /// # Safety
    /// - `pa` must be suitably aligned for `T` and the `size_of::<T>()` bytes
    ///   there must hold a valid `T`.
    /// - No other reference to the same bytes may be alive during `'a`.
    #[inline]
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        unsafe { &mut *self.phys_to_ptr(pa).cast::<T>() }
    }

    /// Shared view of the memory at `pa` as a `T`.
    ///
    /// # Safety
    /// As [`phys_to_mut`](Self::phys_to_mut), except that other shared
    /// references may coexist; no mutable one may.
    #[inline]
    unsafe fn phys_to_ref<'a, T>(&self, pa: PhysicalAddress) -> &'a T {
        unsafe { &*self.phys_to_ptr(pa).cast::<T>().cast_const() }
    }
}

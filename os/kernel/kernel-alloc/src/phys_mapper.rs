//! # Identity `PhysMapper`
//!
//! During the DAT bootstrap the kernel runs with translation off, so a real
//! address is directly usable as a pointer. After [`Vmm::setup`] the identity
//! map keeps that true for all of installed memory.
//!
//! [`Vmm::setup`]: crate::vmm::Vmm::setup

use kernel_memory_addresses::PhysicalAddress;
use kernel_vmem::PhysMapper;

/// [`PhysMapper`] for `va == pa`.
///
/// # Safety
/// Only valid while DAT is off, or while the referenced range is identity mapped.
#[derive(Debug, Copy, Clone, Default)]
pub struct IdentityPhysMapper;

impl PhysMapper for IdentityPhysMapper {
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn phys_to_ptr(&self, pa: PhysicalAddress) -> *mut u8 {
        core::ptr::with_exposed_provenance_mut(pa.as_u64() as usize)
    }
}

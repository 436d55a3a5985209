//! # Control Registers
//!
//! Number of the control register holding the primary address-space-control element,
//! and raw `LCTLG`/`STCTG` wrappers for a single 64-bit control register.

/// CR1 — primary ASCE.
pub const PRIMARY_ASCE: u8 = 1;

/// Load control register `N` with `value` (`LCTLG N,N`).
///
/// # Safety
/// Requires supervisor state. The new value takes effect for the following
/// instructions; for translation-related registers the caller must ensure the
/// resulting translation state is consistent.
#[cfg(all(feature = "asm", target_arch = "s390x"))]
#[inline]
pub unsafe fn load<const N: u8>(value: u64) {
    unsafe {
        core::arch::asm!(
            "lctlg {n},{n},0({src})",
            n = const N,
            src = in(reg_addr) &raw const value,
            options(nostack, preserves_flags),
        );
    }
}

/// Store control register `N` (`STCTG N,N`).
///
/// # Safety
/// Requires supervisor state.
#[cfg(all(feature = "asm", target_arch = "s390x"))]
#[inline]
#[must_use]
pub unsafe fn store<const N: u8>() -> u64 {
    let mut value: u64 = 0;
    unsafe {
        core::arch::asm!(
            "stctg {n},{n},0({dst})",
            n = const N,
            dst = in(reg_addr) &raw mut value,
            options(nostack, preserves_flags),
        );
    }
    value
}

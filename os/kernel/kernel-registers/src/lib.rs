//! # Typed z/Architecture Control State
//!
//! Bitfield models for the pieces of processor state the DAT bootstrap touches:
//!
//! - [`asce::Asce`]: Address-Space-Control Element, held in control register 1
//!   (primary space), designating the root translation table.
//! - [`psw::PswMask`]: the mask half of the Program Status Word, whose DAT bit
//!   gates address translation.
//!
//! With the `asm` feature on `s390x` the types also implement
//! [`LoadRegisterUnsafe`] / [`StoreRegisterUnsafe`] using `STCTG`/`LCTLG` and
//! `EPSW`/`LPSWE`. On other targets only the value types are available, which is
//! what host-side tests use.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

#[cfg(feature = "asce")]
pub mod asce;

pub mod cr;

#[cfg(feature = "psw")]
pub mod psw;

pub trait LoadRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety requirements.
    /// Control-register and PSW access is privileged and requires supervisor state.
    unsafe fn load_unsafe() -> Self;
}

pub trait StoreRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety requirements.
    /// Storing translation state changes how every following storage reference
    /// (including instruction fetch) is interpreted.
    unsafe fn store_unsafe(self);
}

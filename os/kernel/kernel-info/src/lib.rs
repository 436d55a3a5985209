//! # DAT Bootstrap Configuration
//!
//! Compile-time layout constants shared by the translation-table code and the
//! bootstrap that drives it. Nothing here is configurable at runtime: the
//! table geometry is fixed by the architecture and the address-space layout is
//! fixed by the test image.
//!
//! ## Address Space Layout
//!
//! ```text
//! 0x0000_0000_0000_0000 ┌─────────────────────────────────┐
//!                       │  Identity map of physical RAM   │
//!                       │  [0, phys_end)                  │
//! phys_end              ├─────────────────────────────────┤
//!                       │          (unmapped)             │
//!                       ├─────────────────────────────────┤ ◄── vpages grow down from here
//! GUARD_REGION_BASE     ├─────────────────────────────────┤ 0xffff_ffff_f800_0000
//!                       │  Guard region (identity map,    │
//!                       │  no storage behind it)          │
//! 0xFFFF_FFFF_FFFF_FFFF └─────────────────────────────────┘
//! ```
//!
//! The guard region is mapped, but its physical addresses lie far beyond any
//! installed storage, so every access ends in an addressing exception whose
//! translation-exception address points into the region.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod memory;

//! # Kernel Memory Bootstrap
//!
//! Concrete collaborators for `kernel-vmem` and the [`Vmm`](vmm::Vmm) that
//! ties them together to bring up dynamic address translation.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                Virtual Memory Manager (VMM)         │
//! │    • DAT bootstrap (identity map + activation)      │
//! │    • Single-page install / translate / query        │
//! │    • Downward-growing virtual page allocator        │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │              Physical Mapper                        │
//! │    • Identity: a real address is the pointer        │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │           Bump Page Allocator                       │
//! │    • Naturally aligned 2^order page blocks          │
//! │    • Zero-filled, never freed                       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Memory Layout Integration
//!
//! ```text
//! 0x0000_0000_0000_0000 ┌─────────────────────────────────┐
//!                       │  Installed memory (identity)    │
//! phys_end              ├─────────────────────────────────┤
//!                       │  Unmapped                       │
//!                       │        ▲ alloc_vpages grows     │
//! VPAGE_TOP             ├─────────────────────────────────┤
//! GUARD_REGION_BASE     │  Guard region (identity, 128 MiB│
//!                       │  of addresses with no memory)   │
//! 0xFFFF_FFFF_FFFF_FFFF └─────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! # #[cfg(all(feature = "asm", target_arch = "s390x"))]
//! # fn boot() {
//! use kernel_alloc::{frame_alloc::BumpPageAlloc, phys_mapper::IdentityPhysMapper, vmm::Vmm};
//! use kernel_vmem::{PhysicalAddress, S390Cpu};
//!
//! let mapper = IdentityPhysMapper;
//! let pages = BumpPageAlloc::new(
//!     &mapper,
//!     PhysicalAddress::new(0x0040_0000),
//!     PhysicalAddress::new(0x0080_0000),
//! );
//! let vmm = unsafe { Vmm::setup(&mapper, pages, S390Cpu::new(), PhysicalAddress::new(0x0800_0000)) };
//! # }
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod frame_alloc;
pub mod phys_mapper;
pub mod vmm;

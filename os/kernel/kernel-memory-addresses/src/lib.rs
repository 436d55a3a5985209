//! # Physical and Virtual Memory Address Types
//!
//! Zero-cost newtypes over `u64` that keep physical and virtual addresses
//! apart at compile time, plus page-granular views of both.
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`MemoryAddress`] | Raw 64-bit address of either kind. |
//! | [`PhysicalAddress`] / [`PhysicalPage<S>`] | Absolute storage addresses (what DAT tables and the ASCE contain). |
//! | [`VirtualAddress`] / [`VirtualPage<S>`] | Addresses as issued by the program once DAT is on. |
//! | [`MemoryAddressOffset<S>`] | Byte index inside a page of size `S`. |
//!
//! z/Architecture DAT translates in units of 4 KiB ([`Size4K`]); larger frame
//! sizes (EDAT-1/EDAT-2) are not modelled.
//!
//! ## Wrapping page cursors
//!
//! The top of the 64-bit address space is mapped like any other region, so
//! walking pages may run past `0xFFFF_FFFF_FFFF_F000` and continue at zero.
//! Page types therefore offer [`PhysicalPage::wrapping_next`] and friends
//! rather than overflowing additions.
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let top = PhysicalPage::<Size4K>::from_addr(PhysicalAddress::new(u64::MAX));
//! assert_eq!(top.base().as_u64(), 0xFFFF_FFFF_FFFF_F000);
//! assert_eq!(top.wrapping_next().base().as_u64(), 0);
//!
//! let va = VirtualAddress::new(0x0000_0000_0123_4567);
//! let (page, off) = va.split::<Size4K>();
//! assert_eq!(off.as_u64(), 0x567);
//! assert_eq!(page.join(off), va);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(clippy::inline_always)]

mod memory_address;
mod memory_address_offset;
mod memory_page;
mod page_size;
mod physical_address;
mod physical_page;
mod virtual_address;
mod virtual_page;

pub use crate::memory_address::MemoryAddress;
pub use crate::memory_address_offset::MemoryAddressOffset;
pub use crate::memory_page::MemoryPage;
pub use crate::page_size::{PageSize, Size4K};
pub use crate::physical_address::PhysicalAddress;
pub use crate::physical_page::PhysicalPage;
pub use crate::virtual_address::VirtualAddress;
pub use crate::virtual_page::VirtualPage;

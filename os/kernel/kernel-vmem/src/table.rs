//! # Translation Tables
//!
//! Typed views of the three table formats:
//!
//! - [`region`]: region-first, region-second and region-third tables. One
//!   generic [`RegionTable<L>`](region::RegionTable) parameterized by a level
//!   marker, so an index for one level cannot be used on another.
//! - [`segment`]: segment tables, whose entries point to page tables.
//! - [`page`]: page tables, whose entries map 4 KiB frames.
//!
//! ## Invalid vs. zero
//!
//! A table entry with every bit clear is a **valid** entry on this
//! architecture: it links to (or maps) address zero. Fresh tables must
//! therefore be filled with their level's empty pattern before they are
//! linked into the hierarchy; each table type offers `clear()` for that.

pub mod page;
pub mod region;
pub mod segment;

/// Raw byte offset of entry `index` in a table of 8-byte entries.
#[inline]
pub(crate) const fn entry_offset(index: usize) -> u64 {
    (index * size_of::<u64>()) as u64
}

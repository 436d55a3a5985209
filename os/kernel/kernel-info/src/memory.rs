//! # Memory Layout

/// Size of the DAT translation unit.
pub const PAGE_SIZE: u64 = 4096;

/// Size of the guard region mapped at the very top of the address space.
pub const GUARD_REGION_SIZE: u64 = 1 << 27; // 128 MiB

/// First address of the guard region, i.e. `-(GUARD_REGION_SIZE)`.
pub const GUARD_REGION_BASE: u64 = 0u64.wrapping_sub(GUARD_REGION_SIZE);

/// Exclusive end of the guard region; zero after wrapping.
pub const GUARD_REGION_END: u64 = 0;

/// Top (exclusive) of the range handed out by the virtual page allocator.
/// Allocation proceeds downward from here.
pub const VPAGE_TOP: u64 = GUARD_REGION_BASE;

const _: () = {
    assert!(GUARD_REGION_SIZE.is_multiple_of(PAGE_SIZE));
    assert!(GUARD_REGION_BASE == 0xffff_ffff_f800_0000);
    assert!(GUARD_REGION_BASE.wrapping_add(GUARD_REGION_SIZE) == GUARD_REGION_END);
};

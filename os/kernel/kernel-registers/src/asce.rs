use bitfield_struct::bitfield;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K};

/// Type of the table an ASCE (or a region-table entry) designates.
///
/// The same two-bit encoding is used for the DT field of the ASCE and the TT
/// field of region- and segment-table entries.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum DesignationType {
    /// Segment table (`0b00`).
    Segment = 0b00,
    /// Region-third table (`0b01`).
    Region3 = 0b01,
    /// Region-second table (`0b10`).
    Region2 = 0b10,
    /// Region-first table (`0b11`); covers the full 64-bit address space.
    Region1 = 0b11,
}

impl DesignationType {
    #[must_use]
    pub const fn into_bits(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn from_bits(value: u8) -> Self {
        match value & 0b11 {
            0b00 => Self::Segment,
            0b01 => Self::Region3,
            0b10 => Self::Region2,
            _ => Self::Region1,
        }
    }
}

/// Address-Space-Control Element (ASCE), as loaded into CR1/CR7/CR13.
///
/// Designates the root translation table of an address space.
///
/// | Bits   | Field | Meaning |
/// |--------|-------|---------|
/// | 12..63 | origin | Table origin (4 KiB aligned) |
/// | 9      | G | Subspace-group control |
/// | 8      | P | Private-space control |
/// | 7      | S | Storage-alteration-event control |
/// | 6      | X | Space-switch-event control |
/// | 5      | R | Real-space control |
/// | 2..3   | DT | Designation type |
/// | 0..1   | TL | Table length, in units of 512 entries, minus one |
///
/// Bit numbers are LSB-first (bit 0 = value `1`), not the big-endian numbering
/// of the Principles of Operation.
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct Asce {
    /// Bits 0–1 — TL: table length (`3` = four 4 KiB blocks, 2048 entries).
    #[bits(2)]
    pub table_length: u8,

    /// Bits 2–3 — DT: designation type of the root table.
    #[bits(2)]
    pub designation_type: DesignationType,

    /// Bit 4 — Reserved.
    #[bits(1)]
    __reserved4: u8,

    /// Bit 5 — R: real-space control; translation is bypassed when set.
    pub real_space: bool,

    /// Bit 6 — X: space-switch-event control.
    pub space_switch_event: bool,

    /// Bit 7 — S: storage-alteration-event control.
    pub storage_alteration_event: bool,

    /// Bit 8 — P: private-space control.
    pub private_space: bool,

    /// Bit 9 — G: subspace-group control.
    pub subspace_group: bool,

    /// Bits 10–11 — Reserved.
    #[bits(2)]
    __reserved10: u8,

    /// Bits 12–63 — table origin >> 12.
    #[bits(52)]
    origin_4k: u64,
}

impl Asce {
    /// Table length of a full region or segment table (2048 entries).
    pub const FULL_TABLE_LENGTH: u8 = 3;

    /// ASCE designating a full-length table of type `dt` at `origin`.
    #[must_use]
    pub const fn designate(origin: PhysicalPage<Size4K>, dt: DesignationType) -> Self {
        Self::new()
            .with_origin_4k(origin.number())
            .with_designation_type(dt)
            .with_table_length(Self::FULL_TABLE_LENGTH)
    }

    /// Physical origin of the designated table.
    #[must_use]
    pub const fn origin(&self) -> PhysicalAddress {
        PhysicalPage::<Size4K>::from_number(self.origin_4k()).base()
    }
}

#[cfg(all(feature = "asm", target_arch = "s390x"))]
impl crate::LoadRegisterUnsafe for Asce {
    /// Read the primary ASCE from CR1.
    unsafe fn load_unsafe() -> Self {
        Self::from_bits(unsafe { crate::cr::store::<{ crate::cr::PRIMARY_ASCE }>() })
    }
}

#[cfg(all(feature = "asm", target_arch = "s390x"))]
impl crate::StoreRegisterUnsafe for Asce {
    /// Load CR1 with this ASCE.
    unsafe fn store_unsafe(self) {
        unsafe { crate::cr::load::<{ crate::cr::PRIMARY_ASCE }>(self.into_bits()) }
    }
}

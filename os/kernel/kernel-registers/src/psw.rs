use bitfield_struct::bitfield;

/// Mask half (first doubleword) of the z/Architecture Program Status Word.
///
/// Bit numbers below are LSB-first; the Principles of Operation numbers the
/// same bits from the most significant end (`PoO` bit `n` is bit `63 - n` here).
///
/// Only the DAT bit matters to the translation bootstrap; the remaining bits
/// are modelled so a read-modify-write of the mask preserves them.
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct PswMask {
    /// Bits 0–30 — Reserved (`PoO` 33–63; part of the instruction address in a
    /// full 128-bit PSW, must be zero in the mask).
    #[bits(31)]
    __reserved0: u32,

    /// Bit 31 — BA: basic addressing mode (`PoO` bit 32).
    pub basic_addressing: bool,

    /// Bit 32 — EA: extended addressing mode (`PoO` bit 31).
    pub extended_addressing: bool,

    /// Bits 33–39 — Reserved (`PoO` 24–30).
    #[bits(7)]
    __reserved33: u8,

    /// Bits 40–43 — program mask (`PoO` 20–23).
    #[bits(4)]
    pub program_mask: u8,

    /// Bits 44–45 — condition code (`PoO` 18–19).
    #[bits(2)]
    pub condition_code: u8,

    /// Bits 46–47 — address-space control (`PoO` 16–17); `0` selects primary space.
    #[bits(2)]
    pub address_space_control: u8,

    /// Bit 48 — P: problem state (`PoO` 15).
    pub problem_state: bool,

    /// Bit 49 — W: wait state (`PoO` 14).
    pub wait_state: bool,

    /// Bit 50 — M: machine-check mask (`PoO` 13).
    pub machine_check: bool,

    /// Bit 51 — Reserved (`PoO` 12, must be zero in z/Architecture mode).
    #[bits(1)]
    __reserved51: u8,

    /// Bits 52–55 — PSW key (`PoO` 8–11).
    #[bits(4)]
    pub key: u8,

    /// Bit 56 — E: external interruption mask (`PoO` 7).
    pub external: bool,

    /// Bit 57 — IO: I/O interruption mask (`PoO` 6).
    pub io: bool,

    /// Bit 58 — T: DAT mode (`PoO` 5). Storage addresses are translated when set.
    pub dat: bool,

    /// Bits 59–61 — Reserved (`PoO` 2–4).
    #[bits(3)]
    __reserved59: u8,

    /// Bit 62 — R: PER mask (`PoO` 1).
    pub per: bool,

    /// Bit 63 — Reserved (`PoO` 0).
    #[bits(1)]
    __reserved63: u8,
}

impl PswMask {
    /// Raw value of the DAT bit.
    pub const DAT: u64 = 1 << 58;
}

/// Full 16-byte PSW image as consumed by `LPSWE`.
#[cfg(all(feature = "asm", target_arch = "s390x"))]
#[repr(C, align(8))]
struct Psw {
    mask: u64,
    addr: u64,
}

#[cfg(all(feature = "asm", target_arch = "s390x"))]
impl crate::LoadRegisterUnsafe for PswMask {
    /// Extract the current PSW mask (`EPSW`).
    unsafe fn load_unsafe() -> Self {
        let hi: u64;
        let lo: u64;
        unsafe {
            core::arch::asm!(
                "epsw {hi},{lo}",
                hi = out(reg_addr) hi,
                lo = out(reg_addr) lo,
                options(nomem, nostack, preserves_flags),
            );
        }
        Self::from_bits(((hi & 0xFFFF_FFFF) << 32) | (lo & 0xFFFF_FFFF))
    }
}

#[cfg(all(feature = "asm", target_arch = "s390x"))]
impl crate::StoreRegisterUnsafe for PswMask {
    /// Replace the PSW mask, continuing at the next instruction (`LPSWE`).
    unsafe fn store_unsafe(self) {
        let mut psw = Psw {
            mask: self.into_bits(),
            addr: 0,
        };
        unsafe {
            core::arch::asm!(
                "larl {tmp},2f",
                "stg {tmp},8({psw})",
                "lpswe 0({psw})",
                "2:",
                tmp = out(reg_addr) _,
                psw = in(reg_addr) &raw mut psw,
                options(nostack),
            );
        }
    }
}

//! # DAT Activation
//!
//! Switching translation on is two steps: load the primary ASCE into CR1,
//! then set the DAT bit in the PSW. The ASCE is read back in between; a
//! mismatch means the control register did not take the value and turning
//! DAT on would translate through something else.

use kernel_registers::asce::Asce;
use log::info;

use crate::address_space::AddressSpace;
use crate::{Cpu, PhysMapper};

/// Failure to activate an address space.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum ActivationError {
    /// CR1 did not read back the ASCE that was loaded. DAT stays off.
    #[error("primary ASCE readback mismatch: loaded {written:#018x}, read {read:#018x}")]
    AsceMismatch { written: u64, read: u64 },
}

/// Load `aspace` as the primary address space and enable DAT.
///
/// Returns the ASCE that is now active.
///
/// # Errors
/// [`ActivationError::AsceMismatch`] if CR1 reads back a different value;
/// the PSW is not touched in that case.
///
/// # Safety
/// `aspace` must map the currently executing code, its stack and every
/// other location touched after the switch to their current real addresses.
pub unsafe fn enable<C: Cpu + ?Sized, M: PhysMapper>(
    cpu: &mut C,
    aspace: &AddressSpace<'_, M>,
) -> Result<Asce, ActivationError> {
    let asce = aspace.asce();
    info!(
        "loading primary ASCE {:#018x} (region-first table at {})",
        asce.into_bits(),
        asce.origin()
    );
    unsafe { cpu.set_primary_asce(asce) };

    let read = cpu.primary_asce();
    if read != asce {
        return Err(ActivationError::AsceMismatch {
            written: asce.into_bits(),
            read: read.into_bits(),
        });
    }

    unsafe { configure_dat(cpu, true) };
    info!("DAT enabled");
    Ok(asce)
}

/// Set or clear the DAT bit, leaving the rest of the PSW mask unchanged.
///
/// # Safety
/// When enabling, the primary ASCE must designate an address space that maps
/// the executing code and stack. When disabling, they must be reachable at
/// their real addresses.
pub unsafe fn configure_dat<C: Cpu + ?Sized>(cpu: &mut C, enable: bool) {
    let mask = cpu.psw_mask().with_dat(enable);
    unsafe { cpu.set_psw_mask(mask) };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CountingAlloc, RecordingCpu, TestPhys};
    use kernel_registers::psw::PswMask;

    #[test]
    fn enable_loads_asce_then_sets_only_the_dat_bit() {
        let phys = TestPhys::new(1 << 20);
        let mut alloc = CountingAlloc::new(&phys, 0x4000, 1 << 20);
        let aspace = AddressSpace::new(&phys, &mut alloc).expect("root");
        let mut cpu = RecordingCpu::new(&phys);
        let before = cpu.psw;

        let asce = unsafe { enable(&mut cpu, &aspace) }.expect("enable");
        assert_eq!(asce.into_bits(), 0x4000 | 0x0c | 0x03);
        assert_eq!(cpu.asce_loads, [asce]);
        assert_eq!(cpu.psw.into_bits() ^ before.into_bits(), PswMask::DAT);
    }

    #[test]
    fn readback_mismatch_leaves_dat_off() {
        let phys = TestPhys::new(1 << 20);
        let mut alloc = CountingAlloc::new(&phys, 0, 1 << 20);
        let aspace = AddressSpace::new(&phys, &mut alloc).expect("root");
        let mut cpu = RecordingCpu::new(&phys);
        cpu.asce_readback_xor = 0x4000;

        let err = unsafe { enable(&mut cpu, &aspace) }.unwrap_err();
        assert_eq!(
            err,
            ActivationError::AsceMismatch {
                written: 0x0f,
                read: 0x400f,
            }
        );
        assert!(!cpu.psw.dat());
        assert_eq!(
            err.to_string(),
            "primary ASCE readback mismatch: loaded 0x000000000000000f, read 0x000000000000400f"
        );
    }

    #[test]
    fn configure_dat_toggles() {
        let phys = TestPhys::new(1 << 16);
        let mut cpu = RecordingCpu::new(&phys);
        let before = cpu.psw;

        unsafe { configure_dat(&mut cpu, true) };
        assert!(cpu.psw.dat());
        unsafe { configure_dat(&mut cpu, false) };
        assert_eq!(cpu.psw, before);
    }
}

mod common;

use common::{HostRam, Ipte, RAM, SimCpu, TestVmm, allocator};
use kernel_alloc::frame_alloc::BumpPageAlloc;
use kernel_alloc::vmm::{Vmm, VmmError};
use kernel_info::memory::{GUARD_REGION_BASE, VPAGE_TOP};
use kernel_vmem::{
    ActivationError, PageAlloc, PageTableEntry, PhysicalAddress, PswMask, TableAllocError,
    TableLevel, VirtualAddress,
};

const PHYS_END: u64 = 0x0800_0000;

fn pa(v: u64) -> PhysicalAddress {
    PhysicalAddress::new(v)
}

fn va(v: u64) -> VirtualAddress {
    VirtualAddress::new(v)
}

fn page_table_oom() -> VmmError {
    TableAllocError::OutOfMemory(TableLevel::Page).into()
}

fn boot<'r, 'c>(ram: &'r HostRam, cpu: &'c mut SimCpu<'r>) -> TestVmm<'r, 'c> {
    unsafe { Vmm::setup(ram, allocator(ram), cpu, pa(PHYS_END)) }
}

#[test]
fn installed_memory_is_identity_mapped() {
    let ram = HostRam::new(RAM);
    let mut cpu = SimCpu::new(&ram);
    let mut vmm = boot(&ram, &mut cpu);

    assert_eq!(vmm.virt_to_pte_phys(va(0x1000)), pa(0x1000));
    assert_eq!(vmm.virt_to_pte_phys(va(0x07FF_F000)), pa(0x07FF_F000));
    assert_eq!(vmm.virt_to_pte_phys(va(0x0123_4567)), pa(0x0123_4567));

    let allocated = vmm.allocator().allocations();
    for page in (0..PHYS_END).step_by(0x1000) {
        assert_eq!(vmm.virt_to_pte_phys(va(page)), pa(page));
    }
    assert_eq!(vmm.allocator().allocations(), allocated);

    assert_eq!(vmm.query(va(0)), Some(pa(0)));
    assert_eq!(vmm.query(va(PHYS_END)), None);
}

#[test]
fn guard_region_is_identity_mapped_at_the_top() {
    let ram = HostRam::new(RAM);
    let mut cpu = SimCpu::new(&ram);
    let vmm = boot(&ram, &mut cpu);

    assert_eq!(GUARD_REGION_BASE, 0xFFFF_FFFF_F800_0000);
    assert_eq!(
        vmm.query(va(GUARD_REGION_BASE)),
        Some(pa(GUARD_REGION_BASE))
    );
    assert_eq!(
        vmm.query(va(0xFFFF_FFFF_FFFF_FFF8)),
        Some(pa(0xFFFF_FFFF_FFFF_FFF8))
    );
    assert_eq!(vmm.query(va(GUARD_REGION_BASE - 0x1000)), None);
}

#[test]
fn activation_loads_root_and_sets_only_dat() {
    let ram = HostRam::new(RAM);
    let mut cpu = SimCpu::new(&ram);
    let asce = {
        let vmm = boot(&ram, &mut cpu);
        let asce = vmm.asce();
        assert_eq!(asce, vmm.address_space().asce());
        asce
    };

    // Root is the first block of the allocation window.
    assert_eq!(asce.into_bits(), 0x0010_0000 | 0x0c | 0x03);
    assert_eq!(cpu.cr1, asce);
    assert_eq!(cpu.psw.into_bits(), SimCpu::INITIAL_PSW | PswMask::DAT);
    // Fresh tables only; nothing was replaced during the bootstrap.
    assert!(cpu.iptes.is_empty());
}

#[test]
fn replacing_a_mapping_issues_one_ipte_first() {
    let ram = HostRam::new(RAM);
    let mut cpu = SimCpu::new(&ram);
    let mut vmm = boot(&ram, &mut cpu);
    let allocated = vmm.allocator().allocations();

    let pte = vmm.install_page(pa(0x9000), va(0x1000));
    assert_eq!(vmm.virt_to_pte_phys(va(0x1000)), pa(0x9000));
    assert_eq!(
        vmm.address_space().pte(pte),
        PageTableEntry::from_bits(0x9000)
    );
    assert_eq!(vmm.allocator().allocations(), allocated);

    assert_eq!(
        vmm.cpu().iptes,
        [Ipte {
            va: va(0x1000),
            table: pte.table(),
            entry: PageTableEntry::from_bits(0x1000),
        }]
    );
}

#[test]
fn repeated_install_keeps_mapping_without_allocating() {
    let ram = HostRam::new(RAM);
    let mut cpu = SimCpu::new(&ram);
    let mut vmm = boot(&ram, &mut cpu);

    let target = va(0x0000_4000_0000_0000);
    let first = vmm.install_page(pa(0x0020_0000), target);
    let allocated = vmm.allocator().allocations();
    let second = vmm.install_page(pa(0x0020_0000), target);

    assert_eq!(first, second);
    assert_eq!(vmm.allocator().allocations(), allocated);
    assert_eq!(vmm.query(target), Some(pa(0x0020_0000)));
}

#[test]
fn virtual_pages_grow_down_from_the_guard_region() {
    let ram = HostRam::new(RAM);
    let mut cpu = SimCpu::new(&ram);
    let mut vmm = boot(&ram, &mut cpu);

    assert_eq!(vmm.vpage_top(), va(VPAGE_TOP));
    let a = vmm.alloc_vpages(2).expect("vpages");
    let b = vmm.alloc_vpages(1).expect("vpages");
    assert_eq!(a, va(GUARD_REGION_BASE - 0x2000));
    assert_eq!(b, va(GUARD_REGION_BASE - 0x3000));
    assert_eq!(vmm.query(a), None);

    assert_eq!(
        vmm.alloc_vpages(u64::MAX),
        Err(VmmError::VirtualSpaceExhausted(u64::MAX))
    );
    // Never into identity-mapped memory.
    let remaining = (GUARD_REGION_BASE - 0x3000 - PHYS_END) / 0x1000;
    assert_eq!(
        vmm.alloc_vpages(remaining + 1),
        Err(VmmError::VirtualSpaceExhausted(remaining + 1))
    );
    assert_eq!(vmm.alloc_vpages(remaining), Ok(va(PHYS_END)));
}

#[test]
fn fresh_pages_are_backed_and_zeroed() {
    let ram = HostRam::new(RAM);
    let mut cpu = SimCpu::new(&ram);
    let mut vmm = boot(&ram, &mut cpu);

    let base = vmm.map_fresh_pages(3).expect("fresh pages");
    assert_eq!(base, va(GUARD_REGION_BASE - 0x3000));

    let frames: Vec<PhysicalAddress> = (0..3)
        .map(|i| vmm.query(base.wrapping_add(i * 0x1000)).expect("mapped"))
        .collect();
    for (i, frame) in frames.iter().enumerate() {
        assert!(frame.is_aligned::<kernel_memory_addresses::Size4K>());
        assert!(frame.as_u64() >= 0x0010_0000 && frame.as_u64() < RAM as u64);
        assert!((0..512).all(|w| ram.read_u64(frame.wrapping_add(w * 8)) == 0));
        if i > 0 {
            assert_ne!(frames[i - 1], *frame);
        }
    }
}

#[test]
fn fresh_pages_report_exhaustion() {
    let ram = HostRam::new(RAM);
    let mut cpu = SimCpu::new(&ram);
    let mut vmm = boot(&ram, &mut cpu);

    // Leave exactly one page: enough for the frame, not for its page table.
    while vmm.allocator().remaining() > 0x1000 {
        vmm.allocator_mut().alloc_zeroed(0).expect("drain");
    }
    assert_eq!(vmm.map_fresh_pages(1), Err(page_table_oom()));
    assert_eq!(vmm.vpage_top(), va(VPAGE_TOP));

    assert_eq!(vmm.allocator().remaining(), 0);
    assert_eq!(vmm.map_fresh_pages(4), Err(VmmError::OutOfPages));
    assert_eq!(vmm.vpage_top(), va(VPAGE_TOP));
}

#[test]
fn fresh_pages_keep_a_partially_backed_reservation() {
    let ram = HostRam::new(RAM);
    let mut cpu = SimCpu::new(&ram);
    let mut vmm = boot(&ram, &mut cpu);

    // The first page also needs a page table; the second one finds no frame.
    while vmm.allocator().remaining() > 0x2000 {
        vmm.allocator_mut().alloc_zeroed(0).expect("drain");
    }
    assert_eq!(vmm.map_fresh_pages(2), Err(VmmError::OutOfPages));

    let base = va(GUARD_REGION_BASE - 0x2000);
    assert_eq!(vmm.vpage_top(), base);
    assert!(vmm.query(base).is_some());
    assert_eq!(vmm.query(base.wrapping_add(0x1000)), None);
}

#[test]
fn setup_errors_are_typed() {
    let ram = HostRam::new(RAM);

    let mut cpu = SimCpu::new(&ram);
    let tiny = BumpPageAlloc::new(&ram, pa(0x0010_0000), pa(0x0011_0000));
    let err = unsafe { Vmm::try_setup(&ram, tiny, &mut cpu, pa(PHYS_END)) }.err();
    assert_eq!(err, Some(page_table_oom()));
    assert!(!cpu.psw.dat());

    let mut cpu = SimCpu::new(&ram);
    cpu.cr1_readback_xor = 0x1000;
    let err = unsafe { Vmm::try_setup(&ram, allocator(&ram), &mut cpu, pa(0x0040_0000)) }.err();
    assert!(matches!(
        err,
        Some(VmmError::Activation(ActivationError::AsceMismatch { written, read }))
            if read == written ^ 0x1000
    ));
    assert!(!cpu.psw.dat());
}

#[test]
#[should_panic(expected = "out of memory allocating a page table")]
fn setup_panics_when_tables_run_out() {
    let ram = HostRam::new(RAM);
    let mut cpu = SimCpu::new(&ram);
    let tiny = BumpPageAlloc::new(&ram, pa(0x0010_0000), pa(0x0011_0000));
    let _ = unsafe { Vmm::setup(&ram, tiny, &mut cpu, pa(PHYS_END)) };
}

#[test]
#[should_panic(expected = "primary ASCE readback mismatch")]
fn setup_panics_on_asce_mismatch() {
    let ram = HostRam::new(RAM);
    let mut cpu = SimCpu::new(&ram);
    cpu.cr1_readback_xor = 0x0c;
    let _ = unsafe { Vmm::setup(&ram, allocator(&ram), &mut cpu, pa(0x0040_0000)) };
}

use approx::assert_abs_diff_eq;
use rstest::rstest;

use dslab_datacenter::core::common::AllocationVerdict;
use dslab_datacenter::core::host::Host;
use dslab_datacenter::core::vm::VirtualMachine;
use dslab_datacenter::error::DatacenterError;
use dslab_energy::cpu::utilization_aware::UtilizationAwarePowerModel;
use dslab_energy::dvfs::DvfsLevel;

fn host() -> Host {
    Host::new(0, 2, 5000., 16000, 1000, 80., 200., 500.)
}

fn loaded_vm(id: u32, cpu: f64, ratio: f64) -> VirtualMachine {
    let mut vm = VirtualMachine::online_service(id, cpu, 100, 10);
    vm.set_cpu_demand_ratio(ratio, 0.);
    vm
}

#[test]
// Demand of resident VMs exceeds the host capacity, utilization is clamped.
fn test_utilization_clamped() {
    let mut host = host();
    host.allocate(loaded_vm(0, 10000., 1.)).unwrap();
    host.allocate(loaded_vm(1, 10000., 1.)).unwrap();
    assert_eq!(host.cpu_demand(), 20000.);
    assert_eq!(host.cpu_utilization(), 1.);
    assert_eq!(host.base_cpu_utilization(), 1.);
    assert_eq!(Host::new(1, 0, 0., 0, 0, 0., 0., 0.).cpu_utilization(), 0.);
}

#[rstest]
#[case(0, 1.0)]
#[case(1, 0.8)]
#[case(2, 0.6)]
fn test_apply_dvfs_level(#[case] level: u32, #[case] scaling: f64) {
    let mut host = host();
    host.apply_dvfs_level(level).unwrap();
    assert_eq!(host.current_dvfs_level(), level);
    assert_eq!(host.core_capacity(), host.base_core_capacity() * scaling);
    assert_eq!(host.base_core_capacity(), 5000.);
}

#[test]
fn test_apply_invalid_dvfs_level() {
    let mut host = host();
    host.apply_dvfs_level(1).unwrap();
    let result = host.apply_dvfs_level(7);
    assert!(matches!(
        result,
        Err(DatacenterError::InvalidDvfsLevel { host_id: 0, level: 7 })
    ));
    assert_eq!(host.current_dvfs_level(), 1);
    assert_abs_diff_eq!(host.core_capacity(), 4000., epsilon = 1e-9);
    assert_abs_diff_eq!(host.power_idle(), 69.6, epsilon = 1e-9);
    assert_abs_diff_eq!(host.power_max(), 166., epsilon = 1e-9);
}

#[test]
fn test_set_dvfs_levels() {
    let mut host = host();
    host.apply_dvfs_level(2).unwrap();
    host.set_dvfs_levels(vec![DvfsLevel::new(0, 1., 50., 100.), DvfsLevel::new(1, 0.5, 30., 60.)])
        .unwrap();
    assert_eq!(host.current_dvfs_level(), 0);
    assert_eq!(host.core_capacity(), 5000.);
    assert_eq!(host.power_idle(), 50.);

    // table without level 0 is rejected
    assert!(host.set_dvfs_levels(vec![DvfsLevel::new(3, 0.5, 30., 60.)]).is_err());
    assert_eq!(host.dvfs_levels().len(), 2);
}

#[rstest]
#[case(0.5, 2, 118.333333333)]
#[case(0.7, 1, 153.95)]
#[case(0.9, 0, 188.)]
// Host of 2 x 5000 MIPS with a single 10000 MIPS VM, base utilization equals the demand ratio.
fn test_dvfs_auto_update(#[case] ratio: f64, #[case] level: u32, #[case] power: f64) {
    let mut host = host();
    host.enable_dvfs(true);
    host.allocate(loaded_vm(0, 10000., ratio)).unwrap();
    assert_abs_diff_eq!(host.power_draw(), power, epsilon = 1e-6);
    assert_eq!(host.current_dvfs_level(), level);
    // re-evaluation without load change keeps the level
    host.power_draw();
    assert_eq!(host.current_dvfs_level(), level);
}

#[test]
fn test_custom_governor() {
    let mut host = host();
    host.enable_dvfs(true);
    host.set_dvfs_governor(Box::new(|_u: f64| -> u32 { 1 }));
    host.power_draw();
    assert_eq!(host.current_dvfs_level(), 1);

    // undefined level keeps the current one
    host.set_dvfs_governor(Box::new(|_u: f64| -> u32 { 5 }));
    assert!(matches!(
        host.update_dvfs(),
        Err(DatacenterError::InvalidDvfsLevel { host_id: 0, level: 5 })
    ));
    assert_abs_diff_eq!(host.power_draw(), 80. * 0.87, epsilon = 1e-9);
    assert_eq!(host.current_dvfs_level(), 1);
}

#[test]
fn test_power_model() {
    let mut host = host();
    host.allocate(loaded_vm(0, 10000., 0.5)).unwrap();
    assert_abs_diff_eq!(host.power_draw(), 140., epsilon = 1e-9);

    host.set_power_model(Box::new(UtilizationAwarePowerModel::new()));
    let expected = 80. + 120. * (2. * 0.5 - 0.5f64.powf(1.4));
    assert_abs_diff_eq!(host.power_draw(), expected, epsilon = 1e-9);

    host.set_power_model(Box::new(|u: f64| 1000. * u));
    assert_abs_diff_eq!(host.power_draw(), 500., epsilon = 1e-9);
}

#[test]
fn test_powered_off_host_power() {
    let mut host = host();
    host.power_off();
    assert_eq!(host.power_draw(), 0.);

    // residual demand of VMs left on a powered off host is still charged
    host.power_on();
    host.allocate(loaded_vm(0, 5000., 1.)).unwrap();
    host.power_off();
    assert_abs_diff_eq!(host.power_draw(), 140., epsilon = 1e-9);
}

#[test]
fn test_power_off_idempotent() {
    let mut host = host();
    host.power_off();
    host.power_off();
    assert!(!host.is_active());
    host.power_on();
    host.power_on();
    assert!(host.is_active());
}

#[test]
fn test_allocate_deallocate() {
    let mut host = host();
    host.allocate(VirtualMachine::new(1, 1000., 100, 10)).unwrap();
    assert_eq!(host.vm(1).unwrap().current_host(), Some(0));

    assert!(host.deallocate(42).is_none());
    assert_eq!(host.vm_count(), 1);

    let vm = host.deallocate(1).unwrap();
    assert_eq!(vm.current_host(), None);
    assert!(host.deallocate(1).is_none());
    assert!(host.is_empty());

    // powered off host gives the VM back
    host.power_off();
    let rejected = host.allocate(vm).unwrap_err();
    assert_eq!(rejected.id, 1);
    assert!(host.is_empty());
}

#[test]
fn test_capacity_check() {
    let mut host = Host::new(0, 2, 1000., 1000, 100, 80., 200., 500.);
    host.allocate(VirtualMachine::new(0, 1500., 500, 50)).unwrap();

    assert_eq!(
        host.check_capacity(&VirtualMachine::new(1, 500., 500, 50)),
        AllocationVerdict::Success
    );
    assert_eq!(
        host.check_capacity(&VirtualMachine::new(1, 600., 100, 10)),
        AllocationVerdict::NotEnoughCPU
    );
    assert_eq!(
        host.check_capacity(&VirtualMachine::new(1, 100., 600, 10)),
        AllocationVerdict::NotEnoughMemory
    );
    assert_eq!(
        host.check_capacity(&VirtualMachine::new(1, 100., 100, 60)),
        AllocationVerdict::NotEnoughStorage
    );

    host.set_oversubscription(1.5, 1., 1.);
    assert!(host.can_host(&VirtualMachine::new(1, 1500., 100, 10)));
    assert_eq!(host.remaining_cpu(), 500.);
    assert_eq!(host.free_ram(), 500);
}

#[test]
// Capacity checks and remaining CPU ignore the DVFS scaling.
fn test_capacity_is_dvfs_independent() {
    let mut host = host();
    host.apply_dvfs_level(2).unwrap();
    assert!(host.can_host(&VirtualMachine::new(0, 10000., 100, 10)));
    assert_eq!(host.remaining_cpu(), 10000.);
}

#[test]
fn test_projected_power_is_pure() {
    let mut host = host();
    host.enable_dvfs(true);
    host.allocate(loaded_vm(0, 10000., 0.5)).unwrap();
    let power = host.power_draw();
    assert_eq!(host.current_dvfs_level(), 2);

    assert_abs_diff_eq!(host.projected_power(0.), power, epsilon = 1e-9);
    // extra 4000 MIPS moves the host to level 0 in projection only
    assert_abs_diff_eq!(host.projected_power(4000.), 80. + 120. * 0.9, epsilon = 1e-9);
    assert_eq!(host.current_dvfs_level(), 2);
    assert_abs_diff_eq!(host.core_capacity(), 3000., epsilon = 1e-9);
    assert_eq!(host.cpu_demand(), 5000.);
}

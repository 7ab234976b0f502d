use dslab_datacenter::core::host::Host;
use dslab_datacenter::core::logger::{shared_logger, FileLogger, SharedLogger};
use dslab_datacenter::core::vm::VirtualMachine;
use dslab_datacenter::error::DatacenterError;
use dslab_datacenter::extensions::vm_migrator::{
    migration_strategy_resolver, ConsolidationMigrator, IdleShutdown, Migration, MigrationOutcome,
    VmMigrationStrategy,
};

fn host(id: u32) -> Host {
    Host::new(id, 2, 1000., 16000, 1000, 80., 200., 500.)
}

fn loaded_vm(id: u32, cpu: f64, ratio: f64) -> VirtualMachine {
    let mut vm = VirtualMachine::online_service(id, cpu, 100, 10);
    vm.set_cpu_demand_ratio(ratio, 0.);
    vm
}

fn logger() -> SharedLogger {
    shared_logger(FileLogger::new())
}

fn vm_ids(host: &Host) -> Vec<u32> {
    host.vms().iter().map(|vm| vm.id).collect()
}

#[test]
// Host 0 is underutilized with three VMs. The first two fit into host 1 under the 0.8 ceiling,
// the third one does not, so none of them moves.
fn test_all_or_nothing() {
    let mut hosts = vec![host(0), host(1)];
    hosts[0].allocate(loaded_vm(0, 100., 0.1)).unwrap();
    hosts[0].allocate(loaded_vm(1, 100., 0.1)).unwrap();
    hosts[0].allocate(loaded_vm(2, 500., 0.1)).unwrap();
    hosts[1].allocate(loaded_vm(3, 2000., 0.5)).unwrap();

    let outcome = ConsolidationMigrator::default().perform_migrations(&mut hosts, 0., &logger());

    assert_eq!(outcome, MigrationOutcome::default());
    assert_eq!(vm_ids(&hosts[0]), vec![0, 1, 2]);
    assert_eq!(vm_ids(&hosts[1]), vec![3]);
    assert!(hosts[0].is_active());
    assert!(hosts[1].is_active());
}

#[test]
fn test_consolidation() {
    let mut hosts = vec![host(0), host(1), host(2)];
    hosts[0].allocate(loaded_vm(0, 100., 0.1)).unwrap();
    hosts[0].allocate(loaded_vm(1, 100., 0.1)).unwrap();
    hosts[1].allocate(loaded_vm(2, 2000., 0.5)).unwrap();
    hosts[2].allocate(loaded_vm(3, 2000., 0.3)).unwrap();

    let outcome = ConsolidationMigrator::default().perform_migrations(&mut hosts, 0., &logger());

    // host 2 is the least utilized among not underutilized hosts, so it is tried first
    assert_eq!(
        outcome.migrations,
        vec![
            Migration {
                vm_id: 0,
                source_host: 0,
                target_host: 2
            },
            Migration {
                vm_id: 1,
                source_host: 0,
                target_host: 2
            },
        ]
    );
    assert_eq!(outcome.powered_off, vec![0]);
    assert!(hosts[0].is_empty());
    assert!(!hosts[0].is_active());
    assert_eq!(vm_ids(&hosts[2]), vec![3, 0, 1]);
    assert_eq!(hosts[2].vm(0).unwrap().current_host(), Some(2));
}

#[test]
// Underutilized hosts may receive VMs from other underutilized hosts, the most idle host is drained first.
fn test_consolidation_between_underutilized_hosts() {
    let mut hosts = vec![host(0), host(1)];
    hosts[0].allocate(loaded_vm(0, 200., 1.)).unwrap();
    hosts[1].allocate(loaded_vm(1, 100., 1.)).unwrap();

    let outcome = ConsolidationMigrator::default().perform_migrations(&mut hosts, 0., &logger());

    assert_eq!(outcome.powered_off, vec![1]);
    assert_eq!(vm_ids(&hosts[0]), vec![0, 1]);
    assert!(hosts[0].is_active());
}

#[test]
fn test_inactive_hosts_are_not_targets() {
    let mut hosts = vec![host(0), host(1)];
    hosts[0].allocate(loaded_vm(0, 100., 0.1)).unwrap();
    hosts[1].power_off();

    let outcome = ConsolidationMigrator::default().perform_migrations(&mut hosts, 0., &logger());

    assert!(outcome.migrations.is_empty());
    assert_eq!(vm_ids(&hosts[0]), vec![0]);
    assert!(hosts[0].is_active());
}

#[test]
fn test_idle_shutdown() {
    let mut hosts = vec![host(0), host(1), host(2)];
    hosts[1].allocate(loaded_vm(0, 100., 0.1)).unwrap();
    hosts[2].power_off();

    let outcome = IdleShutdown::new().perform_migrations(&mut hosts, 0., &logger());

    assert!(outcome.migrations.is_empty());
    assert_eq!(outcome.powered_off, vec![0]);
    assert!(!hosts[0].is_active());
    assert!(hosts[1].is_active());
}

#[test]
fn test_strategy_resolver() {
    let mut hosts = vec![host(0), host(1)];
    hosts[0].allocate(loaded_vm(0, 100., 0.1)).unwrap();
    hosts[1].allocate(loaded_vm(1, 2000., 0.5)).unwrap();

    // with a lower underload threshold host 0 is not drained
    let mut strategy = migration_strategy_resolver("Consolidation[underload=0.001]").unwrap();
    let outcome = strategy.perform_migrations(&mut hosts, 0., &logger());
    assert!(outcome.migrations.is_empty());

    let mut strategy = migration_strategy_resolver("disable").unwrap();
    let outcome = strategy.perform_migrations(&mut hosts, 0., &logger());
    assert!(outcome.powered_off.is_empty());

    let mut strategy = migration_strategy_resolver("default").unwrap();
    let outcome = strategy.perform_migrations(&mut hosts, 0., &logger());
    assert_eq!(outcome.powered_off, vec![0]);

    assert!(matches!(
        migration_strategy_resolver("Shuffle"),
        Err(DatacenterError::UnknownMigrationStrategy(_))
    ));
}

#[test]
fn test_custom_strategy() {
    let mut hosts = vec![host(0), host(1)];
    let mut strategy: Box<dyn VmMigrationStrategy> = Box::new(|hosts: &mut [Host], _time: f64| {
        hosts[1].power_off();
        MigrationOutcome {
            migrations: Vec::new(),
            powered_off: vec![hosts[1].id],
        }
    });
    let outcome = strategy.perform_migrations(&mut hosts, 0., &logger());
    assert_eq!(outcome.powered_off, vec![1]);
    assert!(!hosts[1].is_active());
}

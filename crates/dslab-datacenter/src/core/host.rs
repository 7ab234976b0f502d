//! Physical host model.

use dslab_energy::cpu::linear::LinearPowerModel;
use dslab_energy::dvfs::{default_dvfs_levels, find_level, DvfsGovernor, DvfsLevel, ThresholdGovernor};
use dslab_energy::power_model::PowerModel;

use crate::core::common::AllocationVerdict;
use crate::core::config::sim_config::HostConfig;
use crate::core::energy_meter::EnergyMeter;
use crate::core::vm::VirtualMachine;
use crate::error::{DatacenterError, Result};

/// Physical host with a capacity envelope, a power curve and DVFS state.
///
/// Host owns the VMs currently resident on it. Capacity checks are performed against the unscaled
/// (base) capacity multiplied by the oversubscription ratio of each resource, while the effective
/// CPU capacity used for utilization is scaled by the current DVFS level.
#[derive(Clone)]
pub struct Host {
    pub id: u32,
    pub name: String,

    num_cores: u32,
    core_capacity: f64,
    base_core_capacity: f64,
    ram: u64,
    storage: u64,

    cpu_oversubscription: f64,
    ram_oversubscription: f64,
    storage_oversubscription: f64,

    active: bool,
    power_idle: f64,
    power_max: f64,
    boot_energy: f64,

    dvfs_enabled: bool,
    dvfs_levels: Vec<DvfsLevel>,
    current_dvfs_level: u32,
    dvfs_governor: Box<dyn DvfsGovernor>,
    power_model: Box<dyn PowerModel>,

    vms: Vec<VirtualMachine>,
    pub energy_meter: EnergyMeter,
}

impl Host {
    /// Creates active host without oversubscription, with the linear power model and the default DVFS table.
    pub fn new(
        id: u32,
        num_cores: u32,
        core_capacity: f64,
        ram: u64,
        storage: u64,
        power_idle: f64,
        power_max: f64,
        boot_energy: f64,
    ) -> Self {
        Self {
            id,
            name: format!("host{}", id),
            num_cores,
            core_capacity,
            base_core_capacity: core_capacity,
            ram,
            storage,
            cpu_oversubscription: 1.,
            ram_oversubscription: 1.,
            storage_oversubscription: 1.,
            active: true,
            power_idle,
            power_max,
            boot_energy,
            dvfs_enabled: false,
            dvfs_levels: default_dvfs_levels(power_idle, power_max),
            current_dvfs_level: 0,
            dvfs_governor: Box::new(ThresholdGovernor::default()),
            power_model: Box::new(LinearPowerModel::new()),
            vms: Vec::new(),
            energy_meter: EnergyMeter::new(),
        }
    }

    pub fn from_config(id: u32, name: String, config: &HostConfig) -> Self {
        let mut host = Self::new(
            id,
            config.cores,
            config.core_capacity,
            config.ram,
            config.storage,
            config.power_idle,
            config.power_max,
            config.boot_energy,
        );
        host.name = name;
        host.set_oversubscription(
            config.cpu_oversubscription,
            config.ram_oversubscription,
            config.storage_oversubscription,
        );
        host.active = config.active;
        host
    }

    pub fn set_oversubscription(&mut self, cpu: f64, ram: f64, storage: f64) {
        self.cpu_oversubscription = cpu;
        self.ram_oversubscription = ram;
        self.storage_oversubscription = storage;
    }

    pub fn num_cores(&self) -> u32 {
        self.num_cores
    }

    /// Current (DVFS-scaled) capacity of a single core in MIPS.
    pub fn core_capacity(&self) -> f64 {
        self.core_capacity
    }

    pub fn base_core_capacity(&self) -> f64 {
        self.base_core_capacity
    }

    pub fn cpu_capacity(&self) -> f64 {
        self.num_cores as f64 * self.core_capacity
    }

    pub fn base_cpu_capacity(&self) -> f64 {
        self.num_cores as f64 * self.base_core_capacity
    }

    pub fn ram(&self) -> u64 {
        self.ram
    }

    pub fn storage(&self) -> u64 {
        self.storage
    }

    pub fn power_idle(&self) -> f64 {
        self.power_idle
    }

    pub fn power_max(&self) -> f64 {
        self.power_max
    }

    pub fn boot_energy(&self) -> f64 {
        self.boot_energy
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn power_on(&mut self) {
        self.active = true;
    }

    pub fn power_off(&mut self) {
        self.active = false;
    }

    ////////////////////////////////////////////////////////////////////////////////////////////////
    // Resident VMs
    ////////////////////////////////////////////////////////////////////////////////////////////////

    pub fn vms(&self) -> &[VirtualMachine] {
        &self.vms
    }

    pub fn vms_mut(&mut self) -> &mut [VirtualMachine] {
        &mut self.vms
    }

    pub fn vm(&self, vm_id: u32) -> Option<&VirtualMachine> {
        self.vms.iter().find(|vm| vm.id == vm_id)
    }

    pub fn vm_mut(&mut self, vm_id: u32) -> Option<&mut VirtualMachine> {
        self.vms.iter_mut().find(|vm| vm.id == vm_id)
    }

    pub fn vm_count(&self) -> usize {
        self.vms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vms.is_empty()
    }

    fn cpu_committed(&self) -> f64 {
        self.vms.iter().map(|vm| vm.cpu).sum()
    }

    fn ram_committed(&self) -> u64 {
        self.vms.iter().map(|vm| vm.ram).sum()
    }

    fn storage_committed(&self) -> u64 {
        self.vms.iter().map(|vm| vm.storage).sum()
    }

    /// Checks whether the VM fits into the host with respect to oversubscription ratios.
    pub fn check_capacity(&self, vm: &VirtualMachine) -> AllocationVerdict {
        if self.cpu_committed() + vm.cpu > self.base_cpu_capacity() * self.cpu_oversubscription {
            return AllocationVerdict::NotEnoughCPU;
        }
        if (self.ram_committed() + vm.ram) as f64 > self.ram as f64 * self.ram_oversubscription {
            return AllocationVerdict::NotEnoughMemory;
        }
        if (self.storage_committed() + vm.storage) as f64 > self.storage as f64 * self.storage_oversubscription {
            return AllocationVerdict::NotEnoughStorage;
        }
        AllocationVerdict::Success
    }

    pub fn can_host(&self, vm: &VirtualMachine) -> bool {
        self.check_capacity(vm) == AllocationVerdict::Success
    }

    /// Adds VM to the resident set. A powered off host rejects the VM and gives it back.
    pub fn allocate(&mut self, mut vm: VirtualMachine) -> std::result::Result<(), VirtualMachine> {
        if !self.active {
            return Err(vm);
        }
        vm.set_current_host(Some(self.id));
        self.vms.push(vm);
        Ok(())
    }

    /// Removes VM from the resident set, returns `None` if the VM is not here.
    pub fn deallocate(&mut self, vm_id: u32) -> Option<VirtualMachine> {
        let pos = self.vms.iter().position(|vm| vm.id == vm_id)?;
        let mut vm = self.vms.remove(pos);
        vm.set_current_host(None);
        Some(vm)
    }

    /// Executes cloudlets of resident VMs for `time_step` seconds.
    ///
    /// Returns `(vm_id, cloudlet_id)` pairs of cloudlets finished during this step.
    pub fn execute_cloudlets(&mut self, time: f64, time_step: f64) -> Vec<(u32, u32)> {
        let mut finished = Vec::new();
        for vm in self.vms.iter_mut() {
            for cloudlet_id in vm.update_cloudlets(time, time_step) {
                finished.push((vm.id, cloudlet_id));
            }
        }
        finished
    }

    /// Removes and returns VMs with all cloudlets finished.
    pub fn release_completed(&mut self) -> Vec<VirtualMachine> {
        let (completed, running): (Vec<_>, Vec<_>) = self.vms.drain(..).partition(|vm| vm.is_completed());
        self.vms = running;
        completed
            .into_iter()
            .map(|mut vm| {
                vm.set_current_host(None);
                vm
            })
            .collect()
    }

    ////////////////////////////////////////////////////////////////////////////////////////////////
    // Utilization
    ////////////////////////////////////////////////////////////////////////////////////////////////

    /// Current CPU demand of resident VMs in MIPS.
    pub fn cpu_demand(&self) -> f64 {
        self.vms.iter().map(|vm| vm.demand()).sum()
    }

    /// CPU utilization (0-1) against the current DVFS-scaled capacity.
    pub fn cpu_utilization(&self) -> f64 {
        utilization(self.cpu_demand(), self.cpu_capacity())
    }

    /// CPU utilization (0-1) against the unscaled capacity.
    pub fn base_cpu_utilization(&self) -> f64 {
        utilization(self.cpu_demand(), self.base_cpu_capacity())
    }

    /// Unscaled CPU capacity not committed to resident VMs, can be negative under oversubscription.
    pub fn remaining_cpu(&self) -> f64 {
        self.base_cpu_capacity() - self.cpu_committed()
    }

    pub fn free_ram(&self) -> u64 {
        self.ram.saturating_sub(self.ram_committed())
    }

    ////////////////////////////////////////////////////////////////////////////////////////////////
    // Power and DVFS
    ////////////////////////////////////////////////////////////////////////////////////////////////

    pub fn dvfs_enabled(&self) -> bool {
        self.dvfs_enabled
    }

    pub fn enable_dvfs(&mut self, enabled: bool) {
        self.dvfs_enabled = enabled;
    }

    pub fn dvfs_levels(&self) -> &[DvfsLevel] {
        &self.dvfs_levels
    }

    pub fn current_dvfs_level(&self) -> u32 {
        self.current_dvfs_level
    }

    /// Replaces the DVFS table and switches the host to level 0.
    pub fn set_dvfs_levels(&mut self, levels: Vec<DvfsLevel>) -> Result<()> {
        if find_level(&levels, 0).is_none() {
            return Err(DatacenterError::InvalidDvfsLevel {
                host_id: self.id,
                level: 0,
            });
        }
        self.dvfs_levels = levels;
        self.apply_dvfs_level(0)
    }

    /// Replaces the rule selecting the DVFS level from utilization.
    pub fn set_dvfs_governor(&mut self, governor: Box<dyn DvfsGovernor>) {
        self.dvfs_governor = governor;
    }

    pub fn set_power_model(&mut self, power_model: Box<dyn PowerModel>) {
        self.power_model = power_model;
    }

    /// Switches the host to the given DVFS level, leaves the state unchanged if the level is not defined.
    pub fn apply_dvfs_level(&mut self, level: u32) -> Result<()> {
        let row = find_level(&self.dvfs_levels, level).ok_or(DatacenterError::InvalidDvfsLevel {
            host_id: self.id,
            level,
        })?;
        self.core_capacity = self.base_core_capacity * row.scaling;
        self.power_idle = row.power_idle;
        self.power_max = row.power_max;
        self.current_dvfs_level = level;
        Ok(())
    }

    /// Re-evaluates the DVFS level from the unscaled utilization.
    ///
    /// Returns an error and keeps the current level if the governor selects an undefined level.
    pub fn update_dvfs(&mut self) -> Result<()> {
        let level = self.dvfs_governor.select_level(self.base_cpu_utilization());
        if level != self.current_dvfs_level {
            self.apply_dvfs_level(level)?;
        }
        Ok(())
    }

    /// Computes the current power draw in W, updating the DVFS level first if DVFS is enabled.
    ///
    /// If the governor selects an undefined level, the current level is kept. Call [`Host::update_dvfs`]
    /// beforehand to observe this failure.
    ///
    /// A powered off host draws nothing only while it has no CPU demand. Residual demand of VMs not yet
    /// removed from a powered off host is still charged.
    pub fn power_draw(&mut self) -> f64 {
        if self.dvfs_enabled {
            self.update_dvfs().ok();
        }
        let utilization = self.cpu_utilization();
        if !self.active && utilization == 0. {
            return 0.;
        }
        self.power_model.get_power(utilization, self.power_idle, self.power_max)
    }

    /// Last power value accounted by the energy meter.
    pub fn current_power(&self) -> f64 {
        self.energy_meter.current_power()
    }

    /// Power draw in W the host would have with `extra_demand` MIPS of additional CPU demand.
    ///
    /// Does not modify the host. With DVFS enabled the level is selected for the projected load,
    /// an undefined level selected by the governor falls back to the current one.
    pub fn projected_power(&self, extra_demand: f64) -> f64 {
        let demand = self.cpu_demand() + extra_demand;
        let (capacity, power_idle, power_max) = match self.projected_dvfs_level(demand) {
            Some(row) => (self.base_cpu_capacity() * row.scaling, row.power_idle, row.power_max),
            None => (self.cpu_capacity(), self.power_idle, self.power_max),
        };
        let u = utilization(demand, capacity);
        if !self.active && u == 0. {
            return 0.;
        }
        self.power_model.get_power(u, power_idle, power_max)
    }

    fn projected_dvfs_level(&self, demand: f64) -> Option<&DvfsLevel> {
        if !self.dvfs_enabled {
            return None;
        }
        let level = self
            .dvfs_governor
            .select_level(utilization(demand, self.base_cpu_capacity()));
        find_level(&self.dvfs_levels, level)
    }
}

fn utilization(demand: f64, capacity: f64) -> f64 {
    if capacity <= 0. {
        return 0.;
    }
    (demand / capacity).clamp(0., 1.)
}

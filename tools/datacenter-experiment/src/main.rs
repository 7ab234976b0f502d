use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Parser;
use env_logger::Builder;
use log::info;

use dslab_datacenter::core::config::sim_config::SimulationConfig;
use dslab_datacenter::core::logger::FileLogger;
use dslab_datacenter::error::Result;
use dslab_datacenter::extensions::vm_profile_generator::{load_profiles, save_profiles, WorkloadGenerator};
use dslab_datacenter::simulation::DatacenterSimulation;

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
/// Runs datacenter simulation with generated or saved VM workload
struct Args {
    /// Path to YAML file with simulation configuration
    #[arg(short, long)]
    config: PathBuf,

    /// Path to JSON file with VM profiles to replay instead of generating the workload
    #[arg(short, long)]
    profiles: Option<PathBuf>,

    /// Path to save generated VM profiles
    #[arg(long)]
    profiles_out: Option<PathBuf>,

    /// Path to save simulation log in CSV format
    #[arg(long)]
    save_log: Option<PathBuf>,

    /// Path to produced JSON file with simulation results
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn init_logger() {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

fn main() -> Result<()> {
    init_logger();
    let args = Args::parse();

    let config = SimulationConfig::from_file(&path_str(&args.config))?;
    let mut sim = DatacenterSimulation::new(config.clone())?;
    if args.save_log.is_some() {
        sim.set_logger(FileLogger::with_level(log::Level::Debug));
    }

    let profiles = match &args.profiles {
        Some(path) => load_profiles(&path_str(path))?,
        None => WorkloadGenerator::from_config(&config)?.generate(sim.hosts().len())?,
    };
    if let Some(path) = &args.profiles_out {
        save_profiles(&profiles, &path_str(path))?;
    }
    info!(
        "{} hosts, {} VMs, {} steps of {} s",
        sim.hosts().len(),
        profiles.len(),
        config.time_steps,
        config.step_duration
    );
    sim.add_vm_profiles(profiles)?;

    let simulation_start = Instant::now();
    let result = sim.run();

    info!("Simulation process time {:.2?}", simulation_start.elapsed());
    info!(
        "Total energy: {:.2} J = {:.6} kWh (boot {:.2} J)",
        result.total_energy(),
        result.total_energy() / 3.6e6,
        result.boot_energy
    );
    info!(
        "VMs admitted: {}, rejected: {}, expired: {}, completed: {}",
        result.admitted_vms, result.rejected_vms, result.expired_vms, result.completed_vms
    );
    info!("Migrations: {}", result.migrations);
    for host in sim.hosts() {
        let history = match result.utilization_history.get(&host.id) {
            Some(history) => history,
            None => continue,
        };
        let mean = history.iter().sum::<f64>() / history.len().max(1) as f64;
        info!("{}: mean utilization {:.3}, energy {:.2} J", host.name, mean, host.energy_meter.energy_consumed());
    }

    if let Some(path) = &args.save_log {
        sim.save_log(&path_str(path))?;
    }
    if let Some(path) = &args.output {
        std::fs::File::create(path)?.write_all(serde_json::to_string_pretty(&result)?.as_bytes())?;
    }
    Ok(())
}

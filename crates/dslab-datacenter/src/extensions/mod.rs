//! Workload generation and VM migration.

pub mod arrival_rates;
pub mod lifetime_distribution;
pub mod trace_reader;
pub mod vm_migrator;
pub mod vm_profile_generator;

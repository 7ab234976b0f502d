//! Core datacenter model: hosts, VMs, cloudlets, scheduling and accounting.

pub mod cloudlet;
pub mod common;
pub mod config;
pub mod energy_meter;
pub mod host;
pub mod load_model;
pub mod logger;
pub mod monitoring;
pub mod scheduler;
pub mod vm;
pub mod vm_placement_algorithm;
pub mod vm_placement_algorithms;

#![doc = include_str!("../README.md")]

pub mod cpu;
pub mod dvfs;
pub mod power_model;

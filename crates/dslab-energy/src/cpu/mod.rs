//! A collection of CPU power curves.

pub mod linear;
pub mod utilization_aware;

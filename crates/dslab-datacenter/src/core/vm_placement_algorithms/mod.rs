pub mod best_fit;
pub mod energy_aware;
pub mod first_fit;
pub mod least_utilized;
pub mod most_free_ram;
pub mod most_utilized;
pub mod random;
pub mod worst_fit;

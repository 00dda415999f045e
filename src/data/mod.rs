//! Data sources for analyses that do not read a CSV file.

pub mod sample;

pub use sample::{SimulationSpec, model_parameters, simulate_scores};

//! Sensor module - simulated event producer

mod simulator;

pub use simulator::{LightSample, LightSimulator, SIMULATED_RANGE};

use crate::constants::{
    ACCEL_TRUST_THRESHOLD_G, COLLECTION_PERIOD, COLLECTION_RANGE_MAX_METERS,
    COLLECTION_RANGE_MIN_METERS, PLATEAU_THRESHOLD, POLL_PERIOD, SAMPLING_SPEED,
};
use clap::ValueEnum;
use std::fmt;
use std::ops::RangeInclusive;
use std::time::Duration;

/// How telemetry logging and plateau polling are scheduled within a cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ExecutionMode {
    /// Log then poll on one thread. Sampling blocks the loop.
    #[default]
    Sequential,
    /// Log and poll on two threads, joined before the next cycle.
    Concurrent,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Sequential => write!(f, "Sequential"),
            ExecutionMode::Concurrent => write!(f, "Concurrent"),
        }
    }
}

/// Flight parameters. `Default` is the flight configuration.
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    pub mode: ExecutionMode,
    pub plateau_threshold: u32,
    pub collection_band: RangeInclusive<f32>,
    pub trust_threshold: f32,
    pub sampling_speed: f32,
    pub collection_period: Duration,
    pub poll_period: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            mode: ExecutionMode::default(),
            plateau_threshold: PLATEAU_THRESHOLD,
            collection_band: COLLECTION_RANGE_MIN_METERS..=COLLECTION_RANGE_MAX_METERS,
            trust_threshold: ACCEL_TRUST_THRESHOLD_G,
            sampling_speed: SAMPLING_SPEED,
            collection_period: COLLECTION_PERIOD,
            poll_period: POLL_PERIOD,
        }
    }
}

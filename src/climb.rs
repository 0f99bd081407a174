//! Climb rate from successive displacements, for telemetry only.

use crate::constants::{CLIMB_RATE_WINDOW_SIZE, DISPLACEMENT_DEADBAND_METERS};
use chrono::{DateTime, Utc};
use fixed_deque::Deque;

pub struct ClimbRateTracker {
    climb_rate: f32,
    /// Last point that moved by more than the deadband.
    last_fix: Option<(DateTime<Utc>, f32)>,
    rolling_average: Deque<f32>,
}

impl ClimbRateTracker {
    pub fn new() -> Self {
        ClimbRateTracker {
            climb_rate: 0.0,
            last_fix: None,
            rolling_average: Deque::new(CLIMB_RATE_WINDOW_SIZE),
        }
    }

    /// Smoothed climb rate in m/s.
    pub fn climb_rate(&self) -> f32 {
        self.climb_rate
    }

    pub fn update(&mut self, timestamp: DateTime<Utc>, displacement: f32) -> f32 {
        let Some((last_time, last_displacement)) = self.last_fix else {
            self.last_fix = Some((timestamp, displacement));
            return self.climb_rate;
        };

        // Movement inside the deadband is noise, keep the last estimate.
        let mut velocity = self.climb_rate;
        let diff = displacement - last_displacement;
        if diff.abs() > DISPLACEMENT_DEADBAND_METERS {
            if let Ok(elapsed) = (timestamp - last_time).to_std() {
                if !elapsed.is_zero() {
                    velocity = diff / elapsed.as_secs_f32();
                    self.last_fix = Some((timestamp, displacement));
                }
            }
        }

        self.rolling_average.push_back(velocity);
        self.climb_rate =
            self.rolling_average.iter().sum::<f32>() / self.rolling_average.len() as f32;
        self.climb_rate
    }
}

//! Counts consecutive quiet, in-band cycles until the payload is considered to
//! have stopped climbing.
//!
//! The qualifying test is on the displacement itself (small and positive), not
//! on the change in displacement between cycles.

use std::ops::RangeInclusive;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlateauState {
    Idle,
    Accumulating(u32),
    /// Terminal for the flight.
    Plateaued,
}

impl PlateauState {
    pub fn name(&self) -> &'static str {
        match self {
            PlateauState::Idle => "Idle",
            PlateauState::Accumulating(_) => "Accumulating",
            PlateauState::Plateaued => "Plateaued",
        }
    }
}

/// What a single cycle contributes to the detector.
#[derive(Clone, Copy, Debug)]
pub struct Observation {
    pub displacement: f32,
    pub trusted: bool,
}

pub struct PlateauDetector {
    state: PlateauState,
    threshold: u32,
    band: RangeInclusive<f32>,
}

impl PlateauDetector {
    /// A threshold of zero is treated as one: at least one qualifying cycle
    /// is always needed.
    pub fn new(threshold: u32, band: RangeInclusive<f32>) -> Self {
        PlateauDetector {
            state: PlateauState::Idle,
            threshold: threshold.max(1),
            band,
        }
    }

    pub fn state(&self) -> PlateauState {
        self.state
    }

    pub fn count(&self) -> u32 {
        match self.state {
            PlateauState::Idle => 0,
            PlateauState::Accumulating(count) => count,
            PlateauState::Plateaued => self.threshold,
        }
    }

    fn qualifies(&self, observation: &Observation) -> bool {
        observation.trusted && self.band.contains(&observation.displacement)
    }

    /// Advances one cycle. `None` means the sample could not be read or was
    /// invalid, which counts as disqualifying.
    ///
    /// Returns true only on the cycle that reaches the plateau.
    pub fn update(&mut self, observation: Option<&Observation>) -> bool {
        if self.state == PlateauState::Plateaued {
            return false;
        }

        let count = match observation {
            Some(observation) if self.qualifies(observation) => self.count() + 1,
            _ => 0,
        };

        self.state = if count >= self.threshold {
            PlateauState::Plateaued
        } else if count == 0 {
            PlateauState::Idle
        } else {
            PlateauState::Accumulating(count)
        };
        self.state == PlateauState::Plateaued
    }
}

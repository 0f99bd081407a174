//! The flight controller: polls the sensors, feeds the plateau detector and
//! fires the sampling sequence once.

use crate::actuation::{Drive, Gate, run_sequence};
use crate::altitude::ReferenceFrame;
use crate::climb::ClimbRateTracker;
use crate::config::{ControllerConfig, ExecutionMode};
use crate::error::{PayloadError, Result};
use crate::plateau::{Observation, PlateauDetector, PlateauState};
use crate::sensors::{Sample, Sensors};
use crate::shutdown::ShutdownSignal;
use crate::telemetry::{TelemetryRecord, TelemetrySink};
use crate::trust::is_trustworthy;
use log::{debug, error, info, warn};
use std::panic;
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;

/// Writes a line, logging rather than propagating failures.
fn emit<T: TelemetrySink>(telemetry: &Mutex<T>, line: &str) {
    let mut sink = telemetry.lock().unwrap_or_else(PoisonError::into_inner);
    if let Err(e) = sink.emit(line) {
        warn!("{e}");
    }
}

/// What the controller made of one cycle's sample.
struct Assessment {
    sample: Option<Sample>,
    displacement: Option<f32>,
    trusted: bool,
    fault: Option<String>,
}

impl Assessment {
    fn missing(fault: PayloadError) -> Self {
        Assessment {
            sample: None,
            displacement: None,
            trusted: false,
            fault: Some(fault.to_string()),
        }
    }

    fn observation(&self) -> Option<Observation> {
        self.displacement.map(|displacement| Observation {
            displacement,
            trusted: self.trusted,
        })
    }
}

/// The plateau polling task: detector, trigger latch and the actuators it
/// fires. Kept apart from the rest of the controller so it can run on its own
/// thread in concurrent mode.
struct PlateauTrigger<G, D> {
    detector: PlateauDetector,
    triggered: bool,
    gate: G,
    drive: D,
    speed: f32,
    duration: Duration,
}

impl<G: Gate, D: Drive> PlateauTrigger<G, D> {
    /// Only an interrupt is returned. Actuator faults are logged here and the
    /// latch stays set.
    fn poll<T: TelemetrySink>(
        &mut self,
        observation: Option<&Observation>,
        telemetry: &Mutex<T>,
        shutdown: &ShutdownSignal,
    ) -> Result<()> {
        let before = self.detector.count();
        let plateaued = self.detector.update(observation);
        if self.detector.count() != before {
            debug!("Plateau count: {}", self.detector.count());
        }
        if !plateaued || self.triggered {
            return Ok(());
        }
        // Stopping wins over a plateau reached on the same cycle; the latch
        // stays unset.
        if shutdown.is_triggered() {
            return Err(PayloadError::InterruptRequested);
        }

        self.triggered = true;
        info!("Plateau reached, sampling");
        emit(telemetry, "Sampling Start");
        let result = run_sequence(
            &mut self.gate,
            &mut self.drive,
            self.speed,
            self.duration,
            shutdown,
        );
        emit(telemetry, "Sampling End");

        match result {
            Err(PayloadError::InterruptRequested) => Err(PayloadError::InterruptRequested),
            Err(e) => {
                error!("Sampling failed: {e}");
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    /// Drive to neutral, gate closed. Both are attempted.
    fn park(&mut self) {
        if let Err(e) = self.drive.set_speed(0.0) {
            error!("Failed to neutral drive: {e}");
        }
        if let Err(e) = self.gate.set_open(false) {
            error!("Failed to close gate: {e}");
        }
    }
}

pub struct FlightController<S, G, D, T> {
    sensors: S,
    trigger: PlateauTrigger<G, D>,
    telemetry: Mutex<T>,
    reference: ReferenceFrame,
    climb: ClimbRateTracker,
    config: ControllerConfig,
    shutdown: ShutdownSignal,
    cycle: u64,
}

impl<S, G, D, T> FlightController<S, G, D, T>
where
    S: Sensors,
    G: Gate + Send,
    D: Drive + Send,
    T: TelemetrySink,
{
    /// Captures the launch reference from the barometer, retrying each second
    /// until a valid reading arrives.
    pub fn new(
        mut sensors: S,
        gate: G,
        drive: D,
        telemetry: T,
        config: ControllerConfig,
        shutdown: ShutdownSignal,
    ) -> Result<Self> {
        let reference = loop {
            let captured = sensors
                .read_pressure_temperature()
                .and_then(|(pressure, temperature)| ReferenceFrame::capture(pressure, temperature));
            match captured {
                Ok(reference) => break reference,
                Err(e) => warn!("Could not capture launch reference: {e}"),
            }
            if shutdown.wait_timeout(Duration::from_secs(1)) {
                return Err(PayloadError::InterruptRequested);
            }
        };
        Ok(FlightController {
            sensors,
            trigger: PlateauTrigger {
                detector: PlateauDetector::new(
                    config.plateau_threshold,
                    config.collection_band.clone(),
                ),
                triggered: false,
                gate,
                drive,
                speed: config.sampling_speed,
                duration: config.collection_period,
            },
            telemetry: Mutex::new(telemetry),
            reference,
            climb: ClimbRateTracker::new(),
            config,
            shutdown,
            cycle: 0,
        })
    }

    pub fn reference(&self) -> &ReferenceFrame {
        &self.reference
    }

    pub fn plateau_state(&self) -> PlateauState {
        self.trigger.detector.state()
    }

    pub fn triggered(&self) -> bool {
        self.trigger.triggered
    }

    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    /// Polls until the shutdown signal fires, then parks the actuators.
    /// A clean shutdown, including one that interrupts sampling, is `Ok`.
    pub fn run(&mut self) -> Result<()> {
        info!("{} execution", self.config.mode);
        emit(
            &self.telemetry,
            &format!("*** {} Execution ***", self.config.mode),
        );
        self.trigger.park();

        loop {
            if self.shutdown.is_triggered() {
                break;
            }
            if let Err(e) = self.cycle() {
                debug!("Cycle {} ended the loop: {e}", self.cycle);
                break;
            }
            if self.shutdown.wait_timeout(self.config.poll_period) {
                break;
            }
        }

        self.trigger.park();
        Ok(())
    }

    /// One poll cycle. The sample is read once and every consumer works from
    /// that copy. Returns `InterruptRequested` if sampling was interrupted.
    pub fn cycle(&mut self) -> Result<()> {
        self.cycle += 1;
        let sample = self.sensors.sample();
        let assessment = self.assess(sample);
        let observation = assessment.observation();

        match self.config.mode {
            ExecutionMode::Sequential => {
                let polled =
                    self.trigger
                        .poll(observation.as_ref(), &self.telemetry, &self.shutdown);
                let record = self.record(&assessment);
                emit(&self.telemetry, &record.to_string());
                polled
            }
            ExecutionMode::Concurrent => {
                // Telemetry reports the plateau state as of the start of the
                // cycle; the two tasks share nothing else.
                let line = self.record(&assessment).to_string();
                let trigger = &mut self.trigger;
                let telemetry = &self.telemetry;
                let shutdown = &self.shutdown;
                thread::scope(|scope| {
                    let logging = scope.spawn(|| emit(telemetry, &line));
                    let polling =
                        scope.spawn(|| trigger.poll(observation.as_ref(), telemetry, shutdown));
                    logging
                        .join()
                        .unwrap_or_else(|payload| panic::resume_unwind(payload));
                    polling
                        .join()
                        .unwrap_or_else(|payload| panic::resume_unwind(payload))
                })
            }
        }
    }

    fn assess(&mut self, sample: Result<Sample>) -> Assessment {
        let sample = match sample {
            Ok(sample) => sample,
            Err(e) => {
                warn!("Cycle {}: {e}", self.cycle);
                return Assessment::missing(e);
            }
        };

        let trusted = is_trustworthy(sample.acceleration, self.config.trust_threshold);
        match self.reference.displacement(sample.pressure, sample.temperature) {
            Ok(displacement) => {
                self.climb.update(sample.timestamp, displacement);
                Assessment {
                    sample: Some(sample),
                    displacement: Some(displacement),
                    trusted,
                    fault: None,
                }
            }
            Err(e) => {
                warn!("Cycle {}: {e}", self.cycle);
                Assessment {
                    sample: Some(sample),
                    displacement: None,
                    trusted,
                    fault: Some(e.to_string()),
                }
            }
        }
    }

    fn record(&self, assessment: &Assessment) -> TelemetryRecord {
        TelemetryRecord {
            cycle: self.cycle,
            plateau_state: self.trigger.detector.state(),
            plateau_count: self.trigger.detector.count(),
            triggered: self.trigger.triggered,
            sample: assessment.sample,
            displacement: assessment.displacement,
            climb_rate: self.climb.climb_rate(),
            trusted: assessment.trusted,
            fault: assessment.fault.clone(),
        }
    }
}

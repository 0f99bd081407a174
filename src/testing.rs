//! Test doubles for the hardware traits. Actuator doubles share an
//! [`EventLog`] so tests can check command ordering across gate and drive.

use crate::actuation::{Drive, Gate};
use crate::error::{PayloadError, Result};
use crate::sensors::Sensors;
use crate::telemetry::TelemetrySink;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Gate(bool),
    Speed(f32),
}

#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    fn record(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn gate_openings(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| **event == Event::Gate(true))
            .count()
    }

    pub fn gate_is_open(&self) -> bool {
        self.events()
            .iter()
            .rev()
            .find_map(|event| match event {
                Event::Gate(open) => Some(*open),
                _ => None,
            })
            .unwrap_or(false)
    }
}

pub struct FakeGate {
    log: EventLog,
    open: bool,
    fail_on_open: bool,
}

impl FakeGate {
    pub fn new(log: &EventLog) -> Self {
        FakeGate {
            log: log.clone(),
            open: false,
            fail_on_open: false,
        }
    }

    pub fn fail_on_open(&mut self) {
        self.fail_on_open = true;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl Gate for FakeGate {
    fn set_open(&mut self, open: bool) -> Result<()> {
        if open && self.fail_on_open {
            return Err(PayloadError::actuator_fault("solenoid", "relay stuck"));
        }
        self.open = open;
        self.log.record(Event::Gate(open));
        Ok(())
    }
}

pub struct FakeDrive {
    log: EventLog,
    fail_speed: Option<f32>,
}

impl FakeDrive {
    pub fn new(log: &EventLog) -> Self {
        FakeDrive {
            log: log.clone(),
            fail_speed: None,
        }
    }

    pub fn fail_on_speed(&mut self, speed: f32) {
        self.fail_speed = Some(speed);
    }
}

impl Drive for FakeDrive {
    fn set_speed(&mut self, speed: f32) -> Result<()> {
        if self.fail_speed == Some(speed) {
            return Err(PayloadError::actuator_fault("servo", "PWM write failed"));
        }
        self.log.record(Event::Speed(speed));
        Ok(())
    }
}

#[derive(Clone, Copy)]
struct Frame {
    pressure: f32,
    temperature: f32,
    acceleration: [f32; 3],
}

/// Plays back scripted readings. `None` frames and an empty script read as
/// unavailable.
#[derive(Default)]
pub struct FakeSensors {
    frames: VecDeque<Option<Frame>>,
    current: Option<Frame>,
    gyro_failing: bool,
}

impl FakeSensors {
    /// Script whose first reading is the launch reference.
    pub fn with_launch(pressure: f32, temperature: f32) -> Self {
        let mut sensors = FakeSensors::default();
        sensors.push(pressure, temperature, [0.0; 3]);
        sensors
    }

    pub fn push(&mut self, pressure: f32, temperature: f32, acceleration: [f32; 3]) {
        self.frames.push_back(Some(Frame {
            pressure,
            temperature,
            acceleration,
        }));
    }

    pub fn push_failure(&mut self) {
        self.frames.push_back(None);
    }

    pub fn fail_gyro(&mut self) {
        self.gyro_failing = true;
    }

    fn unavailable() -> PayloadError {
        PayloadError::SensorUnavailable {
            sensor: "fake",
            message: "no scripted reading".to_string(),
        }
    }
}

impl Sensors for FakeSensors {
    fn read_pressure_temperature(&mut self) -> Result<(f32, f32)> {
        self.current = self.frames.pop_front().flatten();
        self.current
            .map(|frame| (frame.pressure, frame.temperature))
            .ok_or_else(FakeSensors::unavailable)
    }

    fn read_acceleration(&mut self) -> Result<[f32; 3]> {
        self.current
            .map(|frame| frame.acceleration)
            .ok_or_else(FakeSensors::unavailable)
    }

    fn read_gyro(&mut self) -> Result<[f32; 3]> {
        if self.gyro_failing {
            return Err(FakeSensors::unavailable());
        }
        self.current
            .map(|_| [0.0; 3])
            .ok_or_else(FakeSensors::unavailable)
    }
}

#[derive(Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
    failing: Arc<AtomicBool>,
}

impl MemorySink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn fail_writes(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

impl TelemetrySink for MemorySink {
    fn emit(&mut self, line: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(std::io::Error::other("sink offline").into());
        }
        self.lines.lock().unwrap().push(line.to_string());
        Ok(())
    }
}

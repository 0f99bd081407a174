//! Telemetry: one human-readable line per poll cycle.
//!
//! Lines go to a timestamped log file and, optionally, out over the radio
//! UART. A failed write is logged and the flight carries on.

use crate::constants::DOWNLINK_BAUD_RATE;
use crate::error::{PayloadError, Result};
use crate::plateau::PlateauState;
use crate::sensors::Sample;
use chrono::Utc;
use log::info;
use serialport::TTYPort;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub trait TelemetrySink: Send {
    fn emit(&mut self, line: &str) -> Result<()>;
}

/// Everything logged about a single cycle.
#[derive(Clone, Debug)]
pub struct TelemetryRecord {
    pub cycle: u64,
    pub plateau_state: PlateauState,
    pub plateau_count: u32,
    pub triggered: bool,
    pub sample: Option<Sample>,
    pub displacement: Option<f32>,
    pub climb_rate: f32,
    pub trusted: bool,
    /// Why the sample or displacement is missing.
    pub fault: Option<String>,
}

impl fmt::Display for TelemetryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cycle={} state={} plateau_count={} triggered={} trusted={}",
            self.cycle,
            self.plateau_state.name(),
            self.plateau_count,
            self.triggered,
            self.trusted
        )?;
        if let Some(displacement) = self.displacement {
            write!(
                f,
                " displacement={displacement:.2} m climb_rate={:.2} m/s",
                self.climb_rate
            )?;
        }
        if let Some(sample) = &self.sample {
            let [x, y, z] = sample.acceleration;
            write!(
                f,
                " pressure={:.2} hPa temperature={:.2} C accel=({x:.3}, {y:.3}, {z:.3}) g",
                sample.pressure, sample.temperature
            )?;
            if let Some([x, y, z]) = sample.gyro {
                write!(f, " gyro=({x:.3}, {y:.3}, {z:.3}) rad/s")?;
            }
        }
        if let Some(fault) = &self.fault {
            write!(f, " fault=\"{fault}\"")?;
        }
        Ok(())
    }
}

/// Appends lines to `telemetry_log_<start time>.log`.
pub struct FileTelemetry {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl FileTelemetry {
    pub fn create(log_dir: &Path) -> Result<Self> {
        fs::create_dir_all(log_dir)?;
        let path = log_dir.join(format!(
            "telemetry_log_{}.log",
            Utc::now().format("%Y-%m-%d_%H-%M-%S")
        ));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(FileTelemetry {
            writer: BufWriter::new(file),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TelemetrySink for FileTelemetry {
    fn emit(&mut self, line: &str) -> Result<()> {
        writeln!(
            self.writer,
            "{} - {line}",
            Utc::now().format("%Y-%m-%d %H:%M:%S%.3f")
        )?;
        // The payload can lose power at any time.
        self.writer.flush()?;
        Ok(())
    }
}

impl Drop for FileTelemetry {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

/// Radio downlink on a serial port.
pub struct Downlink {
    port: TTYPort,
}

impl Downlink {
    pub fn open(path: &str) -> Result<Self> {
        let port = serialport::new(path, DOWNLINK_BAUD_RATE)
            .timeout(Duration::from_millis(1000))
            .open_native()
            .map_err(|e| PayloadError::Initialization {
                message: format!("downlink {path}: {e}"),
            })?;
        info!("Downlink open on {path}");
        Ok(Downlink { port })
    }
}

impl TelemetrySink for Downlink {
    fn emit(&mut self, line: &str) -> Result<()> {
        self.port.write_all(line.as_bytes())?;
        self.port.write_all(b"\n")?;
        Ok(())
    }
}

/// Sends every line to each sink. All sinks are tried; the first error is
/// returned.
#[derive(Default)]
pub struct FanOut {
    sinks: Vec<Box<dyn TelemetrySink>>,
}

impl FanOut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl TelemetrySink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl TelemetrySink for FanOut {
    fn emit(&mut self, line: &str) -> Result<()> {
        let mut first_error = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.emit(line) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

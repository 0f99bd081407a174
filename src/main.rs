mod actuation;
mod actuators;
mod altitude;
mod climb;
mod config;
mod constants;
mod controller;
mod error;
mod plateau;
mod sensors;
mod shutdown;
mod telemetry;
#[cfg(test)]
mod testing;
mod trust;

use crate::actuation::Gate;
use crate::actuators::{ContinuousServo, Solenoid};
use crate::config::{ControllerConfig, ExecutionMode};
use crate::constants::{SELF_TEST_GATE_HOLD, SOLENOID_PIN};
use crate::controller::FlightController;
use crate::error::{PayloadError, Result};
use crate::sensors::{PayloadSensors, Sensors};
use crate::shutdown::ShutdownSignal;
use crate::telemetry::{Downlink, FanOut, FileTelemetry};
use clap::Parser;
use log::{error, info, warn};
use rppal::pwm::Channel;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(about = "Fires the sampling sequence once the payload stops climbing")]
struct Args {
    #[arg(long, value_enum, default_value_t = ExecutionMode::Sequential)]
    mode: ExecutionMode,

    /// Directory for telemetry logs
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Serial port to mirror telemetry to, e.g. /dev/serial0
    #[arg(long)]
    downlink: Option<String>,

    /// Check the sensors and solenoid, then exit
    #[arg(long)]
    self_test: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match fly(args) {
        Ok(()) | Err(PayloadError::InterruptRequested) => {
            info!("Stopped.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn fly(args: Args) -> Result<()> {
    let shutdown = ShutdownSignal::new();
    shutdown.install_interrupt_handler()?;

    // Actuators first so the valve is held closed while the sensors come up.
    let gate = Solenoid::new(SOLENOID_PIN)?;
    let drive = ContinuousServo::new(Channel::Pwm0)?;
    let sensors = PayloadSensors::new(&shutdown)?;

    if args.self_test {
        return self_test(sensors, gate, &shutdown);
    }

    let file = FileTelemetry::create(&args.log_dir)?;
    info!("Logging telemetry to {}", file.path().display());
    let mut telemetry = FanOut::new().with(file);
    if let Some(port) = &args.downlink {
        match Downlink::open(port) {
            Ok(downlink) => telemetry = telemetry.with(downlink),
            Err(e) => warn!("Flying without downlink: {e}"),
        }
    }

    let config = ControllerConfig {
        mode: args.mode,
        ..ControllerConfig::default()
    };
    let mut controller = FlightController::new(sensors, gate, drive, telemetry, config, shutdown)?;
    let reference = controller.reference();
    info!(
        "Launch reference: {:.2} hPa, {:.2} C",
        reference.launch_pressure, reference.launch_temperature
    );

    let outcome = controller.run();
    info!(
        "Stopped after {} cycles in {} state, sampled: {}",
        controller.cycles(),
        controller.plateau_state().name(),
        controller.triggered()
    );
    outcome
}

/// Reads each sensor once and cycles the solenoid. The servo is left alone.
fn self_test(
    mut sensors: impl Sensors,
    mut gate: impl Gate,
    shutdown: &ShutdownSignal,
) -> Result<()> {
    info!("Testing sensors...");
    let sample = sensors.sample()?;
    info!(
        "Pressure: {:.2} hPa, temperature: {:.2} C, acceleration: {:?} g, gyro: {:?} rad/s",
        sample.pressure, sample.temperature, sample.acceleration, sample.gyro
    );

    info!("Testing solenoid...");
    gate.set_open(false)?;
    gate.set_open(true)?;
    let interrupted = shutdown.wait_timeout(SELF_TEST_GATE_HOLD);
    gate.set_open(false)?;
    if interrupted {
        return Err(PayloadError::InterruptRequested);
    }

    info!("Self test passed.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Event, EventLog, FakeGate, FakeSensors};

    #[test]
    fn runs_with_no_arguments() {
        let args = Args::try_parse_from(["sli-payload"]).unwrap();
        assert_eq!(args.mode, ExecutionMode::Sequential);
        assert_eq!(args.log_dir, PathBuf::from("logs"));
        assert!(args.downlink.is_none());
        assert!(!args.self_test);
    }

    #[test]
    fn concurrent_mode_flag() {
        let args = Args::try_parse_from(["sli-payload", "--mode", "concurrent"]).unwrap();
        assert_eq!(args.mode, ExecutionMode::Concurrent);
    }

    #[test]
    fn self_test_cycles_the_gate() {
        let log = EventLog::default();
        let mut sensors = FakeSensors::default();
        sensors.push(1013.0, 20.0, [0.0; 3]);
        let shutdown = ShutdownSignal::new();
        shutdown.trigger();

        let result = self_test(sensors, FakeGate::new(&log), &shutdown);
        assert!(matches!(result, Err(PayloadError::InterruptRequested)));
        assert_eq!(
            log.events(),
            vec![Event::Gate(false), Event::Gate(true), Event::Gate(false)]
        );
    }

    #[test]
    fn self_test_fails_without_sensors() {
        let log = EventLog::default();
        let result = self_test(FakeSensors::default(), FakeGate::new(&log), &ShutdownSignal::new());
        assert!(matches!(result, Err(PayloadError::SensorUnavailable { .. })));
        assert!(log.events().is_empty());
    }
}

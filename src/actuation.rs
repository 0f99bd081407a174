//! The sampling sequence: open the solenoid, spin the servo, close everything.

use crate::error::{PayloadError, Result};
use crate::shutdown::ShutdownSignal;
use log::{error, info};
use std::time::Duration;

/// The solenoid valve gating the sample line.
pub trait Gate {
    fn set_open(&mut self, open: bool) -> Result<()>;
}

/// A continuous rotation drive. `speed` is in [-1, 1], 0 is neutral.
pub trait Drive {
    fn set_speed(&mut self, speed: f32) -> Result<()>;
}

/// Runs the drive at `speed` for `duration` with the gate open.
///
/// The drive is returned to neutral and the gate closed on every exit path,
/// including a fault while opening or driving and an interrupt during the
/// wait. The first error encountered is returned. If shutdown has already
/// been requested nothing is commanded. Holds no state; calling it at most
/// once per flight is up to the caller.
pub fn run_sequence<G, D>(
    gate: &mut G,
    drive: &mut D,
    speed: f32,
    duration: Duration,
    shutdown: &ShutdownSignal,
) -> Result<()>
where
    G: Gate + ?Sized,
    D: Drive + ?Sized,
{
    if shutdown.is_triggered() {
        return Err(PayloadError::InterruptRequested);
    }
    info!("Running drive at {speed} for {:.1}s", duration.as_secs_f32());
    let outcome = gate.set_open(true).and_then(|()| {
        drive.set_speed(speed)?;
        if shutdown.wait_timeout(duration) {
            Err(PayloadError::InterruptRequested)
        } else {
            Ok(())
        }
    });

    let stopped = drive.set_speed(0.0);
    if let Err(e) = &stopped {
        error!("Failed to stop drive: {e}");
    }
    let closed = gate.set_open(false);
    if let Err(e) = &closed {
        error!("Failed to close gate: {e}");
    }

    outcome.and(stopped).and(closed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Event, EventLog, FakeDrive, FakeGate};
    use std::thread;
    use std::time::Instant;

    #[test]
    fn sequence_order() {
        let log = EventLog::default();
        let mut gate = FakeGate::new(&log);
        let mut drive = FakeDrive::new(&log);
        run_sequence(
            &mut gate,
            &mut drive,
            1.0,
            Duration::from_millis(10),
            &ShutdownSignal::new(),
        )
        .unwrap();
        assert_eq!(
            log.events(),
            vec![
                Event::Gate(true),
                Event::Speed(1.0),
                Event::Speed(0.0),
                Event::Gate(false),
            ]
        );
    }

    #[test]
    fn drive_runs_for_duration() {
        let log = EventLog::default();
        let mut gate = FakeGate::new(&log);
        let mut drive = FakeDrive::new(&log);
        let start = Instant::now();
        run_sequence(
            &mut gate,
            &mut drive,
            0.5,
            Duration::from_millis(50),
            &ShutdownSignal::new(),
        )
        .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn gate_closes_when_drive_faults() {
        let log = EventLog::default();
        let mut gate = FakeGate::new(&log);
        let mut drive = FakeDrive::new(&log);
        drive.fail_on_speed(1.0);

        let result = run_sequence(
            &mut gate,
            &mut drive,
            1.0,
            Duration::from_millis(10),
            &ShutdownSignal::new(),
        );
        assert!(matches!(result, Err(PayloadError::ActuatorFault { .. })));
        assert!(!gate.is_open());
        assert_eq!(log.events().last(), Some(&Event::Gate(false)));
    }

    #[test]
    fn gate_closes_when_opening_faults() {
        let log = EventLog::default();
        let mut gate = FakeGate::new(&log);
        gate.fail_on_open();
        let mut drive = FakeDrive::new(&log);

        let result = run_sequence(
            &mut gate,
            &mut drive,
            1.0,
            Duration::from_millis(10),
            &ShutdownSignal::new(),
        );
        assert!(result.is_err());
        assert!(!gate.is_open());
        assert!(!log.events().contains(&Event::Speed(1.0)));
    }

    #[test]
    fn interrupt_cuts_the_run_short_and_still_tears_down() {
        let log = EventLog::default();
        let mut gate = FakeGate::new(&log);
        let mut drive = FakeDrive::new(&log);
        let shutdown = ShutdownSignal::new();
        let remote = shutdown.clone();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            remote.trigger();
        });

        let start = Instant::now();
        let result = run_sequence(&mut gate, &mut drive, 1.0, Duration::from_secs(30), &shutdown);
        stopper.join().unwrap();
        assert!(matches!(result, Err(PayloadError::InterruptRequested)));
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(
            log.events(),
            vec![
                Event::Gate(true),
                Event::Speed(1.0),
                Event::Speed(0.0),
                Event::Gate(false),
            ]
        );
    }

    #[test]
    fn nothing_is_commanded_after_shutdown_was_requested() {
        let log = EventLog::default();
        let mut gate = FakeGate::new(&log);
        let mut drive = FakeDrive::new(&log);
        let shutdown = ShutdownSignal::new();
        shutdown.trigger();

        let result = run_sequence(&mut gate, &mut drive, 1.0, Duration::from_secs(30), &shutdown);
        assert!(matches!(result, Err(PayloadError::InterruptRequested)));
        assert!(log.events().is_empty());
    }
}

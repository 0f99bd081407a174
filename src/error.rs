use thiserror::Error;

/// Everything that can go wrong on the payload.
///
/// Only `Initialization` is fatal. Sensor errors disqualify a single cycle,
/// actuator faults are logged and the flight continues.
#[derive(Error, Debug)]
pub enum PayloadError {
    /// A read could not be completed this cycle
    #[error("{sensor} unavailable: {message}")]
    SensorUnavailable {
        sensor: &'static str,
        message: String,
    },

    /// A physically impossible value came back from a sensor
    #[error("invalid {quantity} reading: {value}")]
    InvalidReading { quantity: &'static str, value: f32 },

    /// A drive or gate command failed
    #[error("{actuator} fault: {message}")]
    ActuatorFault {
        actuator: &'static str,
        message: String,
    },

    /// External shutdown signal
    #[error("interrupt requested")]
    InterruptRequested,

    /// Hardware bring-up failed
    #[error("initialization failed: {message}")]
    Initialization { message: String },

    #[error("telemetry write failed: {0}")]
    Telemetry(#[from] std::io::Error),
}

impl PayloadError {
    pub fn sensor_unavailable(sensor: &'static str, err: impl std::fmt::Debug) -> Self {
        PayloadError::SensorUnavailable {
            sensor,
            message: format!("{err:?}"),
        }
    }

    pub fn actuator_fault(actuator: &'static str, err: impl std::fmt::Display) -> Self {
        PayloadError::ActuatorFault {
            actuator,
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PayloadError>;

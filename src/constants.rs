//! Constants used throughout the program.

use std::time::Duration;

/// Consecutive qualifying cycles after which the payload is considered to be at plateau:
pub const PLATEAU_THRESHOLD: u32 = 3;
/// Lower bound of the displacement band counted toward a plateau:
pub const COLLECTION_RANGE_MIN_METERS: f32 = 0.1;
/// Upper bound of the displacement band counted toward a plateau:
pub const COLLECTION_RANGE_MAX_METERS: f32 = 1.0;

/// Net acceleration (in g, gravity removed) below which the barometer is trusted:
pub const ACCEL_TRUST_THRESHOLD_G: f32 = 0.2;

/// Servo speed during the sampling sequence (full forward):
pub const SAMPLING_SPEED: f32 = 1.0;
/// How long the servo runs while the solenoid is open:
pub const COLLECTION_PERIOD: Duration = Duration::from_secs(2);

/// Delay between poll cycles:
pub const POLL_PERIOD: Duration = Duration::from_millis(500);

// Standard atmosphere.
pub const SEA_LEVEL_PRESSURE_HPA: f32 = 1013.25;
pub const SEA_LEVEL_TEMPERATURE_KELVIN: f32 = 288.15;
pub const TEMPERATURE_LAPSE_RATE: f32 = 0.00649; // K/m
pub const UNIVERSAL_GAS_CONSTANT: f32 = 8.314; // J/(mol K)
pub const STANDARD_GRAVITY: f32 = 9.80665; // m/s^2
pub const MOLAR_MASS_AIR: f32 = 0.0289644; // kg/mol
pub const CELSIUS_TO_KELVIN: f32 = 273.15;

/// Number of still samples averaged for the accelerometer bias:
pub const ACCEL_CALIBRATION_SAMPLES: usize = 100;
pub const ACCEL_CALIBRATION_INTERVAL: Duration = Duration::from_millis(10);

pub const I2C_BUS_PATH: &str = "/dev/i2c-1";
pub const MPU6050_ADDRESSES: [u8; 2] = [0x68, 0x69];

/// BCM pin driving the solenoid relay:
pub const SOLENOID_PIN: u8 = 4;
/// Servo signal frequency. The servo sits on BCM 18, hardware PWM channel 0.
pub const SERVO_PWM_FREQUENCY_HZ: f64 = 50.0;
/// Duty cycle (%) at which a continuous rotation servo stops:
pub const SERVO_NEUTRAL_DUTY_PERCENT: f64 = 7.5;
/// Duty cycle (%) added per unit of speed, so -1 -> 2.5% and 1 -> 12.5%:
pub const SERVO_DUTY_SPAN_PERCENT: f64 = 5.0;

pub const CLIMB_RATE_WINDOW_SIZE: usize = 15;
pub const DISPLACEMENT_DEADBAND_METERS: f32 = 0.05;

pub const DOWNLINK_BAUD_RATE: u32 = 9600;

/// How long the solenoid stays open during the self test:
pub const SELF_TEST_GATE_HOLD: Duration = Duration::from_secs(2);

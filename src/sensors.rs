//! Barometer and accelerometer access.
//!
//! The controller only sees the [`Sensors`] trait. [`PayloadSensors`] is the
//! flight hardware: a BMP280 for pressure/temperature and an MPU6050 for
//! acceleration, both on the Pi's I2C bus.

use crate::constants::{
    ACCEL_CALIBRATION_INTERVAL, ACCEL_CALIBRATION_SAMPLES, I2C_BUS_PATH, MPU6050_ADDRESSES,
};
use crate::error::{PayloadError, Result};
use crate::shutdown::ShutdownSignal;
use bmp280::{Bmp280, Bmp280Builder};
use chrono::{DateTime, Utc};
use linux_embedded_hal::{Delay, I2cdev};
use log::{debug, info, warn};
use mpu6050::Mpu6050;
use std::thread;
use std::time::Duration;

/// One cycle's observation. Taken once per cycle and handed out by copy.
#[derive(Clone, Copy, Debug)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub pressure: f32,    // hPa
    pub temperature: f32, // Celsius
    /// Net acceleration in g, gravity and bias removed.
    pub acceleration: [f32; 3],
    /// Angular rate in rad/s. Logged only; a failed read leaves it empty.
    pub gyro: Option<[f32; 3]>,
}

pub trait Sensors {
    /// (pressure in hPa, temperature in Celsius)
    fn read_pressure_temperature(&mut self) -> Result<(f32, f32)>;

    /// Net acceleration in g.
    fn read_acceleration(&mut self) -> Result<[f32; 3]>;

    /// Angular rate in rad/s.
    fn read_gyro(&mut self) -> Result<[f32; 3]>;

    fn sample(&mut self) -> Result<Sample> {
        let (pressure, temperature) = self.read_pressure_temperature()?;
        let acceleration = self.read_acceleration()?;
        let gyro = match self.read_gyro() {
            Ok(gyro) => Some(gyro),
            Err(e) => {
                debug!("{e}");
                None
            }
        };
        Ok(Sample {
            timestamp: Utc::now(),
            pressure,
            temperature,
            acceleration,
            gyro,
        })
    }
}

pub struct PayloadSensors {
    bmp280: Bmp280,
    mpu6050: Option<Mpu6050<I2cdev>>,
    accel_bias: [f32; 3],
}

impl PayloadSensors {
    /// Brings up both sensors and calibrates the accelerometer. The payload
    /// must be held still while this runs.
    pub fn new(shutdown: &ShutdownSignal) -> Result<Self> {
        // We can have I2C read/write errors sometimes, so just keep trying:
        let bmp280 = loop {
            if let Ok(dev) = Bmp280Builder::new().build() {
                break dev;
            }
            warn!("Waiting for BMP280 sensor to be ready...");
            if shutdown.wait_timeout(Duration::from_secs(1)) {
                return Err(PayloadError::InterruptRequested);
            }
        };
        info!("BMP280 sensor initialized.");

        let mut sensors = PayloadSensors {
            bmp280,
            mpu6050: open_mpu6050(),
            accel_bias: [0.0; 3],
        };
        sensors.calibrate_accelerometer();
        Ok(sensors)
    }

    /// Averages still readings into a bias. The bias includes gravity, so
    /// corrected readings are net acceleration.
    fn calibrate_accelerometer(&mut self) {
        let Some(mpu) = self.mpu6050.as_mut() else {
            return;
        };
        info!("Calibrating MPU6050, hold still...");

        let mut sum = [0.0f32; 3];
        let mut taken = 0;
        for _ in 0..ACCEL_CALIBRATION_SAMPLES {
            match mpu.get_acc() {
                Ok(acc) => {
                    sum[0] += acc.x;
                    sum[1] += acc.y;
                    sum[2] += acc.z;
                    taken += 1;
                }
                Err(e) => warn!("Calibration read failed: {e:?}"),
            }
            thread::sleep(ACCEL_CALIBRATION_INTERVAL);
        }

        if taken == 0 {
            warn!("No calibration samples, accelerometer bias left at zero");
            return;
        }
        self.accel_bias = sum.map(|axis| axis / taken as f32);
        info!(
            "Calibration complete from {taken} samples, bias: {:?} g",
            self.accel_bias
        );
    }

    fn mpu6050(&mut self) -> Result<&mut Mpu6050<I2cdev>> {
        self.mpu6050
            .as_mut()
            .ok_or_else(|| PayloadError::SensorUnavailable {
                sensor: "MPU6050",
                message: "not connected".to_string(),
            })
    }
}

/// Tries each MPU6050 address in turn. The payload can fly without one, the
/// barometer just never counts as trusted.
fn open_mpu6050() -> Option<Mpu6050<I2cdev>> {
    let mut delay = Delay;
    for address in MPU6050_ADDRESSES {
        let i2cdev = match I2cdev::new(I2C_BUS_PATH) {
            Ok(i2cdev) => i2cdev,
            Err(e) => {
                warn!("Failed to open {I2C_BUS_PATH} for MPU6050: {e:?}");
                return None;
            }
        };
        let mut sensor = Mpu6050::new_with_addr(i2cdev, address);
        match sensor.init(&mut delay) {
            Ok(()) => {
                info!("MPU6050 initialized at address 0x{address:02X}.");
                return Some(sensor);
            }
            Err(e) => warn!("MPU6050 init failed at 0x{address:02X}: {e:?}"),
        }
    }
    warn!("Continuing without MPU6050.");
    None
}

impl Sensors for PayloadSensors {
    fn read_pressure_temperature(&mut self) -> Result<(f32, f32)> {
        let pressure_kpa = self
            .bmp280
            .pressure_kpa()
            .map_err(|e| PayloadError::sensor_unavailable("BMP280", e))?;
        let temperature = self
            .bmp280
            .temperature_celsius()
            .map_err(|e| PayloadError::sensor_unavailable("BMP280", e))?;
        Ok((pressure_kpa * 10.0, temperature))
    }

    fn read_acceleration(&mut self) -> Result<[f32; 3]> {
        let acc = self
            .mpu6050()?
            .get_acc()
            .map_err(|e| PayloadError::sensor_unavailable("MPU6050", e))?;
        Ok([
            acc.x - self.accel_bias[0],
            acc.y - self.accel_bias[1],
            acc.z - self.accel_bias[2],
        ])
    }

    fn read_gyro(&mut self) -> Result<[f32; 3]> {
        let gyro = self
            .mpu6050()?
            .get_gyro()
            .map_err(|e| PayloadError::sensor_unavailable("MPU6050", e))?;
        Ok([gyro.x, gyro.y, gyro.z])
    }
}

//! Barometric altitude and displacement from the launch reference.

use crate::constants::{
    CELSIUS_TO_KELVIN, MOLAR_MASS_AIR, SEA_LEVEL_PRESSURE_HPA, SEA_LEVEL_TEMPERATURE_KELVIN,
    STANDARD_GRAVITY, TEMPERATURE_LAPSE_RATE, UNIVERSAL_GAS_CONSTANT,
};
use crate::error::{PayloadError, Result};

/// Altitude in meters of `pressure_hpa` above the level where the pressure is
/// `datum_pressure_hpa`, using the standard atmosphere lapse-rate model.
///
/// The model works from the standard sea level temperature, the measured
/// temperature is only range checked.
pub fn pressure_altitude(
    pressure_hpa: f32,
    temperature_celsius: f32,
    datum_pressure_hpa: f32,
) -> Result<f32> {
    check_pressure(pressure_hpa)?;
    check_pressure(datum_pressure_hpa)?;
    let temperature_kelvin = temperature_celsius + CELSIUS_TO_KELVIN;
    if !temperature_kelvin.is_finite() || temperature_kelvin <= 0.0 {
        return Err(PayloadError::InvalidReading {
            quantity: "temperature",
            value: temperature_celsius,
        });
    }

    let exponent = (UNIVERSAL_GAS_CONSTANT * TEMPERATURE_LAPSE_RATE)
        / (STANDARD_GRAVITY * MOLAR_MASS_AIR);
    Ok((SEA_LEVEL_TEMPERATURE_KELVIN / TEMPERATURE_LAPSE_RATE)
        * (1.0 - (pressure_hpa / datum_pressure_hpa).powf(exponent)))
}

fn check_pressure(pressure_hpa: f32) -> Result<()> {
    if pressure_hpa.is_finite() && pressure_hpa > 0.0 {
        Ok(())
    } else {
        Err(PayloadError::InvalidReading {
            quantity: "pressure",
            value: pressure_hpa,
        })
    }
}

/// Launch-time baseline. Captured once and never changed for the flight.
#[derive(Clone, Copy, Debug)]
pub struct ReferenceFrame {
    pub launch_pressure: f32,
    pub launch_temperature: f32,
    launch_altitude: f32,
}

impl ReferenceFrame {
    pub fn capture(launch_pressure: f32, launch_temperature: f32) -> Result<Self> {
        let launch_altitude =
            pressure_altitude(launch_pressure, launch_temperature, SEA_LEVEL_PRESSURE_HPA)?;
        Ok(ReferenceFrame {
            launch_pressure,
            launch_temperature,
            launch_altitude,
        })
    }

    /// Meters above the launch point. The launch reading goes through the same
    /// formula, so any absolute bias cancels out.
    pub fn displacement(&self, pressure_hpa: f32, temperature_celsius: f32) -> Result<f32> {
        let current = pressure_altitude(pressure_hpa, temperature_celsius, SEA_LEVEL_PRESSURE_HPA)?;
        Ok(current - self.launch_altitude)
    }
}

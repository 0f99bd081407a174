//! Solenoid relay and continuous rotation servo on the Pi's GPIO header.

use crate::actuation::{Drive, Gate};
use crate::constants::{
    SERVO_DUTY_SPAN_PERCENT, SERVO_NEUTRAL_DUTY_PERCENT, SERVO_PWM_FREQUENCY_HZ,
};
use crate::error::{PayloadError, Result};
use log::{debug, info};
use rppal::gpio::{Gpio, OutputPin};
use rppal::pwm::{Channel, Polarity, Pwm};

/// Relay-driven solenoid. Starts de-energized (closed).
pub struct Solenoid {
    pin: OutputPin,
}

impl Solenoid {
    pub fn new(bcm_pin: u8) -> Result<Self> {
        let pin = Gpio::new()
            .and_then(|gpio| gpio.get(bcm_pin))
            .map_err(|e| PayloadError::Initialization {
                message: format!("solenoid pin {bcm_pin}: {e}"),
            })?
            .into_output_low();
        Ok(Solenoid { pin })
    }
}

impl Gate for Solenoid {
    fn set_open(&mut self, open: bool) -> Result<()> {
        if open {
            self.pin.set_high();
            info!("Solenoid activated (relay on).");
        } else {
            self.pin.set_low();
            info!("Solenoid deactivated (relay off).");
        }
        Ok(())
    }
}

/// Duty cycle (0.0..=1.0) for a servo speed. Speeds outside [-1, 1] are clamped.
pub fn duty_cycle(speed: f32) -> f64 {
    let speed = if speed.is_nan() { 0.0 } else { speed.clamp(-1.0, 1.0) };
    (SERVO_NEUTRAL_DUTY_PERCENT + f64::from(speed) * SERVO_DUTY_SPAN_PERCENT) / 100.0
}

/// Continuous rotation servo on a hardware PWM channel. Starts at neutral.
pub struct ContinuousServo {
    pwm: Pwm,
}

impl ContinuousServo {
    pub fn new(channel: Channel) -> Result<Self> {
        let pwm = Pwm::with_frequency(
            channel,
            SERVO_PWM_FREQUENCY_HZ,
            duty_cycle(0.0),
            Polarity::Normal,
            true,
        )
        .map_err(|e| PayloadError::Initialization {
            message: format!("servo PWM: {e}"),
        })?;
        Ok(ContinuousServo { pwm })
    }
}

impl Drive for ContinuousServo {
    fn set_speed(&mut self, speed: f32) -> Result<()> {
        let duty = duty_cycle(speed);
        self.pwm
            .set_duty_cycle(duty)
            .map_err(|e| PayloadError::actuator_fault("servo", e))?;
        debug!("Set speed to {speed}, duty cycle: {:.2}%", duty * 100.0);
        Ok(())
    }
}

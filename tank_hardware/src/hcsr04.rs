use std::time::Duration;

use rppal::gpio::{Gpio, InputPin, OutputPin};
use tank_traits::{BoxError, EchoSensor};
use tracing::trace;

use crate::error::{HwError, Result};
use crate::util::{measure_pulse_with_timeout, spin_for};

/// HC-SR04 ultrasonic ranger on two GPIO lines.
pub struct Hcsr04 {
    trigger: OutputPin,
    echo: InputPin,
}

impl Hcsr04 {
    pub fn new(trigger_pin: u8, echo_pin: u8) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let trigger = gpio
            .get(trigger_pin)
            .map_err(|e| HwError::Gpio(format!("trigger pin {trigger_pin}: {e}")))?
            .into_output_low();
        let echo = gpio
            .get(echo_pin)
            .map_err(|e| HwError::Gpio(format!("echo pin {echo_pin}: {e}")))?
            .into_input();
        Ok(Self { trigger, echo })
    }

    /// 2 µs low, 10 µs trigger, then time the echo pulse.
    pub fn ping_with_timeout(&mut self, timeout: Duration) -> Result<Duration> {
        self.trigger.set_low();
        spin_for(Duration::from_micros(2));
        self.trigger.set_high();
        spin_for(Duration::from_micros(10));
        self.trigger.set_low();

        let echo = &self.echo;
        let width = measure_pulse_with_timeout(|| echo.is_high(), timeout, Duration::ZERO)?;
        trace!(echo_us = width.as_micros() as u64, "hc-sr04 echo");
        Ok(width)
    }
}

impl EchoSensor for Hcsr04 {
    fn ping(&mut self, timeout: Duration) -> std::result::Result<Duration, BoxError> {
        self.ping_with_timeout(timeout).map_err(Into::into)
    }
}

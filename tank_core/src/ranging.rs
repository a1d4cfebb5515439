//! One physical distance measurement.
//!
//! A ping either yields a distance inside the transducer's working range or
//! an invalid reading. Nothing here retries and nothing here returns an error:
//! sensor faults are folded into [`Reading::Invalid`] and logged.

use std::time::Duration;

use serde::Serialize;
use tank_traits::EchoSensor;
use tracing::{trace, warn};

use crate::config::RangingCfg;
use crate::error::LevelError;
use crate::hw_error::map_hw_error;

/// Speed of sound at ~20 °C, in cm per µs.
pub const SPEED_OF_SOUND_CM_PER_US: f64 = 0.0343;
/// Farthest distance the HC-SR04 reports reliably.
pub const MAX_RANGE_CM: f32 = 400.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InvalidReason {
    /// No complete echo inside the timeout.
    NoEcho,
    /// Echo decoded to a distance outside `(0, MAX_RANGE_CM]`.
    OutOfRange,
    /// Driver reported something other than a timeout.
    SensorFault,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Reading {
    Valid(f32),
    Invalid(InvalidReason),
}

impl Reading {
    pub fn cm(self) -> Option<f32> {
        match self {
            Reading::Valid(cm) => Some(cm),
            Reading::Invalid(_) => None,
        }
    }

    pub fn is_valid(self) -> bool {
        matches!(self, Reading::Valid(_))
    }
}

/// Convert an echo pulse width to a one-way distance.
#[inline]
pub fn echo_to_cm(echo: Duration) -> f32 {
    (echo.as_secs_f64() * 1e6 * SPEED_OF_SOUND_CM_PER_US / 2.0) as f32
}

/// Apply the sensor's validity window to a decoded distance.
#[inline]
pub fn classify_distance(cm: f32) -> Reading {
    if cm.is_finite() && cm > 0.0 && cm <= MAX_RANGE_CM {
        Reading::Valid(cm)
    } else {
        Reading::Invalid(InvalidReason::OutOfRange)
    }
}

pub struct Ranger<S: EchoSensor> {
    sensor: S,
    echo_timeout: Duration,
}

impl<S: EchoSensor> Ranger<S> {
    pub fn new(sensor: S, cfg: &RangingCfg) -> Self {
        Self {
            sensor,
            echo_timeout: cfg.echo_timeout(),
        }
    }

    pub fn measure_once(&mut self) -> Reading {
        match self.sensor.ping(self.echo_timeout) {
            // a driver that overruns its own timeout still saw no echo in time
            Ok(echo) if echo > self.echo_timeout => Reading::Invalid(InvalidReason::NoEcho),
            Ok(echo) => {
                let reading = classify_distance(echo_to_cm(echo));
                trace!(echo_us = echo.as_micros() as u64, ?reading, "ping");
                reading
            }
            Err(e) => match map_hw_error(&*e) {
                LevelError::Timeout => {
                    trace!("ping: no echo");
                    Reading::Invalid(InvalidReason::NoEcho)
                }
                other => {
                    warn!(error = %other, "sensor fault during ping");
                    Reading::Invalid(InvalidReason::SensorFault)
                }
            },
        }
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }
}

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use tank_traits::{BoxError, EchoSensor};
use tracing::trace;

use crate::error::HwError;

/// Round-trip speed of sound used to synthesize echo widths.
const CM_PER_US: f64 = 0.0343;

/// Echo width an HC-SR04 would report for a target `distance_cm` away.
pub fn echo_for_distance(distance_cm: f32) -> Duration {
    let us = f64::from(distance_cm.max(0.0)) * 2.0 / CM_PER_US;
    Duration::from_nanos((us * 1_000.0).round() as u64)
}

/// Simulated ultrasonic sensor looking at a liquid surface.
///
/// The surface distance lives behind a shared handle so a test or a bench
/// harness can move it while the pipeline owns the sensor. Scripted entries
/// are played first; `None` in a script is a missing echo.
#[derive(Debug)]
pub struct SimulatedSensor {
    distance_cm: Rc<Cell<f32>>,
    script: VecDeque<Option<f32>>,
    noise_cm: f32,
    drift_cm_per_ping: f32,
    dropout_every: u32,
    pings: u32,
    rng: u64,
}

impl SimulatedSensor {
    pub fn new(distance_cm: f32) -> Self {
        Self {
            distance_cm: Rc::new(Cell::new(distance_cm)),
            script: VecDeque::new(),
            noise_cm: 0.0,
            drift_cm_per_ping: 0.0,
            dropout_every: 0,
            pings: 0,
            rng: 0x9E37_79B9_7F4A_7C15,
        }
    }

    /// Sensor that replays `script` before settling at its last valid value.
    pub fn scripted(script: impl IntoIterator<Item = Option<f32>>) -> Self {
        let script: VecDeque<Option<f32>> = script.into_iter().collect();
        let rest = script.iter().rev().flatten().next().copied().unwrap_or(0.0);
        let mut s = Self::new(rest);
        s.script = script;
        s
    }

    /// Uniform noise of up to `amplitude_cm` either side, from a seeded xorshift.
    pub fn with_noise(mut self, amplitude_cm: f32, seed: u64) -> Self {
        self.noise_cm = amplitude_cm.abs();
        self.rng = seed.max(1);
        self
    }

    /// Move the surface by this many cm after every ping (positive = draining).
    pub fn with_drift(mut self, cm_per_ping: f32) -> Self {
        self.drift_cm_per_ping = cm_per_ping;
        self
    }

    /// Drop every `n`th echo; 0 disables dropouts.
    pub fn with_dropout_every(mut self, n: u32) -> Self {
        self.dropout_every = n;
        self
    }

    /// Shared handle on the simulated surface distance.
    pub fn distance_handle(&self) -> Rc<Cell<f32>> {
        Rc::clone(&self.distance_cm)
    }

    pub fn pings(&self) -> u32 {
        self.pings
    }

    fn next_noise(&mut self) -> f32 {
        if self.noise_cm == 0.0 {
            return 0.0;
        }
        self.rng ^= self.rng << 13;
        self.rng ^= self.rng >> 7;
        self.rng ^= self.rng << 17;
        let unit = (self.rng >> 11) as f64 / (1u64 << 53) as f64;
        ((unit * 2.0 - 1.0) as f32) * self.noise_cm
    }
}

impl EchoSensor for SimulatedSensor {
    fn ping(&mut self, timeout: Duration) -> Result<Duration, BoxError> {
        self.pings = self.pings.wrapping_add(1);

        let distance = match self.script.pop_front() {
            Some(Some(d)) => d,
            Some(None) => return Err(Box::new(HwError::EchoTimeout)),
            None => {
                if self.dropout_every > 0 && self.pings % self.dropout_every == 0 {
                    trace!(ping = self.pings, "simulated dropout");
                    return Err(Box::new(HwError::EchoTimeout));
                }
                let surface = self.distance_cm.get();
                self.distance_cm
                    .set((surface + self.drift_cm_per_ping).max(0.0));
                surface + self.next_noise()
            }
        };

        let echo = echo_for_distance(distance);
        if echo > timeout {
            return Err(Box::new(HwError::EchoTimeout));
        }
        trace!(distance_cm = distance, echo_us = echo.as_micros() as u64, "simulated echo");
        Ok(echo)
    }
}

//! Test and helper mocks for tank_core

use std::time::Duration;

use tank_traits::{BoxError, EchoSensor};

/// A sensor that never hears an echo; every tick ends without an estimate.
pub struct SilentSensor;

impl EchoSensor for SilentSensor {
    fn ping(&mut self, _timeout: Duration) -> Result<Duration, BoxError> {
        Err(Box::new(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "silent sensor: echo timeout",
        )))
    }
}

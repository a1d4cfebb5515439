//! Sensor and storage backends for the tank monitor.
//!
//! The HC-SR04 driver needs the `hardware` feature (rppal, Linux only). The
//! simulated sensor and the EEPROM emulations are always available and back
//! the bench harness and the test suites.

pub mod atomic;
pub mod eeprom;
pub mod error;
#[cfg(feature = "hardware")]
pub mod hcsr04;
pub mod sim;
pub mod util;

pub use eeprom::{FileEeprom, MemEeprom};
pub use error::HwError;
#[cfg(feature = "hardware")]
pub use hcsr04::Hcsr04;
pub use sim::SimulatedSensor;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tank_traits::EchoSensor;

    #[test]
    fn simulated_echo_scales_with_distance() {
        let mut near = SimulatedSensor::new(10.0);
        let mut far = SimulatedSensor::new(100.0);
        let t = Duration::from_millis(30);
        let a = near.ping(t).unwrap();
        let b = far.ping(t).unwrap();
        assert!(b > a * 9 && b < a * 11, "near={a:?} far={b:?}");
    }

    #[test]
    fn simulated_far_target_times_out() {
        // 600 cm needs ~35 ms round trip
        let mut s = SimulatedSensor::new(600.0);
        let err = s.ping(Duration::from_millis(30)).unwrap_err();
        assert!(err.downcast_ref::<HwError>().is_some());
    }
}

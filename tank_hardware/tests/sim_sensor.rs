use std::time::Duration;

use tank_hardware::HwError;
use tank_hardware::sim::{SimulatedSensor, echo_for_distance};
use tank_traits::EchoSensor;

const TIMEOUT: Duration = Duration::from_millis(30);

fn is_timeout(e: &tank_traits::BoxError) -> bool {
    matches!(e.downcast_ref::<HwError>(), Some(HwError::EchoTimeout))
}

#[test]
fn script_plays_before_steady_surface() {
    let mut s = SimulatedSensor::scripted([Some(10.0), None, Some(30.0)]);
    assert_eq!(s.ping(TIMEOUT).unwrap(), echo_for_distance(10.0));
    assert!(is_timeout(&s.ping(TIMEOUT).unwrap_err()));
    assert_eq!(s.ping(TIMEOUT).unwrap(), echo_for_distance(30.0));
    // settles on the last scripted distance
    assert_eq!(s.ping(TIMEOUT).unwrap(), echo_for_distance(30.0));
}

#[test]
fn dropouts_hit_every_nth_ping() {
    let mut s = SimulatedSensor::new(50.0).with_dropout_every(3);
    let results: Vec<bool> = (0..6).map(|_| s.ping(TIMEOUT).is_ok()).collect();
    assert_eq!(results, [true, true, false, true, true, false]);
}

#[test]
fn drift_moves_the_surface() {
    let mut s = SimulatedSensor::new(20.0).with_drift(1.0);
    let handle = s.distance_handle();
    for _ in 0..5 {
        s.ping(TIMEOUT).unwrap();
    }
    assert!((handle.get() - 25.0).abs() < 1e-4);
}

#[test]
fn noise_stays_within_amplitude() {
    let mut s = SimulatedSensor::new(50.0).with_noise(2.0, 42);
    let lo = echo_for_distance(48.0);
    let hi = echo_for_distance(52.0);
    for _ in 0..200 {
        let e = s.ping(TIMEOUT).unwrap();
        assert!(e >= lo && e <= hi, "echo {e:?} outside [{lo:?}, {hi:?}]");
    }
}

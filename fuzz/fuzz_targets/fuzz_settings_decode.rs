#![no_main]
use libfuzzer_sys::fuzz_target;
use tank_core::store::{LoadStatus, decode, encode};

fuzz_target!(|data: &[u8]| {
    let d = decode(data);
    let s = d.settings;

    // Whatever the image held, the result is usable.
    assert!(s.calibration.is_ordered());
    assert!((1..=50).contains(&s.filter.smoothing_window));
    assert!((1..=3600).contains(&s.filter.measurement_interval_s));

    // And it survives a save/load cycle unchanged.
    let again = decode(&encode(&s));
    assert_eq!(again.status, LoadStatus::Valid);
    assert!(again.replaced.is_empty());
    assert_eq!(again.settings, s);
});

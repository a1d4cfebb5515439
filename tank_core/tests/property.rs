use proptest::prelude::*;
use tank_core::calibration::compute;
use tank_core::filter::SmoothingFilter;
use tank_core::store::{LoadStatus, SettingsStore, decode, encode};
use tank_core::{AlertThresholds, CalibrationEndpoints, FilterConfig, Settings, TankGeometry};
use tank_hardware::MemEeprom;

prop_compose! {
    // Values are generated in the persisted units (hundredths of a cm,
    // tenths of a litre) so they survive quantization exactly.
    fn valid_settings()(
        height in 1u32..=100_000,
        diameter in 1u32..=100_000,
        volume in 1u32..=1_000_000,
        offset in 0u32..=10_000,
        empty in 1u32..=50_000,
        full_frac in 0.0f64..1.0,
        interval in 1u16..=3600,
        window in 1u8..=50,
        low in 0u8..=100,
        high in 0u8..=100,
        enabled in any::<bool>(),
    ) -> Settings {
        let full = ((f64::from(empty) * full_frac) as u32).min(empty - 1);
        Settings {
            geometry: TankGeometry {
                height_cm: height as f32 / 100.0,
                diameter_cm: diameter as f32 / 100.0,
                volume_l: volume as f32 / 10.0,
                sensor_offset_cm: offset as f32 / 100.0,
            },
            calibration: CalibrationEndpoints {
                empty_distance_cm: empty as f32 / 100.0,
                full_distance_cm: full as f32 / 100.0,
            },
            filter: FilterConfig {
                smoothing_window: window,
                measurement_interval_s: interval,
            },
            alerts: AlertThresholds {
                low_percent: low,
                high_percent: high,
                alerts_enabled: enabled,
            },
        }
    }
}

proptest! {
    #[test]
    fn percentage_is_always_within_bounds(
        distance in -1000.0f32..2000.0,
        empty in 0.01f32..500.0,
        full in 0.0f32..500.0,
    ) {
        let cal = CalibrationEndpoints { empty_distance_cm: empty, full_distance_cm: full };
        let r = compute(distance, &cal, &TankGeometry::default());
        prop_assert!((0.0..=100.0).contains(&r.percentage));
        prop_assert!((0.0..=100.0).contains(&r.level_cm));
        prop_assert!((0.0..=200.0).contains(&r.volume_l));
    }

    #[test]
    fn valid_settings_survive_the_layout(s in valid_settings()) {
        let d = decode(&encode(&s));
        prop_assert_eq!(d.status, LoadStatus::Valid);
        prop_assert!(d.replaced.is_empty());
        prop_assert_eq!(d.settings, s);
    }

    #[test]
    fn saved_settings_load_back(s in valid_settings()) {
        let medium = MemEeprom::erased(128);
        let probe = medium.reopen();
        SettingsStore::new(medium).unwrap().save(&s).unwrap();
        let report = SettingsStore::new(probe.reopen()).unwrap().load();
        prop_assert_eq!(report.status, LoadStatus::Valid);
        prop_assert_eq!(report.settings, s);
    }

    #[test]
    fn arbitrary_images_always_decode_to_valid_settings(bytes in proptest::collection::vec(any::<u8>(), 33)) {
        let d = decode(&bytes);
        let s = d.settings;
        prop_assert!(s.calibration.is_ordered());
        prop_assert!(s.geometry.height_cm > 0.0 && s.geometry.height_cm <= 1000.0);
        prop_assert!((1..=50).contains(&s.filter.smoothing_window));
        prop_assert!((1..=3600).contains(&s.filter.measurement_interval_s));
        prop_assert!(s.alerts.low_percent <= 100 && s.alerts.high_percent <= 100);
    }

    #[test]
    fn estimate_stays_within_pushed_range(
        window in 1usize..=50,
        samples in proptest::collection::vec(2.0f32..400.0, 1..200),
    ) {
        let mut f = SmoothingFilter::new(window);
        for &cm in &samples {
            prop_assert!(f.push(cm));
        }
        let tail = &samples[samples.len().saturating_sub(window)..];
        let lo = tail.iter().copied().fold(f32::INFINITY, f32::min);
        let hi = tail.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let est = f.estimate().unwrap();
        prop_assert!(est >= lo - 1e-3 && est <= hi + 1e-3, "{} not in [{}, {}]", est, lo, hi);
    }
}

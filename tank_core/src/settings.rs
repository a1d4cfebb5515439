//! Operator-tunable parameters and their validation rules.
//!
//! [`Settings`] is the single owned aggregate the monitor works from. It is
//! persisted by [`crate::store`] and changed only by calibration commands or
//! a [`SettingsUpdate`] batch.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Inclusive/exclusive bounds for every persisted field.
pub mod limits {
    pub const MAX_HEIGHT_CM: f32 = 1000.0;
    pub const MAX_DIAMETER_CM: f32 = 1000.0;
    pub const MAX_VOLUME_L: f32 = 100_000.0;
    pub const MAX_SENSOR_OFFSET_CM: f32 = 100.0;
    pub const MAX_EMPTY_DISTANCE_CM: f32 = 500.0;
    pub const INTERVAL_S: std::ops::RangeInclusive<i64> = 1..=3600;
    pub const SMOOTHING_WINDOW: std::ops::RangeInclusive<i64> = 1..=50;
    pub const PERCENT: std::ops::RangeInclusive<i64> = 0..=100;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TankGeometry {
    pub height_cm: f32,
    pub diameter_cm: f32,
    pub volume_l: f32,
    /// Transducer face to the highest liquid level. Informational only.
    pub sensor_offset_cm: f32,
}

impl Default for TankGeometry {
    fn default() -> Self {
        Self {
            height_cm: 100.0,
            diameter_cm: 50.0,
            volume_l: 200.0,
            sensor_offset_cm: 5.0,
        }
    }
}

/// Sensor-to-surface distances at the two ends of the scale.
/// Valid when `0 <= full < empty <= 500`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationEndpoints {
    pub empty_distance_cm: f32,
    pub full_distance_cm: f32,
}

impl Default for CalibrationEndpoints {
    fn default() -> Self {
        Self {
            empty_distance_cm: 95.0,
            full_distance_cm: 5.0,
        }
    }
}

impl CalibrationEndpoints {
    pub fn is_ordered(&self) -> bool {
        self.full_distance_cm < self.empty_distance_cm
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub smoothing_window: u8,
    pub measurement_interval_s: u16,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            smoothing_window: 5,
            measurement_interval_s: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertThresholds {
    pub low_percent: u8,
    pub high_percent: u8,
    pub alerts_enabled: bool,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            low_percent: 10,
            high_percent: 90,
            alerts_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Settings {
    pub geometry: TankGeometry,
    pub calibration: CalibrationEndpoints,
    pub filter: FilterConfig,
    pub alerts: AlertThresholds,
}

/// Names of the individually validated settings, as used by the update
/// layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Field {
    TankHeight,
    TankDiameter,
    TankVolume,
    SensorOffset,
    EmptyDistance,
    FullDistance,
    MeasurementInterval,
    ReadingSmoothing,
    AlertLevelLow,
    AlertLevelHigh,
    AlertsEnabled,
}

impl Field {
    pub const ALL: [Field; 11] = [
        Field::TankHeight,
        Field::TankDiameter,
        Field::TankVolume,
        Field::SensorOffset,
        Field::EmptyDistance,
        Field::FullDistance,
        Field::MeasurementInterval,
        Field::ReadingSmoothing,
        Field::AlertLevelLow,
        Field::AlertLevelHigh,
        Field::AlertsEnabled,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Field::TankHeight => "tankHeight",
            Field::TankDiameter => "tankDiameter",
            Field::TankVolume => "tankVolume",
            Field::SensorOffset => "sensorOffset",
            Field::EmptyDistance => "emptyDistance",
            Field::FullDistance => "fullDistance",
            Field::MeasurementInterval => "measurementInterval",
            Field::ReadingSmoothing => "readingSmoothing",
            Field::AlertLevelLow => "alertLevelLow",
            Field::AlertLevelHigh => "alertLevelHigh",
            Field::AlertsEnabled => "alertsEnabled",
        }
    }

    pub fn from_key(key: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.key() == key)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

type Check = Result<(), &'static str>;

fn check_positive_up_to(v: f32, max: f32, msg: &'static str) -> Check {
    if v.is_finite() && v > 0.0 && v <= max {
        Ok(())
    } else {
        Err(msg)
    }
}

pub(crate) fn check_height(v: f32) -> Check {
    check_positive_up_to(v, limits::MAX_HEIGHT_CM, "must be in (0, 1000] cm")
}

pub(crate) fn check_diameter(v: f32) -> Check {
    check_positive_up_to(v, limits::MAX_DIAMETER_CM, "must be in (0, 1000] cm")
}

pub(crate) fn check_volume(v: f32) -> Check {
    check_positive_up_to(v, limits::MAX_VOLUME_L, "must be in (0, 100000] L")
}

pub(crate) fn check_sensor_offset(v: f32) -> Check {
    if v.is_finite() && (0.0..=limits::MAX_SENSOR_OFFSET_CM).contains(&v) {
        Ok(())
    } else {
        Err("must be in [0, 100] cm")
    }
}

pub(crate) fn check_empty(v: f32) -> Check {
    check_positive_up_to(v, limits::MAX_EMPTY_DISTANCE_CM, "must be in (0, 500] cm")
}

pub(crate) fn check_full(v: f32) -> Check {
    if v.is_finite() && (0.0..limits::MAX_EMPTY_DISTANCE_CM).contains(&v) {
        Ok(())
    } else {
        Err("must be in [0, 500) cm")
    }
}

fn check_int(v: i64, range: std::ops::RangeInclusive<i64>, msg: &'static str) -> Check {
    if range.contains(&v) { Ok(()) } else { Err(msg) }
}

impl Settings {
    /// Replace every out-of-range field with its default, then repair the
    /// endpoint ordering. Returns the fields that were replaced.
    pub fn sanitize(&mut self) -> Vec<Field> {
        let d = Settings::default();
        let mut replaced = Vec::new();

        let g = &mut self.geometry;
        if check_height(g.height_cm).is_err() {
            g.height_cm = d.geometry.height_cm;
            replaced.push(Field::TankHeight);
        }
        if check_diameter(g.diameter_cm).is_err() {
            g.diameter_cm = d.geometry.diameter_cm;
            replaced.push(Field::TankDiameter);
        }
        if check_volume(g.volume_l).is_err() {
            g.volume_l = d.geometry.volume_l;
            replaced.push(Field::TankVolume);
        }
        if check_sensor_offset(g.sensor_offset_cm).is_err() {
            g.sensor_offset_cm = d.geometry.sensor_offset_cm;
            replaced.push(Field::SensorOffset);
        }

        let c = &mut self.calibration;
        if check_empty(c.empty_distance_cm).is_err() {
            c.empty_distance_cm = d.calibration.empty_distance_cm;
            replaced.push(Field::EmptyDistance);
        }
        if check_full(c.full_distance_cm).is_err() {
            c.full_distance_cm = d.calibration.full_distance_cm;
            replaced.push(Field::FullDistance);
        }
        if !c.is_ordered() {
            if !replaced.contains(&Field::FullDistance) {
                replaced.push(Field::FullDistance);
            }
            c.full_distance_cm = d.calibration.full_distance_cm;
            if !c.is_ordered() {
                c.empty_distance_cm = d.calibration.empty_distance_cm;
                if !replaced.contains(&Field::EmptyDistance) {
                    replaced.push(Field::EmptyDistance);
                }
            }
        }

        let f = &mut self.filter;
        if !limits::INTERVAL_S.contains(&i64::from(f.measurement_interval_s)) {
            f.measurement_interval_s = d.filter.measurement_interval_s;
            replaced.push(Field::MeasurementInterval);
        }
        if !limits::SMOOTHING_WINDOW.contains(&i64::from(f.smoothing_window)) {
            f.smoothing_window = d.filter.smoothing_window;
            replaced.push(Field::ReadingSmoothing);
        }

        let a = &mut self.alerts;
        if !limits::PERCENT.contains(&i64::from(a.low_percent)) {
            a.low_percent = d.alerts.low_percent;
            replaced.push(Field::AlertLevelLow);
        }
        if !limits::PERCENT.contains(&i64::from(a.high_percent)) {
            a.high_percent = d.alerts.high_percent;
            replaced.push(Field::AlertLevelHigh);
        }

        replaced
    }
}

/// A refused field in an update batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub key: String,
    pub reason: String,
}

/// Outcome of [`SettingsUpdate::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub accepted: Vec<Field>,
    pub rejected: Vec<Rejection>,
}

impl UpdateReport {
    pub fn changed(&self) -> bool {
        !self.accepted.is_empty()
    }

    fn reject(&mut self, key: impl Into<String>, reason: impl Into<String>) {
        self.rejected.push(Rejection {
            key: key.into(),
            reason: reason.into(),
        });
    }
}

/// A batch of optional setting changes. Integer fields are wide so that a
/// negative or oversized request is reported as out of range rather than
/// failing to parse.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub tank_height: Option<f32>,
    pub tank_diameter: Option<f32>,
    pub tank_volume: Option<f32>,
    pub sensor_offset: Option<f32>,
    pub empty_distance: Option<f32>,
    pub full_distance: Option<f32>,
    pub measurement_interval: Option<i64>,
    pub reading_smoothing: Option<i64>,
    pub alert_level_low: Option<i64>,
    pub alert_level_high: Option<i64>,
    pub alerts_enabled: Option<bool>,
    /// Keys that could not be parsed at all.
    #[serde(skip)]
    pub unparsed: Vec<Rejection>,
}

impl SettingsUpdate {
    /// Build a batch from textual `key=value` pairs. Unknown keys and
    /// unparsable values are kept and reported by `apply`.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut u = SettingsUpdate::default();
        for (key, value) in pairs {
            let (key, value) = (key.trim(), value.trim());
            let Some(field) = Field::from_key(key) else {
                u.unparsed.push(Rejection {
                    key: key.to_string(),
                    reason: "unknown setting".to_string(),
                });
                continue;
            };
            if let Err(reason) = u.set_text(field, value) {
                u.unparsed.push(Rejection {
                    key: key.to_string(),
                    reason,
                });
            }
        }
        u
    }

    fn set_text(&mut self, field: Field, value: &str) -> Result<(), String> {
        let float = || {
            value
                .parse::<f32>()
                .map_err(|_| format!("'{value}' is not a number"))
        };
        let int = || {
            value
                .parse::<i64>()
                .map_err(|_| format!("'{value}' is not an integer"))
        };
        match field {
            Field::TankHeight => self.tank_height = Some(float()?),
            Field::TankDiameter => self.tank_diameter = Some(float()?),
            Field::TankVolume => self.tank_volume = Some(float()?),
            Field::SensorOffset => self.sensor_offset = Some(float()?),
            Field::EmptyDistance => self.empty_distance = Some(float()?),
            Field::FullDistance => self.full_distance = Some(float()?),
            Field::MeasurementInterval => self.measurement_interval = Some(int()?),
            Field::ReadingSmoothing => self.reading_smoothing = Some(int()?),
            Field::AlertLevelLow => self.alert_level_low = Some(int()?),
            Field::AlertLevelHigh => self.alert_level_high = Some(int()?),
            Field::AlertsEnabled => self.alerts_enabled = Some(matches!(value, "true" | "1")),
        }
        Ok(())
    }

    /// Validate each present field independently and write the accepted
    /// ones into `settings`.
    ///
    /// Endpoints go empty-first: a new `fullDistance` must sit below the
    /// effective `emptyDistance`, and a new `emptyDistance` must stay above
    /// the effective `fullDistance`.
    pub fn apply(&self, settings: &mut Settings) -> UpdateReport {
        let mut report = UpdateReport {
            accepted: Vec::new(),
            rejected: self.unparsed.clone(),
        };

        macro_rules! float_field {
            ($opt:expr, $field:expr, $check:expr, $target:expr) => {
                if let Some(v) = $opt {
                    match $check(v) {
                        Ok(()) => {
                            $target = v;
                            report.accepted.push($field);
                        }
                        Err(reason) => report.reject($field.key(), reason),
                    }
                }
            };
        }

        float_field!(
            self.tank_height,
            Field::TankHeight,
            check_height,
            settings.geometry.height_cm
        );
        float_field!(
            self.tank_diameter,
            Field::TankDiameter,
            check_diameter,
            settings.geometry.diameter_cm
        );
        float_field!(
            self.tank_volume,
            Field::TankVolume,
            check_volume,
            settings.geometry.volume_l
        );
        float_field!(
            self.sensor_offset,
            Field::SensorOffset,
            check_sensor_offset,
            settings.geometry.sensor_offset_cm
        );

        self.apply_endpoints(settings, &mut report);

        if let Some(v) = self.measurement_interval {
            match check_int(v, limits::INTERVAL_S, "must be in [1, 3600] s") {
                Ok(()) => {
                    settings.filter.measurement_interval_s = v as u16;
                    report.accepted.push(Field::MeasurementInterval);
                }
                Err(reason) => report.reject(Field::MeasurementInterval.key(), reason),
            }
        }
        if let Some(v) = self.reading_smoothing {
            match check_int(v, limits::SMOOTHING_WINDOW, "must be in [1, 50]") {
                Ok(()) => {
                    settings.filter.smoothing_window = v as u8;
                    report.accepted.push(Field::ReadingSmoothing);
                }
                Err(reason) => report.reject(Field::ReadingSmoothing.key(), reason),
            }
        }
        if let Some(v) = self.alert_level_low {
            match check_int(v, limits::PERCENT, "must be in [0, 100] %") {
                Ok(()) => {
                    settings.alerts.low_percent = v as u8;
                    report.accepted.push(Field::AlertLevelLow);
                }
                Err(reason) => report.reject(Field::AlertLevelLow.key(), reason),
            }
        }
        if let Some(v) = self.alert_level_high {
            match check_int(v, limits::PERCENT, "must be in [0, 100] %") {
                Ok(()) => {
                    settings.alerts.high_percent = v as u8;
                    report.accepted.push(Field::AlertLevelHigh);
                }
                Err(reason) => report.reject(Field::AlertLevelHigh.key(), reason),
            }
        }
        if let Some(v) = self.alerts_enabled {
            settings.alerts.alerts_enabled = v;
            report.accepted.push(Field::AlertsEnabled);
        }

        report
    }

    fn apply_endpoints(&self, settings: &mut Settings, report: &mut UpdateReport) {
        let current = settings.calibration;

        let mut empty = None;
        if let Some(v) = self.empty_distance {
            match check_empty(v) {
                Ok(()) => empty = Some(v),
                Err(reason) => report.reject(Field::EmptyDistance.key(), reason),
            }
        }
        let mut full = None;
        if let Some(v) = self.full_distance {
            match check_full(v) {
                Ok(()) => full = Some(v),
                Err(reason) => report.reject(Field::FullDistance.key(), reason),
            }
        }

        let effective_empty = empty.unwrap_or(current.empty_distance_cm);
        if let Some(v) = full
            && v >= effective_empty
        {
            report.reject(Field::FullDistance.key(), "must be below emptyDistance");
            full = None;
        }
        let effective_full = full.unwrap_or(current.full_distance_cm);
        if let Some(v) = empty
            && v <= effective_full
        {
            report.reject(Field::EmptyDistance.key(), "must be above fullDistance");
            empty = None;
        }

        if let Some(v) = empty {
            settings.calibration.empty_distance_cm = v;
            report.accepted.push(Field::EmptyDistance);
        }
        if let Some(v) = full {
            settings.calibration.full_distance_cm = v;
            report.accepted.push(Field::FullDistance);
        }
    }
}

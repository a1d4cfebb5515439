use serde::Serialize;

/// What external readers see after each tick.
///
/// Numeric fields keep their previous values when a tick produces no
/// estimate; `tick` and the raw fields always move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MeasurementSnapshot {
    pub tick: u64,
    /// Median of the last tick's pings was usable.
    pub raw_valid: bool,
    pub raw_distance_cm: Option<f32>,
    /// Smoothed distance the numbers below were computed from.
    pub distance_cm: Option<f32>,
    pub percentage: f32,
    pub level_cm: f32,
    pub volume_l: f32,
    pub low_alert: bool,
    pub high_alert: bool,
}

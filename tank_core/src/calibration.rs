//! Distance to fill level.
//!
//! Two operator-recorded distances anchor a linear scale: `empty` (sensor to
//! the bottom of an empty tank) and `full` (sensor to the surface when
//! full). Everything between is interpolated, everything outside is clamped.

use serde::Serialize;

use crate::fixed_point::round_tenth;
use crate::settings::{CalibrationEndpoints, TankGeometry};

/// Allowed mismatch between configured and cylinder-derived volume.
pub const VOLUME_TOLERANCE: f32 = 0.20;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LevelReading {
    pub percentage: f32,
    pub level_cm: f32,
    pub volume_l: f32,
}

/// Fraction full in `[0, 1]`. Mis-ordered endpoints never divide by zero.
fn fill_fraction(distance_cm: f32, cal: &CalibrationEndpoints) -> f32 {
    let empty = cal.empty_distance_cm;
    let full = cal.full_distance_cm;
    if distance_cm > empty {
        return 0.0;
    }
    if distance_cm < full {
        return 1.0;
    }
    let range = empty - full;
    if range <= 0.0 {
        return 0.0;
    }
    ((empty - distance_cm) / range).clamp(0.0, 1.0)
}

/// Map a smoothed distance to percentage, level and volume, each rounded to
/// one decimal.
pub fn compute(
    distance_cm: f32,
    cal: &CalibrationEndpoints,
    geometry: &TankGeometry,
) -> LevelReading {
    let fraction = fill_fraction(distance_cm, cal);
    LevelReading {
        percentage: round_tenth(fraction * 100.0),
        level_cm: round_tenth(fraction * geometry.height_cm),
        volume_l: round_tenth(fraction * geometry.volume_l),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Endpoint {
    Empty,
    Full,
}

impl std::str::FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "empty" => Ok(Endpoint::Empty),
            "full" => Ok(Endpoint::Full),
            other => Err(format!("unknown calibration type '{other}' (expected empty|full)")),
        }
    }
}

/// Overwrite one endpoint. No validation: returns whether the endpoints are
/// still ordered so the caller can warn. Mis-ordering is repaired on the
/// next load.
pub fn record_endpoint(cal: &mut CalibrationEndpoints, endpoint: Endpoint, distance_cm: f32) -> bool {
    match endpoint {
        Endpoint::Empty => cal.empty_distance_cm = distance_cm,
        Endpoint::Full => cal.full_distance_cm = distance_cm,
    }
    cal.is_ordered()
}

/// Volume of a vertical cylinder with the configured dimensions, in litres.
pub fn cylinder_volume_litres(geometry: &TankGeometry) -> f32 {
    let r = geometry.diameter_cm / 2.0;
    std::f32::consts::PI * r * r * geometry.height_cm / 1000.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VolumeMismatch {
    pub configured_l: f32,
    pub cylinder_l: f32,
}

/// Sanity check of configured volume against the cylinder estimate. A
/// mismatch beyond [`VOLUME_TOLERANCE`] of the cylinder volume is reported;
/// it is a hint, not an error (the tank may not be cylindrical).
pub fn cross_check_volume(geometry: &TankGeometry) -> Option<VolumeMismatch> {
    let cylinder = cylinder_volume_litres(geometry);
    if (cylinder - geometry.volume_l).abs() > cylinder * VOLUME_TOLERANCE {
        Some(VolumeMismatch {
            configured_l: geometry.volume_l,
            cylinder_l: cylinder,
        })
    } else {
        None
    }
}

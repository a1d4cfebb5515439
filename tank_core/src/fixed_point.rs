//! Fixed-point helpers for the persisted settings layout and for the
//! one-decimal outputs of the calibration engine.

/// Scale for dimensions and distances: hundredths of a centimetre.
pub const DIMENSION_SCALE: f32 = 100.0;
/// Scale for volume: tenths of a litre.
pub const VOLUME_SCALE: f32 = 10.0;

/// Round to one decimal place, halves away from zero. Non-finite input maps to 0.
#[inline]
pub fn round_tenth(x: f32) -> f32 {
    if !x.is_finite() {
        return 0.0;
    }
    (x * 10.0).round() / 10.0
}

/// Quantize a non-negative value to `scale` units, rounding to nearest and
/// clamping to the `u32` range. Negative and non-finite values map to 0.
#[inline]
pub fn quantize_u32(x: f32, scale: f32) -> u32 {
    if !x.is_finite() || x <= 0.0 {
        return 0;
    }
    let scaled = f64::from(x) * f64::from(scale);
    let scaled = scaled.round();
    if scaled >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        scaled as u32
    }
}

/// Inverse of [`quantize_u32`].
#[inline]
pub fn dequantize_u32(raw: u32, scale: f32) -> f32 {
    raw as f32 / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_tenth_is_half_away_from_zero() {
        assert_eq!(round_tenth(33.25), 33.3);
        assert_eq!(round_tenth(-0.25), -0.3);
        assert_eq!(round_tenth(49.99), 50.0);
        assert_eq!(round_tenth(f32::NAN), 0.0);
    }

    #[test]
    fn quantize_clamps_and_rejects_garbage() {
        assert_eq!(quantize_u32(-3.0, DIMENSION_SCALE), 0);
        assert_eq!(quantize_u32(f32::INFINITY, DIMENSION_SCALE), 0);
        assert_eq!(quantize_u32(1e30, DIMENSION_SCALE), u32::MAX);
    }

    #[test]
    fn quantize_round_trips_hundredths() {
        for hundredths in [1u32, 5, 12_345, 100_000] {
            let v = hundredths as f32 / DIMENSION_SCALE;
            assert_eq!(quantize_u32(v, DIMENSION_SCALE), hundredths);
            assert_eq!(dequantize_u32(hundredths, DIMENSION_SCALE), v);
        }
    }
}

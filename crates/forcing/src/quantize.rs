//! Lossy 16-bit fixed-point packing of floating-point fields.
//!
//! Each field gets its own `scale_factor`/`add_offset` from the range
//! observed in the current file. The minimum `i16` is reserved as the
//! missing-value sentinel; finite samples encode into
//! `[RANGE_MIN, RANGE_MAX]` and decode with `stored * scale + offset`
//! within `scale_factor / 2` of the original.

use tracing::warn;

use crate::error::{ForcingError, Result};
use crate::grid::min_max;

/// Sentinel for missing samples.
pub const MISSING_VALUE: i16 = i16::MIN;
/// Smallest code of a finite sample.
pub const RANGE_MIN: i16 = MISSING_VALUE + 1;
/// Largest code of a finite sample.
pub const RANGE_MAX: i16 = i16::MAX;
/// Number of steps between `RANGE_MIN` and `RANGE_MAX`.
pub const INT_RANGE: i32 = RANGE_MAX as i32 - RANGE_MIN as i32;

/// Packing parameters of one field in one file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantizationParams {
    pub scale_factor: f64,
    pub add_offset: f64,
    pub missing_value: i16,
    pub valid_min: f64,
    pub valid_max: f64,
    /// The field is constant; every finite sample encodes to 0.
    pub degenerate: bool,
}

impl QuantizationParams {
    /// Derive parameters from an observed range.
    ///
    /// A constant field (`min == max`) uses a unit scale with the offset at
    /// the constant, so it still decodes exactly.
    pub fn compute(data_min: f64, data_max: f64) -> Self {
        let span = data_max - data_min;
        if span == 0.0 {
            return Self {
                scale_factor: 1.0,
                add_offset: data_min,
                missing_value: MISSING_VALUE,
                valid_min: data_min,
                valid_max: data_max,
                degenerate: true,
            };
        }

        Self {
            scale_factor: span / f64::from(INT_RANGE),
            add_offset: data_min + span / 2.0,
            missing_value: MISSING_VALUE,
            valid_min: data_min,
            valid_max: data_max,
            degenerate: false,
        }
    }

    /// Derive parameters from the finite samples of a field.
    pub fn from_values(field: &str, values: &[f64]) -> Result<Self> {
        let (min, max) = min_max(values).ok_or_else(|| ForcingError::NoValidData {
            field: field.to_string(),
        })?;

        let params = Self::compute(min, max);
        if params.degenerate {
            warn!(
                field = field,
                value = min,
                "Constant field, quantizing with unit scale"
            );
        }
        Ok(params)
    }

    /// Encode one sample. Non-finite input maps to the sentinel.
    pub fn encode(&self, value: f64) -> i16 {
        let scaled = ((value - self.add_offset) / self.scale_factor).round();
        if !scaled.is_finite() {
            return self.missing_value;
        }
        scaled.clamp(f64::from(RANGE_MIN), f64::from(RANGE_MAX)) as i16
    }

    /// Decode one stored code. The sentinel decodes to `NaN`.
    pub fn decode(&self, stored: i16) -> f64 {
        if stored == self.missing_value {
            f64::NAN
        } else {
            f64::from(stored) * self.scale_factor + self.add_offset
        }
    }
}

/// Encode a whole field.
pub fn quantize(values: &[f64], params: &QuantizationParams) -> Vec<i16> {
    values.iter().map(|v| params.encode(*v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(min: f64, max: f64, n: usize) -> Vec<f64> {
        // Irregular spacing so samples fall between codes.
        (0..n)
            .map(|i| {
                let t = (i as f64 * 0.618_033_988_75).fract();
                min + t * (max - min)
            })
            .chain([min, max])
            .collect()
    }

    #[test]
    fn test_constants() {
        assert_eq!(MISSING_VALUE, -32768);
        assert_eq!(RANGE_MIN, -32767);
        assert_eq!(INT_RANGE, 65534);
    }

    #[test]
    fn test_round_trip_within_half_step() {
        for (min, max) in [(950.0, 1050.0), (-2.5, 1.75), (0.0, 1e-3), (-40.0, 45.0)] {
            let values = samples(min, max, 5000);
            let params = QuantizationParams::from_values("f", &values).unwrap();
            let bound = params.scale_factor / 2.0 * (1.0 + 1e-9);

            for v in &values {
                let stored = params.encode(*v);
                assert_ne!(stored, MISSING_VALUE);
                let err = (params.decode(stored) - v).abs();
                assert!(err <= bound, "{} -> {} err {} > {}", v, stored, err, bound);
            }
        }
    }

    #[test]
    fn test_extremes_use_full_range() {
        let params = QuantizationParams::compute(-10.0, 30.0);
        assert_eq!(params.add_offset, 10.0);
        assert_eq!(params.encode(-10.0), RANGE_MIN);
        assert_eq!(params.encode(30.0), RANGE_MAX);
        assert_eq!(params.encode(10.0), 0);
    }

    #[test]
    fn test_nan_maps_to_sentinel() {
        let params = QuantizationParams::compute(0.0, 1.0);
        let stored = quantize(&[f64::NAN, 0.0, 1.0, f64::NAN], &params);
        assert_eq!(stored[0], MISSING_VALUE);
        assert_eq!(stored[3], MISSING_VALUE);
        assert!(stored[1..3].iter().all(|s| *s != MISSING_VALUE));
        assert!(params.decode(MISSING_VALUE).is_nan());
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let params = QuantizationParams::compute(0.0, 1.0);
        assert_eq!(params.encode(5.0), RANGE_MAX);
        assert_eq!(params.encode(-5.0), RANGE_MIN);
    }

    #[test]
    fn test_degenerate_range() {
        let values = vec![7.25; 10];
        let params = QuantizationParams::from_values("wdir", &values).unwrap();
        assert!(params.degenerate);
        assert_eq!(params.scale_factor, 1.0);
        assert_eq!(params.valid_min, 7.25);
        assert_eq!(params.valid_max, 7.25);

        let stored = quantize(&values, &params);
        assert!(stored.iter().all(|s| *s == 0));
        assert_eq!(params.decode(0), 7.25);
    }

    #[test]
    fn test_all_missing_field() {
        let values = vec![f64::NAN; 4];
        assert!(matches!(
            QuantizationParams::from_values("psal", &values),
            Err(ForcingError::NoValidData { .. })
        ));
    }
}

//! Generators for synthetic provider axes and fields.
//!
//! Fields are row-major `Vec<f64>` over `(time, [depth,] lat, lon)` with
//! values that follow simple, checkable patterns.

/// A regular axis: `start, start + step, ...` with `count` points.
///
/// # Example
///
/// ```
/// use test_utils::regular_axis;
///
/// assert_eq!(regular_axis(18.0, 0.5, 3), vec![18.0, 18.5, 19.0]);
/// ```
pub fn regular_axis(start: f64, step: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| start + step * i as f64).collect()
}

/// Surface pressure in Pa, varying smoothly with latitude and longitude.
///
/// Values stay within 98_000..104_000 Pa.
pub fn pressure_field(nt: usize, lat: &[f64], lon: &[f64]) -> Vec<f64> {
    let mut data = Vec::with_capacity(nt * lat.len() * lon.len());
    for t in 0..nt {
        for la in lat {
            for lo in lon {
                let p = 101_000.0 + 2000.0 * (la.to_radians()).cos() * (lo.to_radians()).sin()
                    + 100.0 * t as f64;
                data.push(p.round());
            }
        }
    }
    data
}

/// Air temperature in Kelvin, warm at the equator.
pub fn temperature_kelvin_field(nt: usize, lat: &[f64], lon: &[f64]) -> Vec<f64> {
    let mut data = Vec::with_capacity(nt * lat.len() * lon.len());
    for t in 0..nt {
        for la in lat {
            for _ in lon {
                data.push(300.0 - 0.5 * la.abs() + 0.25 * t as f64);
            }
        }
    }
    data
}

/// A wind-like component in m/s, linear in longitude.
pub fn wind_component_field(nt: usize, lat: &[f64], lon: &[f64], scale: f64) -> Vec<f64> {
    let mut data = Vec::with_capacity(nt * lat.len() * lon.len());
    for _ in 0..nt {
        for _ in lat {
            for lo in lon {
                data.push(scale * (lo.to_radians()).cos());
            }
        }
    }
    data
}

/// A 4-D ocean field over `(time, depth, lat, lon)`: `base` decreasing
/// with depth, plus a small horizontal gradient.
pub fn ocean_field(nt: usize, depth: &[f64], lat: &[f64], lon: &[f64], base: f64) -> Vec<f64> {
    let mut data = Vec::with_capacity(nt * depth.len() * lat.len() * lon.len());
    for _ in 0..nt {
        for d in depth {
            for (j, _) in lat.iter().enumerate() {
                for (i, _) in lon.iter().enumerate() {
                    data.push(base - 0.01 * d + 0.001 * (j * lon.len() + i) as f64);
                }
            }
        }
    }
    data
}

/// Replace every `stride`-th value with `NaN`.
pub fn with_gaps(mut values: Vec<f64>, stride: usize) -> Vec<f64> {
    if stride > 0 {
        values.iter_mut().step_by(stride).for_each(|v| *v = f64::NAN);
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_axis_descending() {
        let lat = regular_axis(40.0, -0.5, 5);
        assert_eq!(lat, vec![40.0, 39.5, 39.0, 38.5, 38.0]);
    }

    #[test]
    fn test_pressure_range() {
        let lat = regular_axis(-90.0, 10.0, 19);
        let lon = regular_axis(0.0, 10.0, 36);
        let p = pressure_field(2, &lat, &lon);
        assert_eq!(p.len(), 2 * 19 * 36);
        assert!(p.iter().all(|v| (98_000.0..=104_000.0).contains(v)));
    }

    #[test]
    fn test_ocean_field_layout() {
        let depth = [0.5, 10.0];
        let lat = [0.0, 1.0];
        let lon = [0.0, 1.0, 2.0];
        let f = ocean_field(1, &depth, &lat, &lon, 20.0);
        assert_eq!(f.len(), 12);
        assert!(f[0] > f[6]);
    }

    #[test]
    fn test_with_gaps() {
        let v = with_gaps(vec![1.0; 5], 2);
        assert!(v[0].is_nan());
        assert_eq!(v[1], 1.0);
        assert!(v[4].is_nan());
    }
}

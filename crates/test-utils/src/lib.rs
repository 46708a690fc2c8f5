//! Shared test utilities for the spill-forcing workspace.
//!
//! - `generators`: regular axes and smooth synthetic fields
//! - `fixtures`: bounding boxes and provider time encodings
//! - `nc_files`: GFS- and CMEMS-like NetCDF files written on the fly
//!
//! Pulled in as a dev-dependency:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod fixtures;
pub mod generators;
pub mod nc_files;

pub use fixtures::*;
pub use generators::*;
pub use nc_files::*;

/// Describe why `left` and `right` are not within `tolerance`, or `None`
/// when they are. Two `NaN`s compare equal: a missing sample that stays
/// missing is a match.
pub fn approx_mismatch(left: f64, right: f64, tolerance: f64) -> Option<String> {
    if left.is_nan() && right.is_nan() {
        return None;
    }
    let diff = (left - right).abs();
    if diff <= tolerance {
        None
    } else {
        Some(format!(
            "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > tolerance `{:?}`",
            left, right, diff, tolerance
        ))
    }
}

/// Assert two numbers are within a tolerance, with an optional context
/// message in `format!` syntax.
///
/// ```ignore
/// assert_approx_eq!(pmsl, pres / 100.0, scale / 2.0);
/// assert_approx_eq!(pmsl, pres / 100.0, scale / 2.0, "at lat {} lon {}", la, lo);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $tolerance:expr $(,)?) => {{
        if let Some(msg) = $crate::approx_mismatch($left as f64, $right as f64, $tolerance as f64) {
            panic!("{}", msg);
        }
    }};
    ($left:expr, $right:expr, $tolerance:expr, $($context:tt)+) => {{
        if let Some(msg) = $crate::approx_mismatch($left as f64, $right as f64, $tolerance as f64) {
            panic!("{}\n context: {}", msg, format!($($context)+));
        }
    }};
}

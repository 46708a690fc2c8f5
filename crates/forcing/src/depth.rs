//! Depth synthesis for surface-only ocean products.
//!
//! The source has no vertical structure, so each field is declared valid at
//! every requested level: values are duplicated, never interpolated.

use crate::error::{ForcingError, Result};
use crate::grid::Field;
use crate::ontology::axis;
use crate::registry::DepthSynthesisSpec;

/// Broadcast a depth-less field across `spec.output_levels`.
///
/// The new `depth` axis is inserted immediately before `latitude`, so
/// `(lat, lon)` becomes `(depth, lat, lon)` and `(time, lat, lon)` becomes
/// `(time, depth, lat, lon)`. Levels keep their listed order.
pub fn synthesize_depth(name: &str, field: &Field, spec: &DepthSynthesisSpec) -> Result<Field> {
    if field.axis(axis::DEPTH).is_some() {
        return Err(ForcingError::shape_mismatch(format!(
            "{} already has a depth axis, cannot synthesize another",
            name
        )));
    }

    let position = field.axis(axis::LATITUDE).ok_or_else(|| ForcingError::MissingCoordinate {
        field: name.to_string(),
        axis: axis::LATITUDE.to_string(),
    })?;

    field.insert_replicated_axis(position, axis::DEPTH, spec.output_levels.len())
}

//! Geographic subsetting with seam-aware longitude selection.
//!
//! Selection works on coordinate values, not on index arithmetic: every
//! latitude inside `[lat_min, lat_max]` is kept in source order, so
//! descending latitude axes need no special case. Longitude is selected the
//! same way unless the box crosses the seam, in which case the part east of
//! `lon_min` comes first and the part west of `lon_max` is appended.

use tracing::debug;

use crate::error::{ForcingError, Result};
use crate::grid::{BoundingBox, Field, Grid};
use crate::ontology::axis;

/// Indices and coordinate values kept by a bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct SubsetSelection {
    pub lat_indices: Vec<usize>,
    pub lon_indices: Vec<usize>,
    pub latitude: Vec<f64>,
    pub longitude: Vec<f64>,
}

impl SubsetSelection {
    /// Compute the selection of `bbox` on the given coordinate axes.
    ///
    /// An empty intersection on either axis is an error.
    pub fn compute(latitude: &[f64], longitude: &[f64], bbox: &BoundingBox) -> Result<Self> {
        let lat_indices = latitude_indices(latitude, bbox.lat_min, bbox.lat_max);
        if lat_indices.is_empty() {
            return Err(ForcingError::EmptySelection {
                axis: axis::LATITUDE.to_string(),
                min: bbox.lat_min,
                max: bbox.lat_max,
            });
        }

        let lon_indices = longitude_indices(longitude, bbox.lon_min, bbox.lon_max);
        if lon_indices.is_empty() {
            return Err(ForcingError::EmptySelection {
                axis: axis::LONGITUDE.to_string(),
                min: bbox.lon_min,
                max: bbox.lon_max,
            });
        }

        debug!(
            lat_points = lat_indices.len(),
            lon_points = lon_indices.len(),
            crosses_seam = bbox.crosses_seam(),
            "Computed subset selection"
        );

        Ok(Self {
            latitude: lat_indices.iter().map(|&i| latitude[i]).collect(),
            longitude: lon_indices.iter().map(|&i| longitude[i]).collect(),
            lat_indices,
            lon_indices,
        })
    }

    /// Restrict a field to the selection. Other axes are left unchanged.
    pub fn apply_field(&self, name: &str, field: &Field) -> Result<Field> {
        let lat_axis = field.axis(axis::LATITUDE).ok_or_else(|| ForcingError::MissingCoordinate {
            field: name.to_string(),
            axis: axis::LATITUDE.to_string(),
        })?;
        let lon_axis = field.axis(axis::LONGITUDE).ok_or_else(|| ForcingError::MissingCoordinate {
            field: name.to_string(),
            axis: axis::LONGITUDE.to_string(),
        })?;

        field
            .select(lat_axis, &self.lat_indices)?
            .select(lon_axis, &self.lon_indices)
    }
}

/// Indices of latitudes inside `[min, max]`, in source order.
pub fn latitude_indices(latitude: &[f64], min: f64, max: f64) -> Vec<usize> {
    latitude
        .iter()
        .enumerate()
        .filter(|(_, lat)| **lat >= min && **lat <= max)
        .map(|(i, _)| i)
        .collect()
}

/// Indices of longitudes inside the range, handling seam crossing.
///
/// With `min > max` the result is `[min, +inf)` followed by `(-inf, max]`.
pub fn longitude_indices(longitude: &[f64], min: f64, max: f64) -> Vec<usize> {
    let within = |pred: &dyn Fn(f64) -> bool| -> Vec<usize> {
        longitude
            .iter()
            .enumerate()
            .filter(|(_, lon)| pred(**lon))
            .map(|(i, _)| i)
            .collect()
    };

    if min <= max {
        within(&|lon| lon >= min && lon <= max)
    } else {
        let mut indices = within(&|lon| lon >= min);
        indices.extend(within(&|lon| lon <= max));
        indices
    }
}

/// Subset every field of a grid to a bounding box.
pub fn subset(grid: &Grid, bbox: &BoundingBox) -> Result<Grid> {
    let latitude = grid.coord(axis::LATITUDE).ok_or_else(|| ForcingError::MissingCoordinate {
        field: "grid".to_string(),
        axis: axis::LATITUDE.to_string(),
    })?;
    let longitude = grid.coord(axis::LONGITUDE).ok_or_else(|| ForcingError::MissingCoordinate {
        field: "grid".to_string(),
        axis: axis::LONGITUDE.to_string(),
    })?;

    let selection = SubsetSelection::compute(latitude, longitude, bbox)?;

    let mut out = Grid {
        coords: grid.coords.clone(),
        fields: Vec::with_capacity(grid.fields.len()),
    };
    out.coords
        .insert(axis::LATITUDE.to_string(), selection.latitude.clone());
    out.coords
        .insert(axis::LONGITUDE.to_string(), selection.longitude.clone());

    for (name, field) in &grid.fields {
        out.fields
            .push((name.clone(), selection.apply_field(name, field)?));
    }

    Ok(out)
}

//! Core grid types: bounding boxes, labelled fields and in-memory grids.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ForcingError, Result};

/// A geographic bounding box in degrees.
///
/// `lon_min > lon_max` describes a box that crosses the longitude seam of
/// the grid convention it is expressed in (e.g. 350 -> 10 on a 0..360 grid).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

impl BoundingBox {
    /// Create a new bounding box (argument order follows the CLI).
    pub fn new(lon_min: f64, lon_max: f64, lat_min: f64, lat_max: f64) -> Self {
        Self {
            lon_min,
            lon_max,
            lat_min,
            lat_max,
        }
    }

    /// Check if the longitude range wraps across the seam.
    pub fn crosses_seam(&self) -> bool {
        self.lon_min > self.lon_max
    }

    /// Convert signed (-180..180) longitudes to the 0..360 convention.
    ///
    /// A box that is contiguous in -180..180 but straddles 0 becomes a
    /// seam-crossing box in 0..360.
    pub fn to_360(&self) -> Self {
        Self {
            lon_min: to_360(self.lon_min),
            lon_max: to_360(self.lon_max),
            ..*self
        }
    }

    /// Check if a point is inside the box, honoring seam crossing.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        let lat_ok = lat >= self.lat_min && lat <= self.lat_max;
        let lon_ok = if self.crosses_seam() {
            lon >= self.lon_min || lon <= self.lon_max
        } else {
            lon >= self.lon_min && lon <= self.lon_max
        };
        lat_ok && lon_ok
    }
}

/// `lon' = (lon + 360) mod 360`
pub fn to_360(lon: f64) -> f64 {
    (lon + 360.0).rem_euclid(360.0)
}

/// `lon' = (lon + 180) mod 360 - 180`
pub fn to_180(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// A labelled n-dimensional array of `f64`, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    dims: Vec<String>,
    shape: Vec<usize>,
    values: Vec<f64>,
}

impl Field {
    /// Create a field, checking that the values fill the shape exactly.
    pub fn new(dims: Vec<String>, shape: Vec<usize>, values: Vec<f64>) -> Result<Self> {
        if dims.len() != shape.len() {
            return Err(ForcingError::shape_mismatch(format!(
                "{} dimension names for a rank {} shape",
                dims.len(),
                shape.len()
            )));
        }
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(ForcingError::shape_mismatch(format!(
                "shape {:?} holds {} values, got {}",
                shape,
                expected,
                values.len()
            )));
        }
        Ok(Self {
            dims,
            shape,
            values,
        })
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Position of a named dimension.
    pub fn axis(&self, name: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == name)
    }

    /// Rename a dimension in place. Unknown names are ignored.
    pub fn rename(&mut self, from: &str, to: &str) {
        for dim in self.dims.iter_mut().filter(|d| d.as_str() == from) {
            *dim = to.to_string();
        }
    }

    /// Gather `indices` along `axis`, in the given order.
    pub fn select(&self, axis: usize, indices: &[usize]) -> Result<Self> {
        let len = *self.shape.get(axis).ok_or_else(|| {
            ForcingError::shape_mismatch(format!("axis {} out of range for rank {}", axis, self.rank()))
        })?;
        if let Some(bad) = indices.iter().find(|i| **i >= len) {
            return Err(ForcingError::shape_mismatch(format!(
                "index {} out of range for axis {} of length {}",
                bad, self.dims[axis], len
            )));
        }

        let outer: usize = self.shape[..axis].iter().product();
        let inner: usize = self.shape[axis + 1..].iter().product();

        let mut values = Vec::with_capacity(outer * indices.len() * inner);
        for o in 0..outer {
            for &i in indices {
                let start = (o * len + i) * inner;
                values.extend_from_slice(&self.values[start..start + inner]);
            }
        }

        let mut shape = self.shape.clone();
        shape[axis] = indices.len();

        Ok(Self {
            dims: self.dims.clone(),
            shape,
            values,
        })
    }

    /// Insert a new axis at `position` holding `copies` identical replicas
    /// of the current data.
    pub fn insert_replicated_axis(&self, position: usize, name: &str, copies: usize) -> Result<Self> {
        if position > self.rank() {
            return Err(ForcingError::shape_mismatch(format!(
                "cannot insert axis {} at position {} of a rank {} field",
                name,
                position,
                self.rank()
            )));
        }

        let outer: usize = self.shape[..position].iter().product();
        let inner: usize = self.shape[position..].iter().product();

        let mut values = Vec::with_capacity(self.values.len() * copies);
        for o in 0..outer {
            let block = &self.values[o * inner..(o + 1) * inner];
            for _ in 0..copies {
                values.extend_from_slice(block);
            }
        }

        let mut dims = self.dims.clone();
        dims.insert(position, name.to_string());
        let mut shape = self.shape.clone();
        shape.insert(position, copies);

        Ok(Self {
            dims,
            shape,
            values,
        })
    }
}

/// Minimum and maximum over finite values.
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Coordinates plus data fields, all under canonical names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    pub coords: BTreeMap<String, Vec<f64>>,
    /// Data fields in insertion order.
    pub fields: Vec<(String, Field)>,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_coord(mut self, name: &str, values: Vec<f64>) -> Self {
        self.coords.insert(name.to_string(), values);
        self
    }

    pub fn with_field(mut self, name: &str, field: Field) -> Self {
        self.insert_field(name, field);
        self
    }

    /// Insert or replace a field.
    pub fn insert_field(&mut self, name: &str, field: Field) {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = field,
            None => self.fields.push((name.to_string(), field)),
        }
    }

    pub fn coord(&self, name: &str) -> Option<&[f64]> {
        self.coords.get(name).map(Vec::as_slice)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_2x3() -> Field {
        Field::new(
            vec!["latitude".into(), "longitude".into()],
            vec![2, 3],
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        )
        .unwrap()
    }

    #[test]
    fn test_field_rejects_bad_length() {
        assert!(Field::new(vec!["x".into()], vec![3], vec![1.0, 2.0]).is_err());
        assert!(Field::new(vec!["x".into(), "y".into()], vec![2], vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn test_select_along_last_axis() {
        let field = field_2x3();
        let sub = field.select(1, &[2, 0]).unwrap();
        assert_eq!(sub.shape(), &[2, 2]);
        assert_eq!(sub.values(), &[3.0, 1.0, 6.0, 4.0]);
    }

    #[test]
    fn test_select_along_first_axis() {
        let field = field_2x3();
        let sub = field.select(0, &[1]).unwrap();
        assert_eq!(sub.shape(), &[1, 3]);
        assert_eq!(sub.values(), &[4.0, 5.0, 6.0]);
        assert!(field.select(0, &[2]).is_err());
    }

    #[test]
    fn test_insert_replicated_axis() {
        let field = field_2x3();
        let deep = field.insert_replicated_axis(0, "depth", 2).unwrap();
        assert_eq!(deep.dims()[0], "depth");
        assert_eq!(deep.shape(), &[2, 2, 3]);
        assert_eq!(&deep.values()[..6], field.values());
        assert_eq!(&deep.values()[6..], field.values());
    }

    #[test]
    fn test_min_max_skips_nan() {
        assert_eq!(min_max(&[f64::NAN, 3.0, -1.0, f64::NAN]), Some((-1.0, 3.0)));
        assert_eq!(min_max(&[f64::NAN]), None);
        assert_eq!(min_max(&[]), None);
    }

    #[test]
    fn test_longitude_conventions() {
        assert_eq!(to_360(-10.0), 350.0);
        assert_eq!(to_360(18.5), 18.5);
        assert_eq!(to_360(360.0), 0.0);
        assert_eq!(to_180(350.0), -10.0);
        assert_eq!(to_180(180.0), -180.0);
        assert_eq!(to_180(19.0), 19.0);
    }

    #[test]
    fn test_bbox_to_360_crosses_seam() {
        let bbox = BoundingBox::new(-10.0, 10.0, -5.0, 5.0).to_360();
        assert_eq!(bbox.lon_min, 350.0);
        assert_eq!(bbox.lon_max, 10.0);
        assert!(bbox.crosses_seam());
        assert!(bbox.contains(355.0, 0.0));
        assert!(bbox.contains(5.0, 0.0));
        assert!(!bbox.contains(180.0, 0.0));
    }

    #[test]
    fn test_grid_insert_replaces() {
        let mut grid = Grid::new().with_field("a", field_2x3());
        grid.insert_field("a", field_2x3().select(0, &[0]).unwrap());
        assert_eq!(grid.fields.len(), 1);
        assert_eq!(grid.field("a").unwrap().shape(), &[1, 3]);
    }
}

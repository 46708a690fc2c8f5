//! Serialization of processed grids to the canonical NetCDF layout.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use netcdf_io::{write_dataset, DatasetSpec, DimensionSpec, VariableData, VariableSpec};
use tracing::{debug, warn};

use crate::error::Result;
use crate::ontology::{axis, CanonicalField};
use crate::pipeline::ProcessedGrid;

/// Describe a processed grid as a dataset.
///
/// Dimensions are `time` (unlimited), `depth` when present, `latitude` and
/// `longitude`. Coordinates are `f32`; data variables are `i16` carrying
/// their packing and ontology attributes.
pub fn to_dataset_spec(grid: &ProcessedGrid) -> DatasetSpec {
    let mut dimensions = vec![DimensionSpec::unlimited(axis::TIME, grid.time.values.len())];
    if let Some(depth) = &grid.depth {
        dimensions.push(DimensionSpec::fixed(axis::DEPTH, depth.len()));
    }
    dimensions.push(DimensionSpec::fixed(axis::LATITUDE, grid.latitude.len()));
    dimensions.push(DimensionSpec::fixed(axis::LONGITUDE, grid.longitude.len()));

    let mut variables = Vec::with_capacity(4 + grid.fields.len());

    let time = VariableSpec::new(axis::TIME, &[axis::TIME], VariableData::F32(grid.time.values.clone()))
        .with_attribute("units", grid.time.units.as_str())
        .with_attribute("calendar", grid.time.calendar.as_str());
    variables.push(with_names(time, grid.coord_metadata(axis::TIME)));

    if let Some(depth) = &grid.depth {
        variables.push(coordinate(grid, axis::DEPTH, depth.clone()));
    }
    variables.push(coordinate(grid, axis::LATITUDE, grid.latitude.clone()));
    variables.push(coordinate(grid, axis::LONGITUDE, grid.longitude.clone()));

    for field in &grid.fields {
        let params = &field.params;
        variables.push(VariableSpec {
            name: field.name().to_string(),
            dims: field.dims.clone(),
            data: VariableData::I16(field.values.clone()),
            attributes: Vec::new(),
        }
        .with_attribute("scale_factor", params.scale_factor)
        .with_attribute("add_offset", params.add_offset)
        .with_attribute("missing_value", params.missing_value)
        .with_attribute("valid_min", params.valid_min)
        .with_attribute("valid_max", params.valid_max)
        .with_attribute("units", field.metadata.units.as_str())
        .with_attribute("standard_name", field.metadata.standard_name.as_str())
        .with_attribute("long_name", field.metadata.long_name.as_str()));
    }

    DatasetSpec {
        dimensions,
        variables,
    }
}

fn coordinate(grid: &ProcessedGrid, name: &str, values: Vec<f32>) -> VariableSpec {
    let spec = VariableSpec::new(name, &[name], VariableData::F32(values));
    match grid.coord_metadata(name) {
        Some(meta) => with_names(spec.with_attribute("units", meta.units.as_str()), Some(meta)),
        None => spec,
    }
}

fn with_names(spec: VariableSpec, meta: Option<&CanonicalField>) -> VariableSpec {
    match meta {
        Some(meta) => spec
            .with_attribute("standard_name", meta.standard_name.as_str())
            .with_attribute("long_name", meta.long_name.as_str()),
        None => spec,
    }
}

/// `<output>.tmp`, next to the final file.
fn temporary_path(output: &Path) -> PathBuf {
    let mut name = OsString::from(output.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write a processed grid, creating the output directory if needed.
///
/// The dataset is written to `<output>.tmp` and renamed into place, so a
/// failure never leaves a partial file under the final name.
pub fn write_processed(grid: &ProcessedGrid, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let spec = to_dataset_spec(grid);
    let tmp = temporary_path(output);

    if let Err(e) = write_dataset(&tmp, &spec) {
        if let Err(cleanup) = fs::remove_file(&tmp) {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %tmp.display(), error = %cleanup, "Failed to remove partial output");
            }
        }
        return Err(e.into());
    }

    fs::rename(&tmp, output)?;
    debug!(path = %output.display(), "Renamed output into place");
    Ok(())
}

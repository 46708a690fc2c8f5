//! Provider-like NetCDF files for integration tests.
//!
//! Each writer mimics the variable names, types and attributes of a real
//! product closely enough for the forcing pipeline to treat it as one.

use std::path::Path;

use netcdf_io::{write_dataset, DatasetSpec, DimensionSpec, NetCdfResult, VariableData, VariableSpec};

use crate::fixtures::time;
use crate::generators::{
    ocean_field, pressure_field, regular_axis, temperature_kelvin_field, wind_component_field,
};

/// GFS `_FillValue` as written by wgrib2.
pub const GFS_FILL: f32 = 9.999e20;

/// CMEMS `_FillValue` of packed variables.
pub const CMEMS_FILL: i16 = -32767;

/// Horizontal and time axes of a synthetic file.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticAxes {
    /// Raw time values in `time_units`
    pub time: Vec<f64>,
    pub time_units: String,
    pub latitude: Vec<f64>,
    pub longitude: Vec<f64>,
}

impl SyntheticAxes {
    pub fn len(&self) -> usize {
        self.time.len() * self.latitude.len() * self.longitude.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn to_f32(values: &[f64]) -> Vec<f32> {
    values.iter().map(|v| *v as f32).collect()
}

fn coordinates(axes: &SyntheticAxes, depth: Option<&[f64]>) -> (Vec<DimensionSpec>, Vec<VariableSpec>) {
    let mut dimensions = vec![DimensionSpec::unlimited("time", axes.time.len())];
    let mut variables = vec![VariableSpec::new("time", &["time"], VariableData::F64(axes.time.clone()))
        .with_attribute("units", axes.time_units.as_str())
        .with_attribute("calendar", "standard")];

    if let Some(depth) = depth {
        dimensions.push(DimensionSpec::fixed("depth", depth.len()));
        variables.push(
            VariableSpec::new("depth", &["depth"], VariableData::F32(to_f32(depth)))
                .with_attribute("units", "m")
                .with_attribute("positive", "down"),
        );
    }

    dimensions.push(DimensionSpec::fixed("latitude", axes.latitude.len()));
    dimensions.push(DimensionSpec::fixed("longitude", axes.longitude.len()));
    variables.push(
        VariableSpec::new("latitude", &["latitude"], VariableData::F64(axes.latitude.clone()))
            .with_attribute("units", "degrees_north"),
    );
    variables.push(
        VariableSpec::new("longitude", &["longitude"], VariableData::F64(axes.longitude.clone()))
            .with_attribute("units", "degrees_east"),
    );

    (dimensions, variables)
}

fn gfs_variable(name: &str, values: &[f64], units: &str) -> VariableSpec {
    let data = values
        .iter()
        .map(|v| if v.is_nan() { GFS_FILL } else { *v as f32 })
        .collect();
    VariableSpec::new(name, &["time", "latitude", "longitude"], VariableData::F32(data))
        .with_attribute("_FillValue", GFS_FILL)
        .with_attribute("units", units)
}

/// Write a GFS file as converted by `wgrib2 -netcdf`.
///
/// `pressure` overrides the generated `PRES_surface` values (Pa).
pub fn write_gfs_file(path: &Path, axes: &SyntheticAxes, pressure: Option<Vec<f64>>) -> NetCdfResult<()> {
    let nt = axes.time.len();
    let (lat, lon) = (&axes.latitude, &axes.longitude);
    let (dimensions, mut variables) = coordinates(axes, None);

    let pressure = pressure.unwrap_or_else(|| pressure_field(nt, lat, lon));
    variables.push(gfs_variable("PRES_surface", &pressure, "Pa"));
    variables.push(gfs_variable(
        "TMP_2maboveground",
        &temperature_kelvin_field(nt, lat, lon),
        "K",
    ));
    variables.push(gfs_variable(
        "UGRD_10maboveground",
        &wind_component_field(nt, lat, lon, 8.0),
        "m/s",
    ));
    variables.push(gfs_variable(
        "VGRD_10maboveground",
        &wind_component_field(nt, lat, lon, -3.0),
        "m/s",
    ));

    write_dataset(path, &DatasetSpec { dimensions, variables })
}

fn packed_variable(name: &str, dims: &[&str], values: &[f64], scale: f64, offset: f64) -> VariableSpec {
    let data = values
        .iter()
        .map(|v| {
            if v.is_nan() {
                CMEMS_FILL
            } else {
                ((v - offset) / scale).round() as i16
            }
        })
        .collect();
    VariableSpec::new(name, dims, VariableData::I16(data))
        .with_attribute("_FillValue", CMEMS_FILL)
        .with_attribute("scale_factor", scale)
        .with_attribute("add_offset", offset)
}

/// Write a CMEMS physics file.
///
/// With `depth` the variables are 4-D `(time, depth, lat, lon)`; without it
/// they are surface-only 3-D fields. `thetao` is stored packed as `i16`.
pub fn write_cmems_ocean_file(path: &Path, axes: &SyntheticAxes, depth: Option<&[f64]>) -> NetCdfResult<()> {
    let nt = axes.time.len();
    let (lat, lon) = (&axes.latitude, &axes.longitude);
    let (dimensions, mut variables) = coordinates(axes, depth);

    let levels: &[f64] = depth.unwrap_or(&[0.5]);
    let dims: Vec<&str> = if depth.is_some() {
        vec!["time", "depth", "latitude", "longitude"]
    } else {
        vec!["time", "latitude", "longitude"]
    };

    for (name, base) in [("uo", 0.3), ("vo", -0.2), ("wo", 0.0001), ("so", 38.5)] {
        let values = ocean_field(nt, levels, lat, lon, base);
        variables.push(
            VariableSpec::new(name, &dims, VariableData::F32(to_f32(&values)))
                .with_attribute("_FillValue", f32::NAN),
        );
    }

    let thetao = ocean_field(nt, levels, lat, lon, 18.0);
    variables.push(
        packed_variable("thetao", &dims, &thetao, 0.001, 20.0).with_attribute("units", "degrees_C"),
    );

    write_dataset(path, &DatasetSpec { dimensions, variables })
}

/// Write a CMEMS wave file (`VHM0`, `VMDR`, `VTM02`).
pub fn write_cmems_wave_file(path: &Path, axes: &SyntheticAxes) -> NetCdfResult<()> {
    let nt = axes.time.len();
    let (lat, lon) = (&axes.latitude, &axes.longitude);
    let (dimensions, mut variables) = coordinates(axes, None);
    let dims = ["time", "latitude", "longitude"];

    let height = wind_component_field(nt, lat, lon, 1.5)
        .into_iter()
        .map(|v| v.abs() + 0.2)
        .collect::<Vec<_>>();
    let direction = (0..axes.len()).map(|i| (i * 7 % 360) as f64).collect::<Vec<_>>();
    let period = vec![6.5; axes.len()];

    variables.push(packed_variable("VHM0", &dims, &height, 0.01, 0.0).with_attribute("units", "m"));
    variables.push(packed_variable("VMDR", &dims, &direction, 0.01, 180.0).with_attribute("units", "degree"));
    variables.push(packed_variable("VTM02", &dims, &period, 0.01, 0.0).with_attribute("units", "s"));

    write_dataset(path, &DatasetSpec { dimensions, variables })
}

/// Axes of a GFS-like file: 0..360 longitudes, descending latitudes,
/// hourly steps since the Unix epoch starting 2025-01-21.
pub fn gfs_axes(step: f64, steps: usize) -> SyntheticAxes {
    let lat_count = (180.0 / step).round() as usize + 1;
    let lon_count = (360.0 / step).round() as usize;
    SyntheticAxes {
        time: regular_axis(time::EPOCH_2025_01_21, 3600.0, steps),
        time_units: time::GFS_UNITS.to_string(),
        latitude: regular_axis(90.0, -step, lat_count),
        longitude: regular_axis(0.0, step, lon_count),
    }
}

/// Axes of a regional CMEMS-like file in -180..180, hourly since 1950.
pub fn cmems_axes(lon_min: f64, lat_min: f64, step: f64, nlon: usize, nlat: usize, steps: usize) -> SyntheticAxes {
    SyntheticAxes {
        time: regular_axis(time::HOURS_1950_TO_2025_01_21, 1.0, steps),
        time_units: time::CMEMS_UNITS.to_string(),
        latitude: regular_axis(lat_min, step, nlat),
        longitude: regular_axis(lon_min, step, nlon),
    }
}

//! Sources of provider grids.
//!
//! The pipeline reads through [`GridSource`] so the same transform runs on
//! NetCDF files and on in-memory grids.

use std::collections::BTreeMap;
use std::sync::Mutex;

use netcdf_io::{NcReader, NetCdfError, VariableInfo};

use crate::error::Result;

/// Read access to the variables of one provider grid.
pub trait GridSource {
    /// Human-readable origin, used in errors and logs.
    fn label(&self) -> String;

    /// Check if a variable exists.
    fn contains(&self, name: &str) -> bool;

    /// Dimensions, shape and time attributes of a variable.
    fn header(&self, name: &str) -> Result<VariableInfo>;

    /// Row-major physical values, `NaN` for missing samples.
    fn read(&self, name: &str) -> Result<Vec<f64>>;
}

impl GridSource for NcReader {
    fn label(&self) -> String {
        self.path().display().to_string()
    }

    fn contains(&self, name: &str) -> bool {
        self.has_variable(name)
    }

    fn header(&self, name: &str) -> Result<VariableInfo> {
        Ok(self.describe(name)?)
    }

    fn read(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self.read_variable(name)?.values)
    }
}

/// A provider grid held in memory.
#[derive(Debug, Default)]
pub struct MemorySource {
    label: String,
    variables: BTreeMap<String, (VariableInfo, Vec<f64>)>,
    reads: Mutex<BTreeMap<String, usize>>,
}

impl MemorySource {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Add a variable. `values` must be row-major over `shape`.
    pub fn with_variable(mut self, name: &str, dims: &[&str], shape: &[usize], values: Vec<f64>) -> Self {
        let info = VariableInfo {
            name: name.to_string(),
            dims: dims.iter().map(|d| d.to_string()).collect(),
            shape: shape.to_vec(),
            units: None,
            calendar: None,
        };
        self.variables.insert(name.to_string(), (info, values));
        self
    }

    /// Add a 1-D coordinate variable whose dimension shares its name.
    pub fn with_coordinate(self, name: &str, values: Vec<f64>) -> Self {
        let len = values.len();
        self.with_variable(name, &[name], &[len], values)
    }

    /// Set the `units` attribute of an existing variable.
    pub fn with_units(mut self, name: &str, units: &str) -> Self {
        if let Some((info, _)) = self.variables.get_mut(name) {
            info.units = Some(units.to_string());
        }
        self
    }

    /// Remove a variable.
    pub fn without(mut self, name: &str) -> Self {
        self.variables.remove(name);
        self
    }

    /// Number of times a variable's values were read.
    pub fn read_count(&self, name: &str) -> usize {
        self.reads
            .lock()
            .map(|reads| reads.get(name).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn get(&self, name: &str) -> Result<&(VariableInfo, Vec<f64>)> {
        self.variables.get(name).ok_or_else(|| {
            NetCdfError::MissingData(format!("{} variable in {}", name, self.label)).into()
        })
    }
}

impl GridSource for MemorySource {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    fn header(&self, name: &str) -> Result<VariableInfo> {
        Ok(self.get(name)?.0.clone())
    }

    fn read(&self, name: &str) -> Result<Vec<f64>> {
        let values = self.get(name)?.1.clone();
        if let Ok(mut reads) = self.reads.lock() {
            *reads.entry(name.to_string()).or_insert(0) += 1;
        }
        Ok(values)
    }
}

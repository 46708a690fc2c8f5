//! Writing fully described datasets to NetCDF-4 files.
//!
//! Callers build a [`DatasetSpec`] in memory (dimensions, typed variables,
//! attributes) and hand it over in one piece. The description is validated before
//! the file is created, so an inconsistent description never produces a
//! half-written file.

use std::collections::HashMap;
use std::path::Path;

use netcdf::{AttributeValue, Extent, Extents};
use tracing::debug;

use crate::error::{NetCdfError, NetCdfResult};
use crate::reader::silence_hdf5_errors;

/// A dimension of the output dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionSpec {
    pub name: String,
    pub len: usize,
    /// Unlimited (appendable) dimensions grow as data is written.
    pub unlimited: bool,
}

impl DimensionSpec {
    /// Create a fixed-length dimension.
    pub fn fixed(name: impl Into<String>, len: usize) -> Self {
        Self {
            name: name.into(),
            len,
            unlimited: false,
        }
    }

    /// Create an unlimited dimension holding `len` records.
    pub fn unlimited(name: impl Into<String>, len: usize) -> Self {
        Self {
            name: name.into(),
            len,
            unlimited: true,
        }
    }
}

/// Attribute values supported in output files.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    F64(f64),
    F32(f32),
    I16(i16),
}

impl From<&AttrValue> for AttributeValue {
    fn from(value: &AttrValue) -> Self {
        match value {
            AttrValue::Str(s) => AttributeValue::Str(s.clone()),
            AttrValue::F64(v) => AttributeValue::Double(*v),
            AttrValue::F32(v) => AttributeValue::Float(*v),
            AttrValue::I16(v) => AttributeValue::Short(*v),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::F64(value)
    }
}

impl From<f32> for AttrValue {
    fn from(value: f32) -> Self {
        AttrValue::F32(value)
    }
}

impl From<i16> for AttrValue {
    fn from(value: i16) -> Self {
        AttrValue::I16(value)
    }
}

/// Typed values of an output variable, row-major.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableData {
    F64(Vec<f64>),
    F32(Vec<f32>),
    I16(Vec<i16>),
}

impl VariableData {
    /// Number of values.
    pub fn len(&self) -> usize {
        match self {
            Self::F64(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::I16(v) => v.len(),
        }
    }

    /// Check if there are no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::F64(_) => "f64",
            Self::F32(_) => "f32",
            Self::I16(_) => "i16",
        }
    }
}

/// A variable of the output dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSpec {
    pub name: String,
    pub dims: Vec<String>,
    pub data: VariableData,
    /// Attributes in the order they are written.
    pub attributes: Vec<(String, AttrValue)>,
}

impl VariableSpec {
    /// Create a variable without attributes.
    pub fn new(name: impl Into<String>, dims: &[&str], data: VariableData) -> Self {
        Self {
            name: name.into(),
            dims: dims.iter().map(|d| d.to_string()).collect(),
            data,
            attributes: Vec::new(),
        }
    }

    /// Append an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }
}

/// A complete output dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetSpec {
    pub dimensions: Vec<DimensionSpec>,
    pub variables: Vec<VariableSpec>,
}

impl DatasetSpec {
    /// Look up a variable by name.
    pub fn variable(&self, name: &str) -> Option<&VariableSpec> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Check that every variable references declared dimensions and holds
    /// exactly as many values as its dimensions describe.
    pub fn validate(&self) -> NetCdfResult<()> {
        let mut lengths: HashMap<&str, usize> = HashMap::new();
        for dim in &self.dimensions {
            if lengths.insert(dim.name.as_str(), dim.len).is_some() {
                return Err(NetCdfError::InvalidFormat(format!(
                    "dimension {} declared twice",
                    dim.name
                )));
            }
        }

        for var in &self.variables {
            let mut expected = 1usize;
            for dim in &var.dims {
                let len = lengths.get(dim.as_str()).ok_or_else(|| {
                    NetCdfError::InvalidFormat(format!(
                        "variable {} uses undeclared dimension {}",
                        var.name, dim
                    ))
                })?;
                expected *= len;
            }

            if expected != var.data.len() {
                return Err(NetCdfError::InvalidFormat(format!(
                    "variable {} has {} values but its dimensions describe {}",
                    var.name,
                    var.data.len(),
                    expected
                )));
            }
        }

        Ok(())
    }

    fn extents_for(&self, var: &VariableSpec) -> Extents {
        let extents: Vec<Extent> = var
            .dims
            .iter()
            .map(|name| {
                let len = self
                    .dimensions
                    .iter()
                    .find(|d| &d.name == name)
                    .map(|d| d.len)
                    .unwrap_or(0);
                Extent::from(0..len)
            })
            .collect();
        Extents::from(extents)
    }
}

/// Write a dataset to a new NetCDF-4 file, replacing any existing file.
pub fn write_dataset(path: &Path, spec: &DatasetSpec) -> NetCdfResult<()> {
    silence_hdf5_errors();
    spec.validate()?;

    let mut file = netcdf::create(path)?;

    for dim in &spec.dimensions {
        if dim.unlimited {
            file.add_unlimited_dimension(&dim.name)?;
        } else {
            file.add_dimension(&dim.name, dim.len)?;
        }
    }

    for var_spec in &spec.variables {
        let dims: Vec<&str> = var_spec.dims.iter().map(String::as_str).collect();
        let extents = spec.extents_for(var_spec);

        match &var_spec.data {
            VariableData::F64(values) => {
                let mut var = file.add_variable::<f64>(&var_spec.name, &dims)?;
                put_attributes(&mut var, &var_spec.attributes)?;
                var.put_values(values, extents)?;
            }
            VariableData::F32(values) => {
                let mut var = file.add_variable::<f32>(&var_spec.name, &dims)?;
                put_attributes(&mut var, &var_spec.attributes)?;
                var.put_values(values, extents)?;
            }
            VariableData::I16(values) => {
                let mut var = file.add_variable::<i16>(&var_spec.name, &dims)?;
                put_attributes(&mut var, &var_spec.attributes)?;
                var.put_values(values, extents)?;
            }
        }

        debug!(
            variable = %var_spec.name,
            dtype = var_spec.data.type_name(),
            values = var_spec.data.len(),
            "Wrote variable"
        );
    }

    Ok(())
}

fn put_attributes(
    var: &mut netcdf::VariableMut<'_>,
    attributes: &[(String, AttrValue)],
) -> NetCdfResult<()> {
    for (name, value) in attributes {
        var.put_attribute(name, AttributeValue::from(value))?;
    }
    Ok(())
}

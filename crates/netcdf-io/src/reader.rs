//! Native NetCDF reading using the netcdf library.
//!
//! Provider files are opened once and queried per variable. Values are always
//! returned as `f64`: libnetcdf converts the on-disk numeric type, and the CF
//! packing attributes are applied here so callers only ever see physical
//! values with `NaN` for missing samples.

use std::path::{Path, PathBuf};
use std::sync::Once;

use tracing::debug;

use crate::error::{NetCdfError, NetCdfResult};

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when checking for optional
/// attributes that don't exist). This function disables that output by calling
/// H5Eset_auto2 with null handlers. It only needs to be called once per
/// process, but is safe to call multiple times.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Shape and metadata of a variable, without its values.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableInfo {
    /// Variable name as stored in the file
    pub name: String,
    /// Dimension names, outermost first
    pub dims: Vec<String>,
    /// Dimension lengths, same order as `dims`
    pub shape: Vec<usize>,
    /// `units` attribute, if present
    pub units: Option<String>,
    /// `calendar` attribute, if present
    pub calendar: Option<String>,
}

impl VariableInfo {
    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    /// Check if the variable holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A variable read in full.
#[derive(Debug, Clone)]
pub struct RawVariable {
    pub info: VariableInfo,
    /// Row-major values with packing applied and missing samples as `NaN`.
    pub values: Vec<f64>,
}

/// CF packing attributes of a variable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Packing {
    pub scale_factor: Option<f64>,
    pub add_offset: Option<f64>,
    /// Raw values that mark a missing sample (`_FillValue`, `missing_value`).
    pub missing: Vec<f64>,
}

impl Packing {
    /// Check if the values need any transformation at all.
    pub fn is_identity(&self) -> bool {
        self.scale_factor.is_none() && self.add_offset.is_none() && self.missing.is_empty()
    }
}

/// Apply CF packing to raw values in place.
///
/// Missing markers are compared against the raw (packed) values, before
/// scale and offset are applied.
pub fn unpack_values(values: &mut [f64], packing: &Packing) {
    if packing.is_identity() {
        return;
    }

    let scale = packing.scale_factor.unwrap_or(1.0);
    let offset = packing.add_offset.unwrap_or(0.0);

    for value in values.iter_mut() {
        if packing.missing.iter().any(|m| *m == *value) {
            *value = f64::NAN;
        } else {
            *value = *value * scale + offset;
        }
    }
}

/// An open provider NetCDF file.
pub struct NcReader {
    path: PathBuf,
    file: netcdf::File,
}

impl NcReader {
    /// Open a NetCDF file for reading.
    pub fn open(path: impl AsRef<Path>) -> NetCdfResult<Self> {
        // Silence HDF5's verbose stderr output for missing attributes
        silence_hdf5_errors();

        let path = path.as_ref();
        let file = netcdf::open(path).map_err(|e| {
            NetCdfError::InvalidFormat(format!("Failed to open {}: {}", path.display(), e))
        })?;

        debug!(path = %path.display(), "Opened NetCDF file");

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Path this reader was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the file contains a variable with the given name.
    pub fn has_variable(&self, name: &str) -> bool {
        self.file.variable(name).is_some()
    }

    /// Check if a dimension is unlimited.
    pub fn is_unlimited(&self, dimension: &str) -> NetCdfResult<bool> {
        let dim = self
            .file
            .dimension(dimension)
            .ok_or_else(|| NetCdfError::MissingData(format!("{} dimension", dimension)))?;
        Ok(dim.is_unlimited())
    }

    /// Describe a variable without reading its values.
    pub fn describe(&self, name: &str) -> NetCdfResult<VariableInfo> {
        let var = self.variable(name)?;
        Ok(describe_variable(&var))
    }

    /// Read a variable in full, unpacked to physical values.
    pub fn read_variable(&self, name: &str) -> NetCdfResult<RawVariable> {
        let var = self.variable(name)?;
        let info = describe_variable(&var);

        // Read raw data as f64 using (..) to read all extents
        let mut values: Vec<f64> = var.get_values(..).map_err(|e| {
            NetCdfError::InvalidFormat(format!("Failed to read {}: {}", name, e))
        })?;

        let packing = read_packing(&var);
        unpack_values(&mut values, &packing);

        Ok(RawVariable { info, values })
    }

    /// Read a string attribute of a variable.
    pub fn string_attribute(&self, variable: &str, attribute: &str) -> NetCdfResult<Option<String>> {
        let var = self.variable(variable)?;
        Ok(get_string_attr(&var, attribute))
    }

    /// Read a numeric attribute of a variable as `f64`.
    pub fn number_attribute(&self, variable: &str, attribute: &str) -> NetCdfResult<Option<f64>> {
        let var = self.variable(variable)?;
        Ok(get_f64_attr(&var, attribute))
    }

    fn variable(&self, name: &str) -> NetCdfResult<netcdf::Variable<'_>> {
        self.file.variable(name).ok_or_else(|| {
            NetCdfError::MissingData(format!("{} variable in {}", name, self.path.display()))
        })
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

fn describe_variable(var: &netcdf::Variable) -> VariableInfo {
    let dims = var.dimensions();
    VariableInfo {
        name: var.name(),
        dims: dims.iter().map(|d| d.name()).collect(),
        shape: dims.iter().map(|d| d.len()).collect(),
        units: get_string_attr(var, "units"),
        calendar: get_string_attr(var, "calendar"),
    }
}

fn read_packing(var: &netcdf::Variable) -> Packing {
    let missing = ["_FillValue", "missing_value"]
        .iter()
        .filter_map(|name| get_f64_attr(var, name))
        .filter(|v| !v.is_nan())
        .collect();

    Packing {
        scale_factor: get_f64_attr(var, "scale_factor"),
        add_offset: get_f64_attr(var, "add_offset"),
        missing,
    }
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

/// Helper to get f64 attribute.
fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

/// Helper to get string attribute.
fn get_string_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

//! NetCDF boundary for the forcing pipeline.
//!
//! This crate is the only place that talks to libnetcdf. It provides:
//!
//! - [`NcReader`]: open a provider file, describe variables, read values as
//!   `f64` with CF packing (`scale_factor`/`add_offset`) applied and
//!   `_FillValue`/`missing_value` samples turned into `NaN`
//! - [`write_dataset`]: write a fully described dataset ([`DatasetSpec`]) with
//!   typed `f32`/`f64`/`i16` variables, attributes and unlimited dimensions
//!
//! # Implementation Notes
//!
//! The HDF5 C library prints diagnostics to stderr even when a missing
//! attribute is handled gracefully. Both entry points call
//! [`silence_hdf5_errors`] before touching a file.

pub mod error;
mod reader;
mod writer;

pub use error::{NetCdfError, NetCdfResult};
pub use reader::{silence_hdf5_errors, unpack_values, NcReader, Packing, RawVariable, VariableInfo};
pub use writer::{
    write_dataset, AttrValue, DatasetSpec, DimensionSpec, VariableData, VariableSpec,
};

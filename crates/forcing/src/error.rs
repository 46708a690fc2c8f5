//! Error types for the forcing pipeline.

use thiserror::Error;

use crate::ontology::Domain;

/// Errors that can occur while preparing a forcing file.
#[derive(Error, Debug)]
pub enum ForcingError {
    /// A provider schema does not map exactly the ontology's keys.
    #[error(
        "{domain}/{provider}: {kind} keys do not match the ontology (missing: {missing:?}, extra: {extra:?})"
    )]
    SchemaMismatch {
        domain: Domain,
        provider: String,
        kind: &'static str,
        missing: Vec<String>,
        extra: Vec<String>,
    },

    #[error("unknown {domain} provider '{provider}' (known: {known:?})")]
    UnknownProvider {
        domain: Domain,
        provider: String,
        known: Vec<String>,
    },

    #[error("field {field} ({source_name}) has rank {rank}, expected 3 or 4")]
    UnsupportedRank {
        field: String,
        source_name: String,
        rank: usize,
    },

    #[error("source field '{source_name}' (canonical {canonical}) not found in {location}")]
    MissingSourceField {
        canonical: String,
        source_name: String,
        location: String,
    },

    #[error("{field} has no {axis} axis")]
    MissingCoordinate { field: String, axis: String },

    /// The bounding box does not intersect the grid along one axis.
    #[error("bounding box selects no {axis} values in [{min}, {max}]")]
    EmptySelection { axis: String, min: f64, max: f64 },

    /// The time axis cannot be decoded (unknown unit, bad reference, empty axis).
    #[error("invalid time units: {0}")]
    InvalidTimeUnits(String),

    /// A field has no finite sample to derive a quantization range from.
    #[error("field {field} has no finite values to quantize")]
    NoValidData { field: String },

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    NetCdf(#[from] netcdf_io::NetCdfError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ForcingError {
    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(msg: impl Into<String>) -> Self {
        Self::ShapeMismatch(msg.into())
    }

    /// Create an InvalidTimeUnits error.
    pub fn invalid_time_units(msg: impl Into<String>) -> Self {
        Self::InvalidTimeUnits(msg.into())
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<serde_yaml::Error> for ForcingError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for forcing operations.
pub type Result<T> = std::result::Result<T, ForcingError>;

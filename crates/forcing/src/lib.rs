//! Field remap and quantization pipeline for oil-spill forcing data.
//!
//! Turns provider NetCDF grids (meteorology, ocean, waves) into the fixed
//! canonical layout read by the spill model:
//!
//! - [`ontology`]: canonical fields and coordinates per domain
//! - [`registry`]: validated per-provider field mappings
//! - [`subset`]: bounding-box selection, seam-aware in longitude
//! - [`depth`]: depth-axis synthesis for surface-only products
//! - [`time`]: CF time axes to hours since the first step
//! - [`quantize`]: 16-bit scale/offset packing
//! - [`pipeline`]: the per-file transform and batch entry points
//!
//! # Example
//!
//! ```ignore
//! use forcing::{BoundingBox, Domain, Ontology, ProviderRegistry};
//!
//! let ontology = Ontology::builtin();
//! let registry = ProviderRegistry::builtin(&ontology)?;
//! let bbox = BoundingBox::new(18.16, 19.26, 38.09, 39.18);
//! forcing::process_meteo_files(&inputs, &bbox, "out".as_ref(), &registry, &ontology)?;
//! ```

pub mod depth;
pub mod error;
pub mod grid;
pub mod ontology;
pub mod pipeline;
pub mod plan;
pub mod quantize;
pub mod registry;
pub mod source;
pub mod subset;
pub mod time;
pub mod writer;

pub use error::{ForcingError, Result};
pub use grid::{BoundingBox, Field, Grid};
pub use ontology::{CanonicalField, Domain, DomainOntology, Ontology};
pub use pipeline::{
    native_bbox, output_path_for, output_paths_for, process_file, process_files,
    process_files_parallel, process_meteo_files, process_ocean_files, process_wave_files,
    transform, BatchReport, ProcessedGrid, QuantizedField,
};
pub use plan::TransformPlan;
pub use quantize::{quantize, QuantizationParams, MISSING_VALUE};
pub use registry::{
    DepthSynthesisSpec, FieldMapping, ProviderId, ProviderRegistry, ProviderSchema,
    ProviderSchemaConfig, RegistryConfig,
};
pub use source::{GridSource, MemorySource};
pub use subset::{subset, SubsetSelection};
pub use time::{normalize, CfTimeUnits, NormalizedTime, TimeUnit};
pub use writer::write_processed;

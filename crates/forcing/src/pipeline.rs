//! End-to-end transform of provider files into model forcing files.
//!
//! One file goes through: plan (coordinates only) -> materialize (rename,
//! subset, depth synthesis) -> unit correction -> quantization -> time
//! normalization -> coordinate casting -> atomic write. Batch entry points
//! run the same steps per file, sequentially or on a rayon pool.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use netcdf_io::NcReader;
use rayon::prelude::*;
use tracing::{debug, error, info, instrument};

use crate::error::{ForcingError, Result};
use crate::grid::{to_180, BoundingBox};
use crate::ontology::{CanonicalField, Domain, Ontology};
use crate::plan::TransformPlan;
use crate::quantize::{quantize, QuantizationParams};
use crate::registry::{ProviderId, ProviderRegistry, ProviderSchema};
use crate::source::GridSource;
use crate::time::{normalize, NormalizedTime};
use crate::writer::write_processed;

/// A canonical data variable, packed to `i16`.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedField {
    pub metadata: CanonicalField,
    pub dims: Vec<String>,
    pub shape: Vec<usize>,
    pub values: Vec<i16>,
    pub params: QuantizationParams,
}

impl QuantizedField {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

/// The canonical output of one input file.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedGrid {
    pub provider: ProviderId,
    pub time: NormalizedTime,
    pub depth: Option<Vec<f32>>,
    pub latitude: Vec<f32>,
    pub longitude: Vec<f32>,
    /// Ontology metadata of the coordinates, in output order.
    pub coords: Vec<CanonicalField>,
    /// Data variables, in ontology order.
    pub fields: Vec<QuantizedField>,
}

impl ProcessedGrid {
    pub fn domain(&self) -> Domain {
        self.provider.domain()
    }

    pub fn field(&self, name: &str) -> Option<&QuantizedField> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn coord_metadata(&self, name: &str) -> Option<&CanonicalField> {
        self.coords.iter().find(|c| c.name == name)
    }
}

/// The bounding box expressed in the provider grid's native longitude
/// convention.
pub fn native_bbox(domain: Domain, bbox: &BoundingBox) -> BoundingBox {
    if domain.uses_0_360_longitude() {
        bbox.to_360()
    } else {
        *bbox
    }
}

/// Transform an open source into a canonical grid without writing it.
///
/// `bbox` must already be in the source's longitude convention.
pub fn transform(
    source: &dyn GridSource,
    bbox: &BoundingBox,
    schema: &ProviderSchema,
    ontology: &Ontology,
) -> Result<ProcessedGrid> {
    let plan = TransformPlan::build(source, bbox, schema, ontology)?;
    let grid = plan.materialize(source)?;

    let mut fields = Vec::with_capacity(plan.fields().len());
    for (planned, (name, field)) in plan.fields().iter().zip(grid.fields) {
        debug_assert_eq!(planned.canonical.name, name);

        let dims = field.dims().to_vec();
        let shape = field.shape().to_vec();
        let mut values = field.into_values();
        if !planned.mapping.is_identity() {
            debug!(
                field = %name,
                addc = planned.mapping.add_offset_correction,
                mulc = planned.mapping.mul_scale_correction,
                "Applying unit correction"
            );
            planned.mapping.apply(&mut values);
        }

        let params = QuantizationParams::from_values(&name, &values)?;
        fields.push(QuantizedField {
            metadata: planned.canonical.clone(),
            dims,
            shape,
            values: quantize(&values, &params),
            params,
        });
    }

    let time = normalize(plan.time(), plan.time_units())?;

    let rewrap = schema.domain().uses_0_360_longitude();
    let longitude = plan
        .selection()
        .longitude
        .iter()
        .map(|&lon| (if rewrap { to_180(lon) } else { lon }) as f32)
        .collect();
    let latitude = plan.selection().latitude.iter().map(|&lat| lat as f32).collect();
    let depth = plan
        .depth()
        .map(|levels| levels.iter().map(|&d| d as f32).collect());

    Ok(ProcessedGrid {
        provider: schema.id().clone(),
        time,
        depth,
        latitude,
        longitude,
        coords: plan.domain().coords().to_vec(),
        fields,
    })
}

/// Transform one NetCDF file and write the result to `output`.
#[instrument(skip(bbox, schema, ontology), fields(provider = %schema.id()))]
pub fn process_file(
    input: &Path,
    output: &Path,
    bbox: &BoundingBox,
    schema: &ProviderSchema,
    ontology: &Ontology,
) -> Result<ProcessedGrid> {
    let reader = NcReader::open(input)?;
    let grid = transform(&reader, bbox, schema, ontology)?;
    write_processed(&grid, output)?;

    info!(
        output = %output.display(),
        time_steps = grid.time.values.len(),
        lat_points = grid.latitude.len(),
        lon_points = grid.longitude.len(),
        "Wrote forcing file"
    );

    Ok(grid)
}

/// Output path of an input file: same base name under `output_dir`.
pub fn output_path_for(input: &Path, output_dir: &Path) -> Result<PathBuf> {
    let name = input.file_name().ok_or_else(|| {
        ForcingError::config(format!("input path {} has no file name", input.display()))
    })?;
    Ok(output_dir.join(name))
}

/// Output paths of a batch, one per input.
///
/// Fails before anything is written when two inputs share a base name and
/// would therefore write the same output.
pub fn output_paths_for(inputs: &[PathBuf], output_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut claimed: HashMap<PathBuf, &PathBuf> = HashMap::with_capacity(inputs.len());
    let mut outputs = Vec::with_capacity(inputs.len());
    for input in inputs {
        let output = output_path_for(input, output_dir)?;
        if let Some(first) = claimed.insert(output.clone(), input) {
            return Err(ForcingError::config(format!(
                "inputs {} and {} both write {}",
                first.display(),
                input.display(),
                output.display()
            )));
        }
        outputs.push(output);
    }
    Ok(outputs)
}

/// Process files one after another, stopping at the first failure.
///
/// Returns the written output paths.
pub fn process_files(
    inputs: &[PathBuf],
    bbox: &BoundingBox,
    output_dir: &Path,
    schema: &ProviderSchema,
    ontology: &Ontology,
) -> Result<Vec<PathBuf>> {
    let outputs = output_paths_for(inputs, output_dir)?;
    for (input, output) in inputs.iter().zip(&outputs) {
        process_file(input, output, bbox, schema, ontology)?;
    }
    Ok(outputs)
}

/// Outcome of a parallel batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// `(input, output)` of every file written.
    pub succeeded: Vec<(PathBuf, PathBuf)>,
    /// `(input, error)` of every file that failed.
    pub failed: Vec<(PathBuf, ForcingError)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Process files on the current rayon pool, collecting every outcome.
///
/// Files are independent: one failure does not stop the others, and the
/// report preserves input order. Only colliding output paths fail the
/// batch as a whole, before any file is processed.
pub fn process_files_parallel(
    inputs: &[PathBuf],
    bbox: &BoundingBox,
    output_dir: &Path,
    schema: &ProviderSchema,
    ontology: &Ontology,
) -> Result<BatchReport> {
    let outputs = output_paths_for(inputs, output_dir)?;
    let outcomes: Vec<(PathBuf, Result<PathBuf>)> = inputs
        .par_iter()
        .zip(outputs.into_par_iter())
        .map(|(input, output)| {
            let outcome = process_file(input, &output, bbox, schema, ontology).map(|_| output);
            (input.clone(), outcome)
        })
        .collect();

    let mut report = BatchReport::default();
    for (input, outcome) in outcomes {
        match outcome {
            Ok(output) => report.succeeded.push((input, output)),
            Err(e) => {
                error!(input = %input.display(), error = %e, "Failed to process file");
                report.failed.push((input, e));
            }
        }
    }

    info!(
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        "Batch complete"
    );
    Ok(report)
}

fn process_domain_files(
    domain: Domain,
    inputs: &[PathBuf],
    bbox: &BoundingBox,
    output_dir: &Path,
    registry: &ProviderRegistry,
    ontology: &Ontology,
) -> Result<Vec<PathBuf>> {
    let schema = registry.load_default(domain)?;
    process_files(inputs, &native_bbox(domain, bbox), output_dir, schema, ontology)
}

/// Meteorology files from the default provider. `bbox` is in -180..180.
pub fn process_meteo_files(
    inputs: &[PathBuf],
    bbox: &BoundingBox,
    output_dir: &Path,
    registry: &ProviderRegistry,
    ontology: &Ontology,
) -> Result<Vec<PathBuf>> {
    process_domain_files(Domain::Meteo, inputs, bbox, output_dir, registry, ontology)
}

/// Ocean files from the default provider.
pub fn process_ocean_files(
    inputs: &[PathBuf],
    bbox: &BoundingBox,
    output_dir: &Path,
    registry: &ProviderRegistry,
    ontology: &Ontology,
) -> Result<Vec<PathBuf>> {
    process_domain_files(Domain::Ocean, inputs, bbox, output_dir, registry, ontology)
}

/// Wave files from the default provider.
pub fn process_wave_files(
    inputs: &[PathBuf],
    bbox: &BoundingBox,
    output_dir: &Path,
    registry: &ProviderRegistry,
    ontology: &Ontology,
) -> Result<Vec<PathBuf>> {
    process_domain_files(Domain::Waves, inputs, bbox, output_dir, registry, ontology)
}

//! Two-phase transform of one provider grid.
//!
//! [`TransformPlan::build`] looks only at coordinates and variable headers:
//! it resolves every mapped source name, checks ranks and dimension names,
//! and computes the subset selection. Nothing is read from the data
//! variables until [`TransformPlan::materialize`], which reads each of them
//! exactly once and returns a fully evaluated [`Grid`].

use std::collections::{BTreeSet, HashMap};

use netcdf_io::VariableInfo;
use tracing::debug;

use crate::depth::synthesize_depth;
use crate::error::{ForcingError, Result};
use crate::grid::{BoundingBox, Field, Grid};
use crate::ontology::{axis, CanonicalField, DomainOntology, Ontology};
use crate::registry::{FieldMapping, ProviderSchema};
use crate::source::GridSource;
use crate::subset::SubsetSelection;

/// A data variable resolved against the source.
#[derive(Debug, Clone)]
pub struct PlannedField<'a> {
    pub canonical: &'a CanonicalField,
    pub mapping: &'a FieldMapping,
    pub header: VariableInfo,
}

/// Everything needed to transform one source, minus the data itself.
#[derive(Debug, Clone)]
pub struct TransformPlan<'a> {
    schema: &'a ProviderSchema,
    domain: &'a DomainOntology,
    location: String,
    time: Vec<f64>,
    time_units: Option<String>,
    depth: Option<Vec<f64>>,
    selection: SubsetSelection,
    fields: Vec<PlannedField<'a>>,
}

impl<'a> TransformPlan<'a> {
    /// Resolve the schema against a source and compute the subset.
    ///
    /// Fails with `MissingSourceField` for any mapped name absent from the
    /// source, and with `UnsupportedRank` for data variables that are
    /// neither 3-D nor 4-D, before any data variable is read.
    pub fn build(
        source: &dyn GridSource,
        bbox: &BoundingBox,
        schema: &'a ProviderSchema,
        ontology: &'a Ontology,
    ) -> Result<Self> {
        let location = source.label();
        let domain = ontology.domain(schema.domain());

        for (canonical, mapping) in schema.coords() {
            require(source, canonical, mapping, &location)?;
        }

        let renames = schema.dimension_renames();
        let expected_dims = domain.coord_keys();

        let mut fields = Vec::with_capacity(domain.data_vars().len());
        for canonical in domain.data_vars() {
            let mapping = schema.data_var(&canonical.name).ok_or_else(|| {
                ForcingError::config(format!(
                    "provider {} has no mapping for {}",
                    schema.id(),
                    canonical.name
                ))
            })?;
            require(source, &canonical.name, mapping, &location)?;

            let header = source.header(&mapping.source_name)?;
            if !(3..=4).contains(&header.rank()) {
                return Err(ForcingError::UnsupportedRank {
                    field: canonical.name.clone(),
                    source_name: mapping.source_name.clone(),
                    rank: header.rank(),
                });
            }

            check_dimensions(
                &canonical.name,
                &header,
                &renames,
                &expected_dims,
                schema.depth_synthesis().is_some(),
            )?;

            fields.push(PlannedField {
                canonical,
                mapping,
                header,
            });
        }

        let latitude = read_coord(source, schema, axis::LATITUDE)?;
        let longitude = read_coord(source, schema, axis::LONGITUDE)?;
        let selection = SubsetSelection::compute(&latitude, &longitude, bbox)?;

        let time_name = &coord_mapping(schema, axis::TIME)?.source_name;
        let time = source.read(time_name)?;
        let time_units = source.header(time_name)?.units;

        let depth = match (schema.depth_synthesis(), schema.coord(axis::DEPTH)) {
            (Some(spec), _) => Some(spec.output_levels.clone()),
            (None, Some(mapping)) => Some(source.read(&mapping.source_name)?),
            (None, None) => None,
        };

        debug!(
            source = %location,
            provider = %schema.id(),
            fields = fields.len(),
            time_steps = time.len(),
            "Built transform plan"
        );

        Ok(Self {
            schema,
            domain,
            location,
            time,
            time_units,
            depth,
            selection,
            fields,
        })
    }

    pub fn schema(&self) -> &ProviderSchema {
        self.schema
    }

    pub fn domain(&self) -> &DomainOntology {
        self.domain
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn fields(&self) -> &[PlannedField<'a>] {
        &self.fields
    }

    pub fn selection(&self) -> &SubsetSelection {
        &self.selection
    }

    /// Raw time values, still in the source encoding.
    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// `units` attribute of the source time axis.
    pub fn time_units(&self) -> Option<&str> {
        self.time_units.as_deref()
    }

    /// Depth levels of the output, native or synthesized.
    pub fn depth(&self) -> Option<&[f64]> {
        self.depth.as_deref()
    }

    /// Read, rename, subset and (when configured) deepen every data variable.
    ///
    /// The returned grid holds canonical names only; time is still raw.
    pub fn materialize(&self, source: &dyn GridSource) -> Result<Grid> {
        let renames = self.schema.dimension_renames();

        let mut grid = Grid::new()
            .with_coord(axis::TIME, self.time.clone())
            .with_coord(axis::LATITUDE, self.selection.latitude.clone())
            .with_coord(axis::LONGITUDE, self.selection.longitude.clone());
        if let Some(depth) = &self.depth {
            grid.coords.insert(axis::DEPTH.to_string(), depth.clone());
        }

        for planned in &self.fields {
            let name = planned.canonical.name.as_str();
            let values = source.read(&planned.mapping.source_name)?;

            let mut field = Field::new(
                planned.header.dims.clone(),
                planned.header.shape.clone(),
                values,
            )?;
            for (from, to) in &renames {
                field.rename(from, to);
            }

            let mut field = self.selection.apply_field(name, &field)?;
            if let Some(spec) = self.schema.depth_synthesis() {
                field = synthesize_depth(name, &field, spec)?;
            }

            debug!(field = name, shape = ?field.shape(), "Materialized field");
            grid.insert_field(name, field);
        }

        Ok(grid)
    }
}

fn require(
    source: &dyn GridSource,
    canonical: &str,
    mapping: &FieldMapping,
    location: &str,
) -> Result<()> {
    if source.contains(&mapping.source_name) {
        Ok(())
    } else {
        Err(ForcingError::MissingSourceField {
            canonical: canonical.to_string(),
            source_name: mapping.source_name.clone(),
            location: location.to_string(),
        })
    }
}

fn coord_mapping<'s>(schema: &'s ProviderSchema, canonical: &str) -> Result<&'s FieldMapping> {
    schema.coord(canonical).ok_or_else(|| {
        ForcingError::config(format!(
            "provider {} has no mapping for coordinate {}",
            schema.id(),
            canonical
        ))
    })
}

fn read_coord(source: &dyn GridSource, schema: &ProviderSchema, canonical: &str) -> Result<Vec<f64>> {
    let mapping = coord_mapping(schema, canonical)?;
    let header = source.header(&mapping.source_name)?;
    if header.rank() != 1 {
        return Err(ForcingError::shape_mismatch(format!(
            "coordinate {} ({}) has rank {}, expected 1",
            canonical,
            mapping.source_name,
            header.rank()
        )));
    }
    source.read(&mapping.source_name)
}

/// After renaming (and depth synthesis), a field must span exactly the
/// domain's canonical coordinates.
fn check_dimensions(
    name: &str,
    header: &VariableInfo,
    renames: &HashMap<&str, &str>,
    expected: &BTreeSet<&str>,
    synthesize_depth: bool,
) -> Result<()> {
    let mut dims: Vec<&str> = header
        .dims
        .iter()
        .map(|d| renames.get(d.as_str()).copied().unwrap_or(d.as_str()))
        .collect();
    if synthesize_depth {
        dims.push(axis::DEPTH);
    }

    let actual: BTreeSet<&str> = dims.iter().copied().collect();
    if actual.len() != dims.len() || &actual != expected {
        return Err(ForcingError::shape_mismatch(format!(
            "{} ({}) has dimensions {:?}, expected {:?}",
            name, header.name, header.dims, expected
        )));
    }
    Ok(())
}

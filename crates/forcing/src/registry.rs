//! Provider mapping registry.
//!
//! Loads the per-provider field mappings (`config/providers.yaml`) and
//! validates every provider schema against the [`Ontology`] before any file
//! is opened. A provider that leaves a canonical key unmapped, or maps a key
//! the ontology does not know, is rejected at load time with
//! [`ForcingError::SchemaMismatch`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ForcingError, Result};
use crate::ontology::{axis, Domain, Ontology};

/// The mapping document shipped with the crate.
const BUILTIN_PROVIDERS: &str = include_str!("../../../config/providers.yaml");

fn default_mulc() -> f64 {
    1.0
}

/// How a canonical field is read from a provider file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldMapping {
    /// Variable name in the provider file
    #[serde(rename = "name")]
    pub source_name: String,
    /// Added to every sample before scaling
    #[serde(rename = "addc", default)]
    pub add_offset_correction: f64,
    /// Multiplies every sample after the additive correction
    #[serde(rename = "mulc", default = "default_mulc")]
    pub mul_scale_correction: f64,
}

impl FieldMapping {
    /// A mapping without unit correction.
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            add_offset_correction: 0.0,
            mul_scale_correction: 1.0,
        }
    }

    pub fn with_correction(mut self, add: f64, mul: f64) -> Self {
        self.add_offset_correction = add;
        self.mul_scale_correction = mul;
        self
    }

    pub fn is_identity(&self) -> bool {
        self.add_offset_correction == 0.0 && self.mul_scale_correction == 1.0
    }

    /// Apply the unit correction in place: `(value + addc) * mulc`.
    pub fn apply(&self, values: &mut [f64]) {
        if self.add_offset_correction != 0.0 {
            values
                .iter_mut()
                .for_each(|v| *v += self.add_offset_correction);
        }
        if self.mul_scale_correction != 1.0 {
            values
                .iter_mut()
                .for_each(|v| *v *= self.mul_scale_correction);
        }
    }
}

/// Replicate depth-less fields across nominal depth levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DepthSynthesisSpec {
    pub output_levels: Vec<f64>,
}

/// One provider entry of the mapping document, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderSchemaConfig {
    pub coords: BTreeMap<String, FieldMapping>,
    pub data_vars: BTreeMap<String, FieldMapping>,
    #[serde(default)]
    pub depth_mapping: Option<DepthSynthesisSpec>,
}

/// The provider mapping document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    #[serde(default)]
    pub meteo: BTreeMap<String, ProviderSchemaConfig>,
    #[serde(default)]
    pub ocean: BTreeMap<String, ProviderSchemaConfig>,
    #[serde(default)]
    pub waves: BTreeMap<String, ProviderSchemaConfig>,
}

impl RegistryConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load and parse a mapping document from disk.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            ForcingError::config(format!(
                "failed to read provider mappings from {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    /// The mappings shipped in `config/providers.yaml`.
    pub fn builtin() -> Result<Self> {
        Self::from_yaml_str(BUILTIN_PROVIDERS)
    }

    pub fn providers(&self, domain: Domain) -> &BTreeMap<String, ProviderSchemaConfig> {
        match domain {
            Domain::Meteo => &self.meteo,
            Domain::Ocean => &self.ocean,
            Domain::Waves => &self.waves,
        }
    }
}

/// Identifier of a validated provider.
///
/// Only the registry hands these out, so holding one means the provider
/// exists and its schema passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderId {
    domain: Domain,
    name: String,
}

impl ProviderId {
    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.domain, self.name)
    }
}

/// A validated provider schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSchema {
    id: ProviderId,
    coords: BTreeMap<String, FieldMapping>,
    data_vars: BTreeMap<String, FieldMapping>,
    depth_synthesis: Option<DepthSynthesisSpec>,
}

impl ProviderSchema {
    /// Validate a provider entry against the ontology.
    ///
    /// A synthesized depth axis counts as the mapping of the canonical
    /// `depth` coordinate.
    pub fn new(
        domain: Domain,
        provider: &str,
        config: ProviderSchemaConfig,
        ontology: &Ontology,
    ) -> Result<Self> {
        let expected = ontology.domain(domain);

        let mut coord_keys: Vec<&str> = config.coords.keys().map(String::as_str).collect();
        if config.depth_mapping.is_some() {
            if config.coords.contains_key(axis::DEPTH) {
                return Err(ForcingError::SchemaMismatch {
                    domain,
                    provider: provider.to_string(),
                    kind: "coordinate",
                    missing: Vec::new(),
                    extra: vec![axis::DEPTH.to_string()],
                });
            }
            coord_keys.push(axis::DEPTH);
        }
        check_keys(domain, provider, "coordinate", &expected.coord_keys(), &coord_keys)?;

        let data_keys: Vec<&str> = config.data_vars.keys().map(String::as_str).collect();
        check_keys(domain, provider, "data variable", &expected.data_var_keys(), &data_keys)?;

        if let Some(spec) = &config.depth_mapping {
            if spec.output_levels.is_empty() {
                return Err(ForcingError::config(format!(
                    "{}/{}: depth_mapping.output_levels is empty",
                    domain, provider
                )));
            }
            if spec.output_levels.iter().any(|l| !l.is_finite()) {
                return Err(ForcingError::config(format!(
                    "{}/{}: depth_mapping.output_levels must be finite",
                    domain, provider
                )));
            }
        }

        Ok(Self {
            id: ProviderId {
                domain,
                name: provider.to_string(),
            },
            coords: config.coords,
            data_vars: config.data_vars,
            depth_synthesis: config.depth_mapping,
        })
    }

    pub fn id(&self) -> &ProviderId {
        &self.id
    }

    pub fn domain(&self) -> Domain {
        self.id.domain
    }

    pub fn coords(&self) -> &BTreeMap<String, FieldMapping> {
        &self.coords
    }

    pub fn data_vars(&self) -> &BTreeMap<String, FieldMapping> {
        &self.data_vars
    }

    pub fn coord(&self, canonical: &str) -> Option<&FieldMapping> {
        self.coords.get(canonical)
    }

    pub fn data_var(&self, canonical: &str) -> Option<&FieldMapping> {
        self.data_vars.get(canonical)
    }

    pub fn depth_synthesis(&self) -> Option<&DepthSynthesisSpec> {
        self.depth_synthesis.as_ref()
    }

    /// Source dimension name -> canonical coordinate name.
    pub fn dimension_renames(&self) -> HashMap<&str, &str> {
        self.coords
            .iter()
            .map(|(canonical, mapping)| (mapping.source_name.as_str(), canonical.as_str()))
            .collect()
    }
}

fn check_keys(
    domain: Domain,
    provider: &str,
    kind: &'static str,
    expected: &BTreeSet<&str>,
    actual: &[&str],
) -> Result<()> {
    let actual: BTreeSet<&str> = actual.iter().copied().collect();
    let missing: Vec<String> = expected.difference(&actual).map(|k| k.to_string()).collect();
    let extra: Vec<String> = actual.difference(expected).map(|k| k.to_string()).collect();

    if missing.is_empty() && extra.is_empty() {
        return Ok(());
    }

    Err(ForcingError::SchemaMismatch {
        domain,
        provider: provider.to_string(),
        kind,
        missing,
        extra,
    })
}

/// All validated provider schemas, keyed by domain and provider id.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    schemas: BTreeMap<ProviderId, ProviderSchema>,
}

impl ProviderRegistry {
    /// Validate every provider in the document. Fails on the first mismatch.
    pub fn from_config(config: &RegistryConfig, ontology: &Ontology) -> Result<Self> {
        let mut schemas = BTreeMap::new();

        for domain in Domain::ALL {
            for (provider, entry) in config.providers(domain) {
                let schema = ProviderSchema::new(domain, provider, entry.clone(), ontology)?;
                debug!(provider = %schema.id(), "Validated provider schema");
                schemas.insert(schema.id().clone(), schema);
            }
        }

        Ok(Self { schemas })
    }

    /// Registry built from the shipped mapping document.
    pub fn builtin(ontology: &Ontology) -> Result<Self> {
        Self::from_config(&RegistryConfig::builtin()?, ontology)
    }

    /// Look up a provider schema.
    pub fn load(&self, domain: Domain, provider: &str) -> Result<&ProviderSchema> {
        let id = ProviderId {
            domain,
            name: provider.to_string(),
        };
        self.schemas
            .get(&id)
            .ok_or_else(|| ForcingError::UnknownProvider {
                domain,
                provider: provider.to_string(),
                known: self
                    .provider_ids(domain)
                    .into_iter()
                    .map(|id| id.name().to_string())
                    .collect(),
            })
    }

    /// Look up the default provider of a domain.
    pub fn load_default(&self, domain: Domain) -> Result<&ProviderSchema> {
        self.load(domain, domain.default_provider())
    }

    pub fn provider_ids(&self, domain: Domain) -> Vec<&ProviderId> {
        self.schemas
            .keys()
            .filter(|id| id.domain == domain)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wave_config() -> ProviderSchemaConfig {
        ProviderSchemaConfig {
            coords: [
                ("time", "time"),
                ("latitude", "lat"),
                ("longitude", "lon"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), FieldMapping::new(v)))
            .collect(),
            data_vars: [("wsh", "VHM0"), ("wdir", "VMDR"), ("wper", "VTM02")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), FieldMapping::new(v)))
                .collect(),
            depth_mapping: None,
        }
    }

    #[test]
    fn test_builtin_registry_validates() {
        let ontology = Ontology::builtin();
        let registry = ProviderRegistry::builtin(&ontology).unwrap();

        let gfs = registry.load(Domain::Meteo, "gfsnc_wgrib2").unwrap();
        let pmsl = gfs.data_var("pmsl").unwrap();
        assert_eq!(pmsl.source_name, "PRES_surface");
        assert_eq!(pmsl.mul_scale_correction, 0.01);
        assert_eq!(pmsl.add_offset_correction, 0.0);

        let tair = gfs.data_var("tair2m").unwrap();
        assert_eq!(tair.add_offset_correction, -273.15);
        assert_eq!(tair.mul_scale_correction, 1.0);

        let surface = registry.load(Domain::Ocean, "cmems_surface").unwrap();
        assert_eq!(
            surface.depth_synthesis().unwrap().output_levels,
            vec![1.0, 2.0, 4.0, 6.0]
        );
        assert!(registry.load(Domain::Ocean, "cmems").unwrap().depth_synthesis().is_none());
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_default_providers_exist() {
        let ontology = Ontology::builtin();
        let registry = ProviderRegistry::builtin(&ontology).unwrap();
        for domain in Domain::ALL {
            let schema = registry.load_default(domain).unwrap();
            assert_eq!(schema.domain(), domain);
        }
    }

    #[test]
    fn test_unknown_provider() {
        let ontology = Ontology::builtin();
        let registry = ProviderRegistry::builtin(&ontology).unwrap();
        match registry.load(Domain::Waves, "ecmwf") {
            Err(ForcingError::UnknownProvider { known, .. }) => {
                assert_eq!(known, vec!["cmems".to_string()]);
            }
            other => panic!("expected UnknownProvider, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_data_var_is_rejected() {
        let ontology = Ontology::builtin();
        let mut config = wave_config();
        config.data_vars.remove("wper");

        match ProviderSchema::new(Domain::Waves, "test", config, &ontology) {
            Err(ForcingError::SchemaMismatch {
                kind,
                missing,
                extra,
                ..
            }) => {
                assert_eq!(kind, "data variable");
                assert_eq!(missing, vec!["wper".to_string()]);
                assert!(extra.is_empty());
            }
            other => panic!("expected SchemaMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_extra_coordinate_is_rejected() {
        let ontology = Ontology::builtin();
        let mut config = wave_config();
        config
            .coords
            .insert("height".to_string(), FieldMapping::new("height"));

        match ProviderSchema::new(Domain::Waves, "test", config, &ontology) {
            Err(ForcingError::SchemaMismatch {
                kind,
                missing,
                extra,
                ..
            }) => {
                assert_eq!(kind, "coordinate");
                assert!(missing.is_empty());
                assert_eq!(extra, vec!["height".to_string()]);
            }
            other => panic!("expected SchemaMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_depth_synthesis_counts_as_depth_coordinate() {
        let ontology = Ontology::builtin();
        let mut config = wave_config();
        config.data_vars = ["uvel", "vvel", "wvel", "potemp", "psal"]
            .into_iter()
            .map(|k| (k.to_string(), FieldMapping::new(k)))
            .collect();

        // Without depth the ocean coordinate set is incomplete.
        assert!(ProviderSchema::new(Domain::Ocean, "surface", config.clone(), &ontology).is_err());

        config.depth_mapping = Some(DepthSynthesisSpec {
            output_levels: vec![1.0, 2.0, 4.0, 6.0],
        });
        let schema = ProviderSchema::new(Domain::Ocean, "surface", config.clone(), &ontology).unwrap();
        assert!(schema.depth_synthesis().is_some());

        // Synthesized depth plus an explicit depth coordinate is one key too many.
        config
            .coords
            .insert("depth".to_string(), FieldMapping::new("depth"));
        match ProviderSchema::new(Domain::Ocean, "surface", config, &ontology) {
            Err(ForcingError::SchemaMismatch {
                kind,
                missing,
                extra,
                ..
            }) => {
                assert_eq!(kind, "coordinate");
                assert!(missing.is_empty());
                assert_eq!(extra, vec!["depth".to_string()]);
            }
            other => panic!("expected SchemaMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_depth_synthesis_rejected_for_meteo() {
        let ontology = Ontology::builtin();
        let mut config = wave_config();
        config.data_vars = ["pmsl", "tair2m", "x_wind10", "y_wind10"]
            .into_iter()
            .map(|k| (k.to_string(), FieldMapping::new(k)))
            .collect();
        config.depth_mapping = Some(DepthSynthesisSpec {
            output_levels: vec![1.0],
        });

        assert!(matches!(
            ProviderSchema::new(Domain::Meteo, "gfs", config, &ontology),
            Err(ForcingError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_depth_levels_rejected() {
        let ontology = Ontology::builtin();
        let mut config = wave_config();
        config.data_vars = ["uvel", "vvel", "wvel", "potemp", "psal"]
            .into_iter()
            .map(|k| (k.to_string(), FieldMapping::new(k)))
            .collect();
        config.depth_mapping = Some(DepthSynthesisSpec {
            output_levels: vec![],
        });

        assert!(matches!(
            ProviderSchema::new(Domain::Ocean, "surface", config, &ontology),
            Err(ForcingError::Config(_))
        ));
    }

    #[test]
    fn test_yaml_defaults_and_unknown_keys() {
        let yaml = r#"
waves:
  custom:
    coords:
      time: { name: t }
      latitude: { name: lat }
      longitude: { name: lon }
    data_vars:
      wsh: { name: swh, mulc: 2.0 }
      wdir: { name: mwd }
      wper: { name: mwp, addc: 0.5 }
"#;
        let config = RegistryConfig::from_yaml_str(yaml).unwrap();
        let entry = &config.waves["custom"];
        assert_eq!(entry.data_vars["wdir"], FieldMapping::new("mwd"));
        assert_eq!(entry.data_vars["wsh"].mul_scale_correction, 2.0);
        assert_eq!(entry.data_vars["wper"].add_offset_correction, 0.5);

        let bad = "waves:\n  x:\n    coords: {}\n    data_vars: {}\n    scale: 3\n";
        assert!(matches!(
            RegistryConfig::from_yaml_str(bad),
            Err(ForcingError::Config(_))
        ));
    }

    #[test]
    fn test_invalid_provider_fails_whole_registry() {
        let ontology = Ontology::builtin();
        let mut config = RegistryConfig::builtin().unwrap();
        let mut broken = wave_config();
        broken.data_vars.remove("wsh");
        config.waves.insert("broken".to_string(), broken);

        assert!(ProviderRegistry::from_config(&config, &ontology).is_err());
    }

    #[test]
    fn test_field_mapping_apply() {
        let mut values = vec![101325.0, 100000.0];
        FieldMapping::new("PRES_surface")
            .with_correction(0.0, 0.01)
            .apply(&mut values);
        assert!((values[0] - 1013.25).abs() < 1e-9);
        assert!((values[1] - 1000.0).abs() < 1e-9);

        let mut kelvin = vec![273.15, f64::NAN];
        FieldMapping::new("TMP_2maboveground")
            .with_correction(-273.15, 1.0)
            .apply(&mut kelvin);
        assert_eq!(kelvin[0], 0.0);
        assert!(kelvin[1].is_nan());
    }

    #[test]
    fn test_field_mapping_identity() {
        assert!(FieldMapping::new("VHM0").is_identity());
        assert!(!FieldMapping::new("PRES_surface")
            .with_correction(0.0, 0.01)
            .is_identity());
        assert!(!FieldMapping::new("TMP_2maboveground")
            .with_correction(-273.15, 1.0)
            .is_identity());

        let ontology = Ontology::builtin();
        let registry = ProviderRegistry::builtin(&ontology).unwrap();
        let waves = registry.load(Domain::Waves, "cmems").unwrap();
        for name in ["wsh", "wdir", "wper"] {
            assert!(waves.data_var(name).unwrap().is_identity(), "{}", name);
        }
        let gfs = registry.load(Domain::Meteo, "gfsnc_wgrib2").unwrap();
        assert!(!gfs.data_var("pmsl").unwrap().is_identity());
    }

    #[test]
    fn test_dimension_renames() {
        let ontology = Ontology::builtin();
        let schema = ProviderSchema::new(Domain::Waves, "test", wave_config(), &ontology).unwrap();
        let renames = schema.dimension_renames();
        assert_eq!(renames.get("lat"), Some(&"latitude"));
        assert_eq!(renames.get("lon"), Some(&"longitude"));
        assert_eq!(renames.get("time"), Some(&"time"));
    }
}

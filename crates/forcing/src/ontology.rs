//! Canonical fields and coordinates expected by the spill model.
//!
//! The ontology is immutable reference data. It is built once (usually with
//! [`Ontology::builtin`]) and passed explicitly to the registry and the
//! pipeline; tests build synthetic ones with [`Ontology::new`].

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical coordinate names.
pub mod axis {
    /// Time axis
    pub const TIME: &str = "time";
    /// Vertical axis (ocean only)
    pub const DEPTH: &str = "depth";
    /// Latitude axis
    pub const LATITUDE: &str = "latitude";
    /// Longitude axis
    pub const LONGITUDE: &str = "longitude";
}

/// Forcing domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Domain {
    #[serde(rename = "meteo")]
    Meteo,
    #[serde(rename = "ocean")]
    Ocean,
    #[serde(rename = "waves")]
    Waves,
}

impl Domain {
    /// All domains, in configuration order.
    pub const ALL: [Domain; 3] = [Domain::Meteo, Domain::Ocean, Domain::Waves];

    /// Get the configuration key as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Meteo => "meteo",
            Self::Ocean => "ocean",
            Self::Waves => "waves",
        }
    }

    /// Whether the providers of this domain publish longitudes in 0..360.
    ///
    /// Caller bounding boxes are converted to that convention before
    /// subsetting, and output longitudes are rewrapped to -180..180.
    pub fn uses_0_360_longitude(&self) -> bool {
        matches!(self, Self::Meteo)
    }

    /// Provider used by the per-domain batch entry points.
    pub fn default_provider(&self) -> &'static str {
        match self {
            Self::Meteo => "gfsnc_wgrib2",
            Self::Ocean => "cmems",
            Self::Waves => "cmems",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "meteo" | "meteorology" => Ok(Self::Meteo),
            "ocean" => Ok(Self::Ocean),
            "waves" | "wave" => Ok(Self::Waves),
            other => Err(format!(
                "unknown domain '{}', expected one of meteo, ocean, waves",
                other
            )),
        }
    }
}

/// A canonical variable or coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CanonicalField {
    pub name: String,
    pub standard_name: String,
    pub long_name: String,
    pub units: String,
}

impl CanonicalField {
    pub fn new(name: &str, standard_name: &str, long_name: &str, units: &str) -> Self {
        Self {
            name: name.to_string(),
            standard_name: standard_name.to_string(),
            long_name: long_name.to_string(),
            units: units.to_string(),
        }
    }
}

/// Canonical coordinates and data variables of one domain.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainOntology {
    coords: Vec<CanonicalField>,
    data_vars: Vec<CanonicalField>,
}

impl DomainOntology {
    pub fn new(coords: Vec<CanonicalField>, data_vars: Vec<CanonicalField>) -> Self {
        Self { coords, data_vars }
    }

    /// Coordinates, in output order.
    pub fn coords(&self) -> &[CanonicalField] {
        &self.coords
    }

    /// Data variables, in output order.
    pub fn data_vars(&self) -> &[CanonicalField] {
        &self.data_vars
    }

    pub fn coord(&self, name: &str) -> Option<&CanonicalField> {
        self.coords.iter().find(|c| c.name == name)
    }

    pub fn data_var(&self, name: &str) -> Option<&CanonicalField> {
        self.data_vars.iter().find(|v| v.name == name)
    }

    pub fn coord_keys(&self) -> BTreeSet<&str> {
        self.coords.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn data_var_keys(&self) -> BTreeSet<&str> {
        self.data_vars.iter().map(|v| v.name.as_str()).collect()
    }
}

/// The full ontology: one [`DomainOntology`] per [`Domain`].
#[derive(Debug, Clone, PartialEq)]
pub struct Ontology {
    meteo: DomainOntology,
    ocean: DomainOntology,
    waves: DomainOntology,
}

impl Ontology {
    pub fn new(meteo: DomainOntology, ocean: DomainOntology, waves: DomainOntology) -> Self {
        Self {
            meteo,
            ocean,
            waves,
        }
    }

    pub fn domain(&self, domain: Domain) -> &DomainOntology {
        match domain {
            Domain::Meteo => &self.meteo,
            Domain::Ocean => &self.ocean,
            Domain::Waves => &self.waves,
        }
    }

    /// The schema the spill model reads.
    pub fn builtin() -> Self {
        let meteo = DomainOntology::new(
            vec![time(), latitude(), longitude()],
            vec![
                CanonicalField::new(
                    "pmsl",
                    "air_pressure_at_sea_level",
                    "Air Pressure at Sea Level",
                    "hPa",
                ),
                CanonicalField::new(
                    "tair2m",
                    "air_temperature",
                    "Air Temperature at 2 meters height above Sea Level",
                    "degrees C",
                ),
                CanonicalField::new(
                    "x_wind10",
                    "x_wind",
                    "Wind Speed along East-West Direction at 10 meters above Sea Level",
                    "m s-1",
                ),
                CanonicalField::new(
                    "y_wind10",
                    "y_wind",
                    "Wind Speed along North-South Direction at 10 meters above Sea Level",
                    "m s-1",
                ),
            ],
        );

        let ocean = DomainOntology::new(
            vec![time(), depth(), latitude(), longitude()],
            vec![
                CanonicalField::new(
                    "uvel",
                    "sea_water_x_velocity",
                    "Velocity Zonal Component",
                    "m s-1",
                ),
                CanonicalField::new(
                    "vvel",
                    "sea_water_y_velocity",
                    "Velocity Meridional Component",
                    "m s-1",
                ),
                CanonicalField::new(
                    "wvel",
                    "sea_water_z_velocity",
                    "Velocity Vertical Component",
                    "m s-1",
                ),
                CanonicalField::new(
                    "potemp",
                    "sea_water_potential_temperature",
                    "Potential Temperature",
                    "degrees C",
                ),
                CanonicalField::new("psal", "sea_water_salinity", "Practical Salinity", "psu"),
            ],
        );

        let waves = DomainOntology::new(
            vec![time(), latitude(), longitude()],
            vec![
                CanonicalField::new(
                    "wsh",
                    "sea_surface_wave_significant_height",
                    "Sea Surface Wave Significant Height",
                    "m",
                ),
                CanonicalField::new(
                    "wdir",
                    "sea_surface_wave_to_direction",
                    "Sea Surface Wave Direction",
                    "degrees",
                ),
                CanonicalField::new(
                    "wper",
                    "sea_surface_wave_zero_upcrossing_period",
                    "Mean Wave Period",
                    "s",
                ),
            ],
        );

        Self::new(meteo, ocean, waves)
    }
}

fn time() -> CanonicalField {
    // Units are rewritten per file by the time normalizer.
    CanonicalField::new(axis::TIME, "time", "Time", "hours")
}

fn depth() -> CanonicalField {
    CanonicalField::new(axis::DEPTH, "depth", "Depth", "m")
}

fn latitude() -> CanonicalField {
    CanonicalField::new(axis::LATITUDE, "latitude", "Latitude", "degrees_north")
}

fn longitude() -> CanonicalField {
    CanonicalField::new(axis::LONGITUDE, "longitude", "Longitude", "degrees_east")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_key_sets() {
        let ontology = Ontology::builtin();

        let meteo = ontology.domain(Domain::Meteo);
        assert_eq!(
            meteo.data_var_keys().into_iter().collect::<Vec<_>>(),
            vec!["pmsl", "tair2m", "x_wind10", "y_wind10"]
        );
        assert!(!meteo.coord_keys().contains(axis::DEPTH));

        let ocean = ontology.domain(Domain::Ocean);
        assert_eq!(ocean.data_vars().len(), 5);
        assert!(ocean.coord_keys().contains(axis::DEPTH));

        let waves = ontology.domain(Domain::Waves);
        assert_eq!(waves.data_var("wsh").unwrap().units, "m");
    }

    #[test]
    fn test_pmsl_metadata() {
        let ontology = Ontology::builtin();
        let pmsl = ontology.domain(Domain::Meteo).data_var("pmsl").unwrap();
        assert_eq!(pmsl.standard_name, "air_pressure_at_sea_level");
        assert_eq!(pmsl.units, "hPa");
    }

    #[test]
    fn test_domain_from_str() {
        assert_eq!("meteo".parse::<Domain>(), Ok(Domain::Meteo));
        assert_eq!("OCEAN".parse::<Domain>(), Ok(Domain::Ocean));
        assert_eq!("wave".parse::<Domain>(), Ok(Domain::Waves));
        assert!("atmos".parse::<Domain>().is_err());
    }

    #[test]
    fn test_longitude_conventions() {
        assert!(Domain::Meteo.uses_0_360_longitude());
        assert!(!Domain::Ocean.uses_0_360_longitude());
        assert!(!Domain::Waves.uses_0_360_longitude());
    }
}

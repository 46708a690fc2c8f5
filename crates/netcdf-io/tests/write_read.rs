//! Integration test: write a dataset with the writer and read it back.

use netcdf_io::{
    write_dataset, DatasetSpec, DimensionSpec, NcReader, VariableData, VariableSpec,
};

fn packed_dataset() -> DatasetSpec {
    DatasetSpec {
        dimensions: vec![
            DimensionSpec::unlimited("time", 2),
            DimensionSpec::fixed("latitude", 2),
            DimensionSpec::fixed("longitude", 3),
        ],
        variables: vec![
            VariableSpec::new("time", &["time"], VariableData::F64(vec![0.0, 3600.0]))
                .with_attribute("units", "seconds since 2025-01-21")
                .with_attribute("calendar", "gregorian"),
            VariableSpec::new("latitude", &["latitude"], VariableData::F32(vec![38.0, 39.0])),
            VariableSpec::new(
                "longitude",
                &["longitude"],
                VariableData::F32(vec![18.0, 18.5, 19.0]),
            ),
            VariableSpec::new(
                "packed",
                &["time", "latitude", "longitude"],
                VariableData::I16(vec![0, 1, 2, 3, 4, i16::MIN, -1, -2, -3, -4, -5, -6]),
            )
            .with_attribute("scale_factor", 0.5f64)
            .with_attribute("add_offset", 100.0f64)
            .with_attribute("missing_value", i16::MIN),
        ],
    }
}

#[test]
fn test_write_then_read_unpacks_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("packed.nc");
    write_dataset(&path, &packed_dataset()).unwrap();

    let reader = NcReader::open(&path).unwrap();
    assert!(reader.has_variable("packed"));
    assert!(reader.is_unlimited("time").unwrap());
    assert!(!reader.is_unlimited("latitude").unwrap());

    let var = reader.read_variable("packed").unwrap();
    assert_eq!(var.info.dims, vec!["time", "latitude", "longitude"]);
    assert_eq!(var.info.shape, vec![2, 2, 3]);
    assert_eq!(var.values[0], 100.0);
    assert_eq!(var.values[4], 102.0);
    assert!(var.values[5].is_nan());
    assert_eq!(var.values[11], 97.0);
}

#[test]
fn test_read_time_attributes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("time.nc");
    write_dataset(&path, &packed_dataset()).unwrap();

    let reader = NcReader::open(&path).unwrap();
    let info = reader.describe("time").unwrap();
    assert_eq!(info.units.as_deref(), Some("seconds since 2025-01-21"));
    assert_eq!(info.calendar.as_deref(), Some("gregorian"));
    assert_eq!(
        reader.number_attribute("packed", "scale_factor").unwrap(),
        Some(0.5)
    );
    assert_eq!(reader.string_attribute("packed", "units").unwrap(), None);
}

#[test]
fn test_missing_variable_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.nc");
    write_dataset(&path, &packed_dataset()).unwrap();

    let reader = NcReader::open(&path).unwrap();
    assert!(!reader.has_variable("PRES_surface"));
    assert!(reader.read_variable("PRES_surface").is_err());
}

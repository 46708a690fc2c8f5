//! Common test fixtures for spill-forcing tests.
//!
//! Bounding boxes are `(lon_min, lon_max, lat_min, lat_max)`, the order the
//! command line takes them in.

/// Common bounding box definitions for testing.
pub mod bbox {
    /// Ionian Sea off Calabria
    pub const IONIAN: (f64, f64, f64, f64) = (18.16, 19.26, 38.09, 39.18);

    /// Straddles the Greenwich meridian (a seam crossing on 0..360 grids)
    pub const GULF_OF_GUINEA: (f64, f64, f64, f64) = (-3.0, 3.0, -2.0, 2.0);

    /// Open North Atlantic, away from any test grid
    pub const NORTH_ATLANTIC: (f64, f64, f64, f64) = (-40.0, -30.0, 45.0, 55.0);
}

/// Time encodings seen in provider files.
pub mod time {
    /// GFS files produced by wgrib2
    pub const GFS_UNITS: &str = "seconds since 1970-01-01 00:00:00.0 0:00";

    /// CMEMS hourly products
    pub const CMEMS_UNITS: &str = "hours since 1950-01-01";

    /// 2025-01-21 00:00:00 as seconds since the Unix epoch
    pub const EPOCH_2025_01_21: f64 = 1_737_417_600.0;

    /// 2025-01-21 00:00:00 as hours since 1950-01-01
    pub const HOURS_1950_TO_2025_01_21: f64 = 657_936.0;
}

//! Time axis normalization.
//!
//! Provider time axes come in any CF `"<unit> since <reference>"` encoding.
//! The model expects hours elapsed since the first time step, with that step
//! as the reference of the units string and a fixed calendar tag.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};

use crate::error::{ForcingError, Result};

/// Calendar tag written to every output time axis.
pub const OUTPUT_CALENDAR: &str = "julian";

/// Reference timestamp format embedded in the output units string.
pub const REFERENCE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Unit of a CF time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Length of one unit in seconds.
    pub fn seconds(&self) -> f64 {
        match self {
            Self::Seconds => 1.0,
            Self::Minutes => 60.0,
            Self::Hours => 3600.0,
            Self::Days => 86400.0,
        }
    }

    /// Convert an elapsed amount in this unit to hours.
    pub fn to_hours(&self, elapsed: f64) -> f64 {
        match self {
            Self::Seconds => elapsed / 3600.0,
            Self::Minutes => elapsed / 60.0,
            Self::Hours => elapsed,
            Self::Days => elapsed * 24.0,
        }
    }
}

impl FromStr for TimeUnit {
    type Err = ForcingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "seconds" | "second" | "secs" | "sec" | "s" => Ok(Self::Seconds),
            "minutes" | "minute" | "mins" | "min" => Ok(Self::Minutes),
            "hours" | "hour" | "hrs" | "hr" | "h" => Ok(Self::Hours),
            "days" | "day" | "d" => Ok(Self::Days),
            other => Err(ForcingError::invalid_time_units(format!(
                "unsupported time unit '{}'",
                other
            ))),
        }
    }
}

/// A parsed CF time units string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CfTimeUnits {
    pub unit: TimeUnit,
    pub reference: NaiveDateTime,
}

impl CfTimeUnits {
    /// Parse `"<unit> since <reference>"`, case-insensitively.
    pub fn parse(units: &str) -> Result<Self> {
        let mut parts = units.split_whitespace();
        let unit = parts
            .next()
            .ok_or_else(|| ForcingError::invalid_time_units("empty units string"))?
            .parse::<TimeUnit>()?;

        match parts.next() {
            Some(word) if word.eq_ignore_ascii_case("since") => {}
            _ => {
                return Err(ForcingError::invalid_time_units(format!(
                    "expected '<unit> since <reference>', got '{}'",
                    units
                )))
            }
        }

        let reference = parts.collect::<Vec<_>>().join(" ");
        let reference = parse_reference(&reference).ok_or_else(|| {
            ForcingError::invalid_time_units(format!("unparseable reference time in '{}'", units))
        })?;

        Ok(Self { unit, reference })
    }

    /// Decode a raw time value to an absolute timestamp.
    pub fn decode(&self, value: f64) -> Result<NaiveDateTime> {
        if !value.is_finite() {
            return Err(ForcingError::invalid_time_units(format!(
                "non-finite time value {}",
                value
            )));
        }
        let out_of_range =
            || ForcingError::invalid_time_units(format!("time value {} out of range", value));

        let millis = (value * self.unit.seconds() * 1000.0).round();
        if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
            return Err(out_of_range());
        }
        let elapsed = Duration::try_milliseconds(millis as i64).ok_or_else(out_of_range)?;
        self.reference
            .checked_add_signed(elapsed)
            .ok_or_else(out_of_range)
    }
}

impl fmt::Display for CfTimeUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
        };
        write!(f, "{} since {}", unit, self.reference.format(REFERENCE_FORMAT))
    }
}

fn parse_reference(text: &str) -> Option<NaiveDateTime> {
    let mut text = text.trim();
    for suffix in ["UTC", "utc", "Z", "z"] {
        if let Some(stripped) = text.strip_suffix(suffix) {
            text = stripped.trim_end();
            break;
        }
    }

    // wgrib2 writes a trailing offset: "1970-01-01 00:00:00.0 0:00"
    let mut offset_minutes = 0;
    if let Some((head, last)) = text.rsplit_once(' ') {
        if head.contains(':') || head.len() > 10 {
            if let Some(minutes) = parse_utc_offset(last) {
                offset_minutes = minutes;
                text = head.trim_end();
            }
        }
    }

    let text = text.replacen(|c: char| c == 'T' || c == 't', " ", 1);

    // Offset attached to the time: "2025-01-21 00:00:00+00:00"
    if let Some(zoned) = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M%:z"]
        .iter()
        .find_map(|format| DateTime::parse_from_str(&text, format).ok())
    {
        return zoned
            .naive_utc()
            .checked_sub_signed(Duration::minutes(offset_minutes));
    }

    let local = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(&text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    local.checked_sub_signed(Duration::minutes(offset_minutes))
}

/// Parse `[+-]H[H][:MM]` into minutes east of UTC.
fn parse_utc_offset(text: &str) -> Option<i64> {
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, text.strip_prefix('+').unwrap_or(text)),
    };
    let (hours, minutes) = digits.split_once(':').unwrap_or((digits, "0"));
    if hours.is_empty() || hours.len() > 2 || !hours.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !minutes.bytes().all(|b| b.is_ascii_digit()) || minutes.len() > 2 {
        return None;
    }
    let hours: i64 = hours.parse().ok()?;
    let minutes: i64 = minutes.parse().ok()?;
    Some(sign * (hours * 60 + minutes))
}

/// A time axis in hours since its first sample.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTime {
    pub values: Vec<f32>,
    /// `"Hours since YYYY-MM-DD HH:MM:SS"`
    pub units: String,
    pub calendar: String,
    /// Absolute timestamp of the first sample
    pub reference: NaiveDateTime,
}

/// Re-express a raw time axis as hours since its first sample.
pub fn normalize(values: &[f64], units: Option<&str>) -> Result<NormalizedTime> {
    let units = units.ok_or_else(|| ForcingError::invalid_time_units("time axis has no units attribute"))?;
    let cf = CfTimeUnits::parse(units)?;

    let first = *values
        .first()
        .ok_or_else(|| ForcingError::invalid_time_units("time axis is empty"))?;
    let reference = cf.decode(first)?;

    let values = values
        .iter()
        .map(|v| {
            if v.is_finite() {
                Ok(cf.unit.to_hours(v - first) as f32)
            } else {
                Err(ForcingError::invalid_time_units(format!("non-finite time value {}", v)))
            }
        })
        .collect::<Result<Vec<f32>>>()?;

    Ok(NormalizedTime {
        values,
        units: format!("Hours since {}", reference.format(REFERENCE_FORMAT)),
        calendar: OUTPUT_CALENDAR.to_string(),
        reference,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_to_hours() {
        let time = normalize(&[0.0, 3600.0, 7200.0], Some("seconds since 2025-01-21")).unwrap();
        assert_eq!(time.values, vec![0.0, 1.0, 2.0]);
        assert_eq!(time.units, "Hours since 2025-01-21 00:00:00");
        assert_eq!(time.calendar, "julian");
    }

    #[test]
    fn test_reference_moves_to_first_sample() {
        let time = normalize(&[30.0, 90.0, 150.0], Some("minutes since 2024-12-31 23:00:00")).unwrap();
        assert_eq!(time.values, vec![0.0, 1.0, 2.0]);
        assert_eq!(time.units, "Hours since 2024-12-31 23:30:00");
    }

    #[test]
    fn test_hours_and_days() {
        let hours = normalize(&[1_000_000.0, 1_000_003.0], Some("hours since 1900-01-01 00:00:00.0")).unwrap();
        assert_eq!(hours.values, vec![0.0, 3.0]);
        assert_eq!(hours.units, "Hours since 2014-01-29 16:00:00");

        let days = normalize(&[1.5, 2.0], Some("Days since 2025-01-01T00:00:00Z")).unwrap();
        assert_eq!(days.values, vec![0.0, 12.0]);
        assert_eq!(days.units, "Hours since 2025-01-02 12:00:00");
    }

    #[test]
    fn test_unknown_unit_fails_loudly() {
        assert!(matches!(
            normalize(&[0.0], Some("fortnights since 2025-01-01")),
            Err(ForcingError::InvalidTimeUnits(_))
        ));
        assert!(matches!(
            normalize(&[0.0], Some("hours after 2025-01-01")),
            Err(ForcingError::InvalidTimeUnits(_))
        ));
        assert!(normalize(&[0.0], None).is_err());
        assert!(normalize(&[], Some("hours since 2025-01-01")).is_err());
    }

    #[test]
    fn test_reference_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 1, 21)
            .unwrap()
            .and_hms_opt(6, 30, 0)
            .unwrap();
        for units in [
            "seconds since 2025-01-21 06:30:00",
            "seconds since 2025-01-21 06:30",
            "seconds since 2025-01-21T06:30:00Z",
            "SECONDS SINCE 2025-01-21 06:30:00 UTC",
        ] {
            assert_eq!(CfTimeUnits::parse(units).unwrap().reference, expected, "{}", units);
        }
    }

    #[test]
    fn test_trailing_utc_offset() {
        let cf = CfTimeUnits::parse("seconds since 1970-01-01 00:00:00.0 0:00").unwrap();
        assert_eq!(cf.reference, NaiveDate::from_ymd_opt(1970, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap());

        let shifted = CfTimeUnits::parse("hours since 2025-01-21 06:00:00 +02:00").unwrap();
        assert_eq!(shifted.reference, NaiveDate::from_ymd_opt(2025, 1, 21).unwrap().and_hms_opt(4, 0, 0).unwrap());

        let time = normalize(&[1_737_417_600.0, 1_737_428_400.0], Some("seconds since 1970-01-01 00:00:00.0 0:00")).unwrap();
        assert_eq!(time.values, vec![0.0, 3.0]);
        assert_eq!(time.units, "Hours since 2025-01-21 00:00:00");
    }

    #[test]
    fn test_attached_utc_offset() {
        let midnight = NaiveDate::from_ymd_opt(2025, 1, 21).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let cf = CfTimeUnits::parse("seconds since 2025-01-21 00:00:00+00:00").unwrap();
        assert_eq!(cf.reference, midnight);

        let shifted = CfTimeUnits::parse("hours since 2025-01-21T06:00:00+02:00").unwrap();
        assert_eq!(shifted.reference, NaiveDate::from_ymd_opt(2025, 1, 21).unwrap().and_hms_opt(4, 0, 0).unwrap());

        let west = CfTimeUnits::parse("hours since 2025-01-20 21:00-03:00").unwrap();
        assert_eq!(west.reference, midnight);
    }

    #[test]
    fn test_extreme_values_are_errors() {
        for value in [-1e300, 1e300, f64::NAN, f64::INFINITY] {
            assert!(
                matches!(
                    normalize(&[value, 0.0], Some("seconds since 1970-01-01")),
                    Err(ForcingError::InvalidTimeUnits(_))
                ),
                "{}",
                value
            );
        }
        // Fits in i64 milliseconds but not in a calendar date.
        assert!(matches!(
            normalize(&[1e9, 0.0], Some("days since 1970-01-01")),
            Err(ForcingError::InvalidTimeUnits(_))
        ));
    }

    #[test]
    fn test_display_round_trips() {
        let cf = CfTimeUnits::parse("days since 1950-01-01").unwrap();
        assert_eq!(cf.to_string(), "days since 1950-01-01 00:00:00");
        assert_eq!(CfTimeUnits::parse(&cf.to_string()).unwrap(), cf);
    }
}

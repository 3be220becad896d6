//! Observation records and timestamp normalization.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::{Serialize, Serializer};
use thiserror::Error;

use aq_protocol::json::nullable_float;

/// The fixed timezone every timestamp is normalized to.
pub const TIMEZONE: Tz = chrono_tz::Asia::Manila;

/// Pollutant short names, uppercased, in the dataset's column order.
///
/// This order is also the tie-break order when selecting the primary
/// pollutant: on equal means, the earlier entry wins.
pub const POLLUTANT_NAMES: [&str; 8] = ["CO", "NO", "NO2", "O3", "SO2", "PM2_5", "PM10", "NH3"];

/// A single air quality observation.
///
/// Wire field names mirror the dataset columns (`main.aqi`,
/// `components.*`) so serialized records match what the dashboard
/// frontend already consumes. Missing measurements are NaN in memory and
/// `null` on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct Observation {
    pub city_name: String,

    #[serde(serialize_with = "serialize_zoned")]
    pub datetime: DateTime<Tz>,

    #[serde(serialize_with = "nullable_float")]
    pub lat: f64,
    #[serde(serialize_with = "nullable_float")]
    pub lon: f64,

    #[serde(rename = "main.aqi", serialize_with = "nullable_float")]
    pub aqi: f64,

    #[serde(rename = "components.co", serialize_with = "nullable_float")]
    pub co: f64,
    #[serde(rename = "components.no", serialize_with = "nullable_float")]
    pub no: f64,
    #[serde(rename = "components.no2", serialize_with = "nullable_float")]
    pub no2: f64,
    #[serde(rename = "components.o3", serialize_with = "nullable_float")]
    pub o3: f64,
    #[serde(rename = "components.so2", serialize_with = "nullable_float")]
    pub so2: f64,
    #[serde(rename = "components.pm2_5", serialize_with = "nullable_float")]
    pub pm2_5: f64,
    #[serde(rename = "components.pm10", serialize_with = "nullable_float")]
    pub pm10: f64,
    #[serde(rename = "components.nh3", serialize_with = "nullable_float")]
    pub nh3: f64,
}

impl Observation {
    /// Pollutant concentrations in [`POLLUTANT_NAMES`] order.
    pub fn pollutants(&self) -> [f64; 8] {
        [
            self.co, self.no, self.no2, self.o3, self.so2, self.pm2_5, self.pm10, self.nh3,
        ]
    }
}

/// Render a zoned timestamp as combined date-time-and-offset text.
pub fn serialize_zoned<S>(dt: &DateTime<Tz>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&dt.to_rfc3339())
}

/// Timestamp parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("unrecognized timestamp format: {0:?}")]
    Unrecognized(String),

    #[error("timestamp does not exist in {tz}: {raw:?}", tz = TIMEZONE)]
    InvalidLocal { raw: String },
}

/// Offset-carrying formats beyond RFC 3339.
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Formats without timezone information.
const NAIVE_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parse a timestamp in any of the accepted textual formats and normalize
/// it to [`TIMEZONE`].
///
/// Two distinct cases, deliberately branched:
/// - the text carries an offset (or `Z`): the instant is *converted* into
///   the fixed zone;
/// - the text is naive: it is *localized*, i.e. read as wall-clock time
///   already in the fixed zone.
///
/// Converting and localizing the same text produce different absolute
/// instants, so conflating them would silently shift the data.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Tz>, TimestampError> {
    let trimmed = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&TIMEZONE));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, fmt) {
            return Ok(dt.with_timezone(&TIMEZONE));
        }
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return localize(naive, trimmed);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return localize(naive, trimmed);
        }
    }

    Err(TimestampError::Unrecognized(trimmed.to_string()))
}

fn localize(naive: NaiveDateTime, raw: &str) -> Result<DateTime<Tz>, TimestampError> {
    // Asia/Manila has no DST transitions in the data's range, so a naive
    // time maps to exactly one instant; `single` guards regardless.
    TIMEZONE
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| TimestampError::InvalidLocal {
            raw: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Offset, Timelike};

    #[test]
    fn test_naive_timestamp_is_localized() {
        let dt = parse_timestamp("2024-05-01 06:30:00").unwrap();
        // Localized: wall-clock time preserved, Manila offset attached.
        assert_eq!(dt.hour(), 6);
        assert_eq!(dt.minute(), 30);
        assert_eq!(dt.offset().fix().local_minus_utc(), 8 * 3600);
    }

    #[test]
    fn test_utc_timestamp_is_converted() {
        let dt = parse_timestamp("2024-05-01T06:30:00Z").unwrap();
        // Converted: same instant, shifted wall-clock time.
        assert_eq!(dt.hour(), 14);
        assert_eq!(dt.minute(), 30);
    }

    #[test]
    fn test_conversion_and_localization_differ() {
        let localized = parse_timestamp("2024-05-01 06:30:00").unwrap();
        let converted = parse_timestamp("2024-05-01T06:30:00Z").unwrap();
        assert_ne!(localized, converted);
    }

    #[test]
    fn test_offset_literal_survives_round_trip() {
        let dt = parse_timestamp("2024-05-01 00:00:00").unwrap();
        let rendered = dt.to_rfc3339();
        assert!(rendered.ends_with("+08:00"), "got {rendered}");
        assert!(!rendered.ends_with('Z'));
    }

    #[test]
    fn test_mixed_formats() {
        for raw in [
            "2024-05-01T06:30:00+08:00",
            "2024-05-01 06:30:00+0800",
            "2024-05-01T06:30:00.123",
            "2024-05-01 06:30",
            "05/01/2024 06:30",
            "2024-05-01",
        ] {
            let dt = parse_timestamp(raw).unwrap_or_else(|e| panic!("{raw}: {e}"));
            assert_eq!(dt.month(), 5, "month for {raw}");
            assert_eq!(dt.day(), 1, "day for {raw}");
        }
    }

    #[test]
    fn test_date_only_is_midnight() {
        let dt = parse_timestamp("2024-05-01").unwrap();
        assert_eq!(dt.hour(), 0);
        assert_eq!(dt.minute(), 0);
    }

    #[test]
    fn test_unrecognized_format() {
        let err = parse_timestamp("first of May").unwrap_err();
        assert!(matches!(err, TimestampError::Unrecognized(_)));
    }

    #[test]
    fn test_observation_wire_names() {
        let obs = Observation {
            city_name: "Manila".to_string(),
            datetime: parse_timestamp("2024-05-01 00:00:00").unwrap(),
            lat: 14.6,
            lon: 120.98,
            aqi: 3.0,
            co: 300.0,
            no: 0.5,
            no2: 12.0,
            o3: 40.0,
            so2: 5.0,
            pm2_5: 25.0,
            pm10: 40.0,
            nh3: f64::NAN,
        };

        let json = serde_json::to_value(&obs).unwrap();
        assert_eq!(json["city_name"], "Manila");
        assert_eq!(json["main.aqi"], 3.0);
        assert_eq!(json["components.pm2_5"], 25.0);
        assert!(json["components.nh3"].is_null());
        assert_eq!(json["datetime"], "2024-05-01T00:00:00+08:00");
    }

    #[test]
    fn test_pollutants_order_matches_names() {
        let obs = Observation {
            city_name: "x".to_string(),
            datetime: parse_timestamp("2024-01-01").unwrap(),
            lat: 0.0,
            lon: 0.0,
            aqi: 1.0,
            co: 1.0,
            no: 2.0,
            no2: 3.0,
            o3: 4.0,
            so2: 5.0,
            pm2_5: 6.0,
            pm10: 7.0,
            nh3: 8.0,
        };
        assert_eq!(obs.pollutants(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        assert_eq!(POLLUTANT_NAMES.len(), obs.pollutants().len());
    }
}

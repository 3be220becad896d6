//! Shared response bodies.

use serde::{Deserialize, Serialize};

/// Structured error response.
///
/// `error` is a machine-readable kind; `detail` carries the human-readable
/// message. The same shape is produced for every failure, so clients can
/// branch on `error` without parsing prose.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    /// Machine-readable error kind.
    pub error: String,

    /// HTTP status code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Human-readable detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(kind: impl Into<String>, status: u16, detail: impl Into<String>) -> Self {
        Self {
            error: kind.into(),
            status: Some(status),
            detail: Some(detail.into()),
        }
    }
}

/// Inclusive timestamp range of a filtered result set.
///
/// Both ends are absent (JSON `null`) when the filter matched nothing;
/// an empty result is not an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DateRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl DateRange {
    /// An empty range, serialized as two nulls.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: Some(start.into()),
            end: Some(end.into()),
        }
    }
}

/// Health risk classification for an AQI level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthRisk {
    pub level: String,
    pub color: String,
    pub description: String,
}

impl HealthRisk {
    /// Classify an AQI index value into a health risk band.
    ///
    /// Band edges are inclusive: an AQI of exactly 3.0 is still
    /// "Unhealthy for Sensitive Groups".
    pub fn for_aqi(aqi: f64) -> Self {
        let (level, color, description) = if aqi <= 1.0 {
            (
                "Good",
                "green",
                "Air quality is considered satisfactory, and air pollution poses little or no risk.",
            )
        } else if aqi <= 2.0 {
            (
                "Moderate",
                "yellow",
                "Air quality is acceptable; however, some pollutants may be a concern for a small number of people.",
            )
        } else if aqi <= 3.0 {
            (
                "Unhealthy for Sensitive Groups",
                "orange",
                "Members of sensitive groups may experience health effects. The general public is not likely to be affected.",
            )
        } else if aqi <= 4.0 {
            (
                "Unhealthy",
                "red",
                "Everyone may begin to experience health effects; members of sensitive groups may experience more serious effects.",
            )
        } else {
            (
                "Very Unhealthy",
                "purple",
                "Health warnings of emergency conditions. The entire population is more likely to be affected.",
            )
        };

        Self {
            level: level.to_string(),
            color: color.to_string(),
            description: description.to_string(),
        }
    }
}

//! Forecast synthesis.

use chrono::{DateTime, Datelike, Duration, Timelike};
use chrono_tz::Tz;
use serde::Serialize;
use thiserror::Error;

use aq_data::observation::serialize_zoned;
use aq_data::{Dataset, Observation};
use aq_protocol::json::nullable_float;

use crate::artifacts::ForecastModel;

/// One synthetic future-dated prediction. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastRecord {
    #[serde(serialize_with = "serialize_zoned")]
    pub datetime: DateTime<Tz>,

    #[serde(serialize_with = "nullable_float")]
    pub predicted_aqi: f64,

    pub city_name: String,

    #[serde(serialize_with = "nullable_float")]
    pub lat: f64,
    #[serde(serialize_with = "nullable_float")]
    pub lon: f64,

    /// Always true; lets clients mix predictions into observation lists.
    pub is_prediction: bool,
}

/// A (city, date) pair the synthesizer could not predict for. Skips are
/// part of the batch result, not a hidden log line.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastSkip {
    pub city_name: String,

    #[serde(serialize_with = "serialize_zoned")]
    pub datetime: DateTime<Tz>,

    pub reason: String,
}

/// The outcome of one forecast request: successful records plus any
/// per-record skips. A skip never aborts the rest of the batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ForecastBatch {
    pub records: Vec<ForecastRecord>,
    pub skipped: Vec<ForecastSkip>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForecastError {
    /// No baseline observation exists for the requested city.
    #[error("no data available for prediction: {city}")]
    NoData { city: String },
}

/// Most recent observation per city (ties go to the last-loaded row).
fn baselines<'a>(dataset: &'a Dataset, city: Option<&str>) -> Vec<&'a Observation> {
    let mut latest: Vec<&Observation> = Vec::new();
    for obs in dataset.iter() {
        if let Some(wanted) = city {
            if obs.city_name != wanted {
                continue;
            }
        }
        match latest.iter_mut().find(|b| b.city_name == obs.city_name) {
            Some(slot) => {
                if obs.datetime >= slot.datetime {
                    *slot = obs;
                }
            }
            None => latest.push(obs),
        }
    }
    latest
}

/// Raw (unscaled) feature vector for one baseline at one future instant:
/// the eight pollutant concentrations held constant, then hour,
/// day-of-month, month and day-of-week (Monday = 0) of the future date.
fn feature_vector(baseline: &Observation, future: DateTime<Tz>) -> Vec<f64> {
    let mut features = baseline.pollutants().to_vec();
    features.push(future.hour() as f64);
    features.push(future.day() as f64);
    features.push(future.month() as f64);
    features.push(future.weekday().num_days_from_monday() as f64);
    features
}

/// Synthesize `days` consecutive daily predictions per requested city.
///
/// The horizon is anchored one day after the latest baseline timestamp;
/// each future instant keeps that timestamp's time-of-day. `city = None`
/// forecasts every city in the dataset.
pub fn forecast(
    dataset: &Dataset,
    model: &ForecastModel,
    city: Option<&str>,
    days: u32,
) -> Result<ForecastBatch, ForecastError> {
    let baselines = baselines(dataset, city);

    // Anchor on the newest baseline across all selected cities, so every
    // city's horizon covers the same calendar dates.
    let Some(last) = baselines.iter().map(|b| b.datetime).max() else {
        return Err(ForecastError::NoData {
            city: city.unwrap_or(aq_protocol::ALL_CITIES).to_string(),
        });
    };

    let mut batch = ForecastBatch::default();
    for &baseline in &baselines {
        for offset in 0..days {
            let future = last + Duration::days(1 + i64::from(offset));
            let features = feature_vector(baseline, future);
            match model.predict(&features) {
                Ok(predicted_aqi) => batch.records.push(ForecastRecord {
                    datetime: future,
                    predicted_aqi,
                    city_name: baseline.city_name.clone(),
                    lat: baseline.lat,
                    lon: baseline.lon,
                    is_prediction: true,
                }),
                Err(e) => {
                    tracing::warn!(
                        city = %baseline.city_name,
                        date = %future,
                        error = %e,
                        "skipping prediction"
                    );
                    batch.skipped.push(ForecastSkip {
                        city_name: baseline.city_name.clone(),
                        datetime: future,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    Ok(batch)
}

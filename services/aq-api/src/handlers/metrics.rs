//! Summary metrics handler.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::Response,
};
use serde::{Deserialize, Serialize};

use aq_data::Trend;
use aq_protocol::json::nullable_float;
use aq_protocol::{ApiError, ALL_CITIES};

use crate::handlers::{error_response, json_response};
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct MetricsParams {
    pub city: Option<String>,
}

#[derive(Serialize)]
struct MetricsResponse {
    #[serde(serialize_with = "nullable_float")]
    average_aqi: f64,
    primary_pollutant: String,
    trend: Trend,
}

/// GET /api/metrics
///
/// Mean AQI, primary pollutant and trend for one city (or `"all"`).
/// An unknown city is a 404, distinct from the dataset being
/// unavailable.
pub async fn metrics_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<MetricsParams>,
) -> Response {
    let aggregates = match state.aggregates() {
        Ok(aggregates) => aggregates,
        Err(e) => return error_response(&e),
    };

    let city = params.city.as_deref().unwrap_or(ALL_CITIES);
    match aggregates.city(city) {
        Some(summary) => json_response(&MetricsResponse {
            average_aqi: summary.average_aqi,
            primary_pollutant: summary.primary_pollutant.clone(),
            trend: summary.trend,
        }),
        None => error_response(&ApiError::CityNotFound(city.to_string())),
    }
}

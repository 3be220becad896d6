//! Pollutant means handler.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::Response,
};
use serde::Deserialize;

use aq_protocol::{ApiError, ALL_CITIES};

use crate::handlers::{error_response, json_response};
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct PollutantsParams {
    pub city: Option<String>,
}

/// GET /api/pollutants
///
/// Pollutant short name to mean concentration for one city (or
/// `"all"`). Unknown cities are a 404. Means that could not be computed
/// (no finite samples) come back as `null`.
pub async fn pollutants_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<PollutantsParams>,
) -> Response {
    let aggregates = match state.aggregates() {
        Ok(aggregates) => aggregates,
        Err(e) => return error_response(&e),
    };

    let city = params.city.as_deref().unwrap_or(ALL_CITIES);
    match aggregates.city(city) {
        Some(summary) => {
            let pollutants: BTreeMap<&str, Option<f64>> = summary
                .pollutants
                .iter()
                .map(|(name, mean)| (name.as_str(), mean.is_finite().then_some(*mean)))
                .collect();
            json_response(&pollutants)
        }
        None => error_response(&ApiError::CityNotFound(city.to_string())),
    }
}

//! Health risk classification handler.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::Response,
};
use serde::Deserialize;

use aq_data::query;
use aq_protocol::{ApiError, HealthRisk, ALL_CITIES};

use crate::handlers::{error_response, json_response};
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct HealthRiskParams {
    pub city: Option<String>,
}

/// GET /api/health-risk
///
/// Health risk band for the most recent AQI of the selected city (or of
/// the whole dataset). A city with no observations is a 404, not a
/// server error.
pub async fn health_risk_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<HealthRiskParams>,
) -> Response {
    let dataset = match state.dataset() {
        Ok(dataset) => dataset,
        Err(e) => return error_response(&e),
    };

    match query::latest_aqi(&dataset, params.city.as_deref()) {
        Some(aqi) => json_response(&HealthRisk::for_aqi(aqi)),
        None => {
            let city = params.city.as_deref().unwrap_or(ALL_CITIES);
            error_response(&ApiError::CityNotFound(city.to_string()))
        }
    }
}

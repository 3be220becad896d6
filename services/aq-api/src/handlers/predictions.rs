//! Forecast handler.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::Response,
};
use serde::{Deserialize, Serialize};

use aq_forecast::{forecast, ForecastError, ForecastRecord, ForecastSkip};
use aq_protocol::{ApiError, ALL_CITIES};

use crate::handlers::{error_response, json_response};
use crate::state::AppState;

/// Default forecast horizon in days.
const DEFAULT_HORIZON_DAYS: u32 = 7;

/// Query parameters for the predictions endpoint.
///
/// Unlike `month`, a malformed `days` is a hard 400: the horizon drives
/// how much work the synthesizer does, so it must be an explicit
/// non-negative integer.
#[derive(Debug, Deserialize, Default)]
pub struct PredictionParams {
    pub city: Option<String>,
    pub days: Option<String>,
}

#[derive(Serialize)]
struct PredictionsResponse {
    data: Vec<ForecastRecord>,
    /// (city, date) pairs the model could not predict for, with reasons.
    skipped: Vec<ForecastSkip>,
}

/// GET /api/predictions
///
/// Synthesize `days` daily AQI predictions per requested city, anchored
/// the day after the latest observation. Per-record failures appear in
/// `skipped`; only a city with no observations at all fails the request.
pub async fn predictions_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<PredictionParams>,
) -> Response {
    let days = match params.days.as_deref() {
        None => DEFAULT_HORIZON_DAYS,
        Some(raw) => match raw.parse::<u32>() {
            Ok(days) => days,
            Err(_) => {
                return error_response(&ApiError::InvalidParameter(format!(
                    "days must be a non-negative integer, got {raw:?}"
                )))
            }
        },
    };

    let model = match state.forecast_model() {
        Ok(model) => model,
        Err(e) => return error_response(&e),
    };

    let dataset = match state.dataset() {
        Ok(dataset) => dataset,
        Err(e) => return error_response(&e),
    };

    let city = match params.city.as_deref() {
        None | Some(ALL_CITIES) => None,
        Some(city) => Some(city),
    };

    match forecast(&dataset, &model, city, days) {
        Ok(batch) => json_response(&PredictionsResponse {
            data: batch.records,
            skipped: batch.skipped,
        }),
        Err(ForecastError::NoData { city }) => error_response(&ApiError::NoForecastData(city)),
    }
}

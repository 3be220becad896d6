//! Raw and daily historical query handlers.
//!
//! Both endpoints share the same filter parameters and response
//! envelope; they differ only in granularity. `city=all` (the default)
//! and malformed month values apply no filtering.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::Response,
};
use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use aq_data::{query, HistoricalFilter};
use aq_protocol::{DateRange, TIMEZONE_NAME};

use crate::handlers::{error_response, json_response};
use crate::state::AppState;

/// Query parameters for the historical endpoints.
///
/// `month` stays textual here so a non-numeric value can degrade to "no
/// filter" instead of a deserialization rejection.
#[derive(Debug, Deserialize, Default)]
pub struct HistoricalParams {
    pub city: Option<String>,
    pub month: Option<String>,
}

/// Response envelope shared by the historical endpoints.
#[derive(Serialize)]
struct HistoricalResponse<T: Serialize> {
    data: Vec<T>,
    timezone: &'static str,
    date_range: DateRange,
}

fn date_range(start: Option<DateTime<Tz>>, end: Option<DateTime<Tz>>) -> DateRange {
    DateRange {
        start: start.map(|dt| dt.to_rfc3339()),
        end: end.map(|dt| dt.to_rfc3339()),
    }
}

/// GET /api/historical
///
/// Every observation matching the city/month filter, timestamps rendered
/// with the Manila offset, plus the min/max timestamp of the result.
pub async fn historical_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<HistoricalParams>,
) -> Response {
    let dataset = match state.dataset() {
        Ok(dataset) => dataset,
        Err(e) => return error_response(&e),
    };

    let filter = HistoricalFilter::from_params(params.city.as_deref(), params.month.as_deref());
    let slice = query::historical(&dataset, &filter);

    json_response(&HistoricalResponse {
        date_range: date_range(slice.start, slice.end),
        data: slice.rows,
        timezone: TIMEZONE_NAME,
    })
}

/// GET /api/historical/daily
///
/// The filtered observations grouped by calendar date, with per-date
/// means of AQI and the five core pollutants.
pub async fn daily_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<HistoricalParams>,
) -> Response {
    let dataset = match state.dataset() {
        Ok(dataset) => dataset,
        Err(e) => return error_response(&e),
    };

    let filter = HistoricalFilter::from_params(params.city.as_deref(), params.month.as_deref());
    let slice = query::daily_rollup(&dataset, &filter);

    json_response(&HistoricalResponse {
        date_range: date_range(slice.start, slice.end),
        data: slice.rows,
        timezone: TIMEZONE_NAME,
    })
}

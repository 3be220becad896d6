//! Spatial heatmap rollup handler.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::Response,
};
use serde::Deserialize;

use aq_data::query;

use crate::handlers::{error_response, json_response};
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct HeatmapParams {
    pub city: Option<String>,
}

/// GET /api/heatmap
///
/// Per-city mean AQI, first-encountered coordinates and observation
/// count, for map-overlay rendering. The month filter never applies
/// here.
pub async fn heatmap_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<HeatmapParams>,
) -> Response {
    let dataset = match state.dataset() {
        Ok(dataset) => dataset,
        Err(e) => return error_response(&e),
    };

    let cells = query::heatmap(&dataset, params.city.as_deref());
    json_response(&cells)
}

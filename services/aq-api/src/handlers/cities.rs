//! City list handler.

use std::sync::Arc;

use axum::{extract::Extension, response::Response};

use crate::handlers::{error_response, json_response};
use crate::state::AppState;

/// GET /api/cities
///
/// Distinct city names present in the dataset, in first-encountered
/// order.
pub async fn cities_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    match state.dataset() {
        Ok(dataset) => json_response(&dataset.cities()),
        Err(e) => error_response(&e),
    }
}

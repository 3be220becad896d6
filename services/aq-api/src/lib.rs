//! AQ API Service Library
//!
//! HTTP query layer over the precomputed air quality dataset and the
//! pretrained AQI forecast artifacts, serving the map/dashboard frontend.

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod handlers;
pub mod state;

pub use config::ServiceConfig;
pub use state::AppState;

/// Build the API router with its middleware stack.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health::health_handler))
        .route("/api/cities", get(handlers::cities::cities_handler))
        .route("/api/historical", get(handlers::historical::historical_handler))
        .route(
            "/api/historical/daily",
            get(handlers::historical::daily_handler),
        )
        .route("/api/heatmap", get(handlers::heatmap::heatmap_handler))
        .route("/api/metrics", get(handlers::metrics::metrics_handler))
        .route(
            "/api/pollutants",
            get(handlers::pollutants::pollutants_handler),
        )
        .route(
            "/api/health-risk",
            get(handlers::health_risk::health_risk_handler),
        )
        .route(
            "/api/predictions",
            get(handlers::predictions::predictions_handler),
        )
        // Middleware
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}

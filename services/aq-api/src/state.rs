//! Application state for the AQ API.

use std::sync::{Arc, OnceLock};

use aq_data::{AggregateCache, Aggregates, Dataset, DatasetStore};
use aq_forecast::{ArtifactError, ForecastModel};
use aq_protocol::ApiError;

use crate::config::ServiceConfig;

/// Shared application state.
///
/// Every resource here is an explicit one-time-initialized singleton:
/// the first request needing it triggers the load, later requests get
/// the memoized value, and the only invalidation is a process restart.
/// After initialization everything is read-only, so concurrent requests
/// need no locking.
pub struct AppState {
    config: ServiceConfig,

    /// Backing dataset, loaded on first use.
    store: DatasetStore,

    /// Per-city summaries, computed on first use.
    aggregates: AggregateCache,

    /// Forecast artifacts, loaded on first use. A load failure is
    /// memoized and disables only the prediction endpoint.
    model: OnceLock<Result<Arc<ForecastModel>, ArtifactError>>,
}

impl AppState {
    /// Create a new AppState. Nothing is loaded yet.
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            store: DatasetStore::new(&config.data_path),
            aggregates: AggregateCache::new(),
            model: OnceLock::new(),
            config,
        }
    }

    /// The loaded dataset, or `DataUnavailable`.
    pub fn dataset(&self) -> Result<Arc<Dataset>, ApiError> {
        self.store
            .get()
            .map_err(|e| ApiError::DataUnavailable(e.to_string()))
    }

    /// The memoized per-city aggregates, or `DataUnavailable`.
    pub fn aggregates(&self) -> Result<Arc<Aggregates>, ApiError> {
        self.aggregates
            .get(&self.store)
            .map_err(|e| ApiError::DataUnavailable(e.to_string()))
    }

    /// The memoized forecast artifacts, or `ModelUnavailable`.
    pub fn forecast_model(&self) -> Result<Arc<ForecastModel>, ApiError> {
        self.model
            .get_or_init(|| {
                ForecastModel::load(&self.config.model_path, &self.config.scaler_path).map(Arc::new)
            })
            .clone()
            .map_err(|e| ApiError::ModelUnavailable(e.to_string()))
    }
}

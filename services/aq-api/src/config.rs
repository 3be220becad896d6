//! Service configuration.

use std::path::PathBuf;

/// File locations for the dataset and forecast artifacts.
///
/// All three are read lazily: a missing file is reported by the endpoint
/// that needs it, not at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Backing air quality CSV.
    pub data_path: PathBuf,

    /// Serialized regression model.
    pub model_path: PathBuf,

    /// Serialized feature scaler.
    pub scaler_path: PathBuf,
}

impl ServiceConfig {
    /// Build a configuration from environment variables, with the same
    /// defaults the training pipeline writes to.
    pub fn from_env() -> Self {
        Self {
            data_path: std::env::var("AQ_DATA_PATH")
                .unwrap_or_else(|_| "assets/updated_air_quality.csv".to_string())
                .into(),
            model_path: std::env::var("AQ_MODEL_PATH")
                .unwrap_or_else(|_| "assets/aqi_model.json".to_string())
                .into(),
            scaler_path: std::env::var("AQ_SCALER_PATH")
                .unwrap_or_else(|_| "assets/aqi_scaler.json".to_string())
                .into(),
        }
    }
}

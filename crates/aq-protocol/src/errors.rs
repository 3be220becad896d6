//! API error taxonomy.

use thiserror::Error;

use crate::responses::ErrorResponse;

/// Errors surfaced by the air quality API.
///
/// Every variant maps to a structured JSON response; none of them
/// terminate the process. Per-record forecast failures are deliberately
/// not represented here: they travel inside the batch result as skip
/// records, not as an HTTP error.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The backing dataset is missing, empty or unparseable.
    #[error("Data not available: {0}")]
    DataUnavailable(String),

    /// The requested city does not exist in the dataset.
    #[error("City not found: {0}")]
    CityNotFound(String),

    /// The model or scaler artifact failed to load; forecasts disabled.
    #[error("Model not available: {0}")]
    ModelUnavailable(String),

    /// No baseline observation exists to forecast from.
    #[error("No data available for prediction: {0}")]
    NoForecastData(String),

    /// Malformed query parameter.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApiError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::DataUnavailable(_) => 503,
            ApiError::CityNotFound(_) => 404,
            ApiError::ModelUnavailable(_) => 503,
            ApiError::NoForecastData(_) => 404,
            ApiError::InvalidParameter(_) => 400,
            ApiError::InternalError(_) => 500,
        }
    }

    /// Machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::DataUnavailable(_) => "data-unavailable",
            ApiError::CityNotFound(_) => "city-not-found",
            ApiError::ModelUnavailable(_) => "model-unavailable",
            ApiError::NoForecastData(_) => "no-forecast-data",
            ApiError::InvalidParameter(_) => "invalid-parameter",
            ApiError::InternalError(_) => "internal-error",
        }
    }

    /// Convert to a structured response body.
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse::new(self.kind(), self.status_code(), self.to_string())
    }
}

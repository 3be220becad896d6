//! AQI Forecast Synthesizer
//!
//! Produces short-horizon AQI predictions from two externally trained
//! artifacts: a feature scaler and a regression model. Pollutant features
//! are held constant at each city's last observed values; only the
//! time-derived features vary across the horizon. The model forecasts the
//! AQI response to changing time-of-year/time-of-day patterns given a
//! fixed recent pollutant baseline; that is a deliberate simplification,
//! not a gap.

pub mod artifacts;
pub mod synthesizer;

pub use artifacts::{ArtifactError, ForecastModel, ModelArtifact, PredictError, ScalerArtifact};
pub use synthesizer::{forecast, ForecastBatch, ForecastError, ForecastRecord, ForecastSkip};

//! Dataset loading and process-lifetime memoization.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use serde::Deserialize;
use thiserror::Error;

use crate::observation::{parse_timestamp, Observation};

/// Columns the backing CSV must carry. A missing column is a load-time
/// schema error, not a per-row lookup failure later.
pub const REQUIRED_COLUMNS: [&str; 13] = [
    "city_name",
    "datetime",
    "lat",
    "lon",
    "main.aqi",
    "components.co",
    "components.no",
    "components.no2",
    "components.o3",
    "components.so2",
    "components.pm2_5",
    "components.pm10",
    "components.nh3",
];

/// Dataset load failures. All of them surface as "data not available" to
/// dependents; none are retried within a process lifetime.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("dataset file not found: {0}")]
    FileNotFound(String),

    #[error("dataset has no usable rows: {0}")]
    EmptyDataset(String),

    #[error("required column missing: {0}")]
    MissingColumn(String),

    #[error("row {row}: {detail}")]
    BadRow { row: usize, detail: String },

    #[error("failed to read dataset: {0}")]
    Io(String),
}

/// One CSV row as it appears on disk, before normalization.
#[derive(Debug, Deserialize)]
struct RawRow {
    city_name: Option<String>,
    datetime: String,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(rename = "main.aqi")]
    aqi: Option<f64>,
    #[serde(rename = "components.co")]
    co: Option<f64>,
    #[serde(rename = "components.no")]
    no: Option<f64>,
    #[serde(rename = "components.no2")]
    no2: Option<f64>,
    #[serde(rename = "components.o3")]
    o3: Option<f64>,
    #[serde(rename = "components.so2")]
    so2: Option<f64>,
    #[serde(rename = "components.pm2_5")]
    pm2_5: Option<f64>,
    #[serde(rename = "components.pm10")]
    pm10: Option<f64>,
    #[serde(rename = "components.nh3")]
    nh3: Option<f64>,
}

/// The loaded, immutable dataset. Ordered by load, unordered for query.
#[derive(Debug)]
pub struct Dataset {
    observations: Vec<Observation>,
}

impl Dataset {
    /// Build a dataset from already-normalized observations.
    pub fn new(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Iterate observations in load order.
    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter()
    }

    /// Distinct city names, in first-encountered order.
    pub fn cities(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for obs in &self.observations {
            if !seen.iter().any(|c| c == &obs.city_name) {
                seen.push(obs.city_name.clone());
            }
        }
        seen
    }
}

/// Read and normalize the backing CSV.
fn load_dataset(path: &Path) -> Result<Dataset, StoreError> {
    if !path.exists() {
        return Err(StoreError::FileNotFound(path.display().to_string()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| StoreError::Io(e.to_string()))?;

    let headers = reader
        .headers()
        .map_err(|e| StoreError::Io(e.to_string()))?
        .clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(StoreError::MissingColumn(column.to_string()));
        }
    }

    let mut observations = Vec::new();
    for (index, result) in reader.deserialize::<RawRow>().enumerate() {
        // Header is line 1; data rows start at line 2.
        let row = index + 2;
        let raw = result.map_err(|e| StoreError::BadRow {
            row,
            detail: e.to_string(),
        })?;

        // Rows without a city identifier are not retained.
        let city_name = match raw.city_name {
            Some(name) if !name.is_empty() => name,
            _ => continue,
        };

        let datetime = parse_timestamp(&raw.datetime).map_err(|e| StoreError::BadRow {
            row,
            detail: e.to_string(),
        })?;

        observations.push(Observation {
            city_name,
            datetime,
            lat: raw.lat.unwrap_or(f64::NAN),
            lon: raw.lon.unwrap_or(f64::NAN),
            aqi: raw.aqi.unwrap_or(f64::NAN),
            co: raw.co.unwrap_or(f64::NAN),
            no: raw.no.unwrap_or(f64::NAN),
            no2: raw.no2.unwrap_or(f64::NAN),
            o3: raw.o3.unwrap_or(f64::NAN),
            so2: raw.so2.unwrap_or(f64::NAN),
            pm2_5: raw.pm2_5.unwrap_or(f64::NAN),
            pm10: raw.pm10.unwrap_or(f64::NAN),
            nh3: raw.nh3.unwrap_or(f64::NAN),
        });
    }

    if observations.is_empty() {
        return Err(StoreError::EmptyDataset(path.display().to_string()));
    }

    let start = observations.iter().map(|o| o.datetime).min();
    let end = observations.iter().map(|o| o.datetime).max();
    tracing::info!(
        rows = observations.len(),
        start = ?start,
        end = ?end,
        path = %path.display(),
        "dataset loaded"
    );

    Ok(Dataset::new(observations))
}

/// One-time-initialized handle to the dataset.
///
/// The first `get` reads the file; every later call returns the same
/// `Arc`. A failed load is memoized too, matching the contract that a
/// broken dataset requires a process restart. Two racing first calls may
/// both read the file; the content is deterministic, so whichever result
/// lands in the cell is the one everyone sees.
pub struct DatasetStore {
    path: PathBuf,
    cell: OnceLock<Result<Arc<Dataset>, StoreError>>,
}

impl DatasetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cell: OnceLock::new(),
        }
    }

    /// Load on first call, return the memoized dataset afterwards.
    pub fn get(&self) -> Result<Arc<Dataset>, StoreError> {
        self.cell
            .get_or_init(|| {
                load_dataset(&self.path).map(Arc::new).inspect_err(|e| {
                    tracing::error!(path = %self.path.display(), error = %e, "dataset load failed");
                })
            })
            .clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

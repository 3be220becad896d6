//! Model and scaler artifacts.
//!
//! Both artifacts are opaque, versionless JSON blobs written by the
//! offline training pipeline. They are loaded once and never revalidated
//! beyond load success; a load failure disables forecasting but nothing
//! else.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Number of features the pipeline feeds the model: eight pollutant
/// concentrations followed by hour, day, month and day-of-week.
pub const FEATURE_COUNT: usize = 12;

/// Artifact load failures. String payloads keep the error cheaply
/// clonable for process-lifetime memoization.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArtifactError {
    #[error("artifact file not found: {0}")]
    FileNotFound(String),

    #[error("failed to read artifact {path}: {detail}")]
    Io { path: String, detail: String },

    #[error("malformed artifact {path}: {detail}")]
    Malformed { path: String, detail: String },

    #[error("inconsistent artifact {path}: {detail}")]
    Inconsistent { path: String, detail: String },
}

/// Per-prediction failures. These never abort a batch; they become skip
/// records.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    #[error("expected {expected} features, got {got}")]
    FeatureLength { expected: usize, got: usize },

    #[error("non-finite feature value at index {0}")]
    NonFinite(usize),

    #[error("malformed tree: {0}")]
    MalformedTree(String),
}

/// Standard-scaler transform: `(x - mean) / scale` per feature.
#[derive(Debug, Clone, Deserialize)]
pub struct ScalerArtifact {
    pub feature_names: Vec<String>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl ScalerArtifact {
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let scaler: ScalerArtifact = read_json(path)?;
        if scaler.mean.len() != scaler.feature_names.len()
            || scaler.scale.len() != scaler.feature_names.len()
        {
            return Err(ArtifactError::Inconsistent {
                path: path.display().to_string(),
                detail: format!(
                    "{} feature names, {} means, {} scales",
                    scaler.feature_names.len(),
                    scaler.mean.len(),
                    scaler.scale.len()
                ),
            });
        }
        Ok(scaler)
    }

    /// Normalize a feature vector.
    pub fn transform(&self, features: &[f64]) -> Result<Vec<f64>, PredictError> {
        if features.len() != self.mean.len() {
            return Err(PredictError::FeatureLength {
                expected: self.mean.len(),
                got: features.len(),
            });
        }
        if let Some(idx) = features.iter().position(|v| !v.is_finite()) {
            return Err(PredictError::NonFinite(idx));
        }
        Ok(features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| {
                // A zero scale means the feature was constant in training;
                // the trained scaler divides by 1 in that case.
                let divisor = if *scale == 0.0 { 1.0 } else { *scale };
                (x - mean) / divisor
            })
            .collect())
    }
}

/// One flattened regression tree in the training pipeline's array layout:
/// `children_left[i] < 0` marks node `i` as a leaf carrying `value[i]`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegressionTree {
    pub children_left: Vec<i32>,
    pub children_right: Vec<i32>,
    pub feature: Vec<i32>,
    pub threshold: Vec<f64>,
    pub value: Vec<f64>,
}

impl RegressionTree {
    /// All five node arrays must be the same length.
    fn is_consistent(&self) -> bool {
        let nodes = self.children_left.len();
        self.children_right.len() == nodes
            && self.feature.len() == nodes
            && self.threshold.len() == nodes
            && self.value.len() == nodes
    }

    fn predict(&self, features: &[f64]) -> Result<f64, PredictError> {
        let nodes = self.children_left.len();
        let mut node = 0usize;
        // A well-formed tree terminates within `nodes` hops.
        for _ in 0..=nodes {
            let left = node_field(&self.children_left, node)?;
            if left < 0 {
                return node_field(&self.value, node);
            }
            let feature_idx = node_field(&self.feature, node)? as usize;
            let x = features
                .get(feature_idx)
                .copied()
                .ok_or(PredictError::FeatureLength {
                    expected: feature_idx + 1,
                    got: features.len(),
                })?;
            node = if x <= node_field(&self.threshold, node)? {
                left as usize
            } else {
                node_field(&self.children_right, node)? as usize
            };
        }
        Err(PredictError::MalformedTree("cycle detected".to_string()))
    }
}

/// Checked node lookup; ragged or truncated node arrays surface as a
/// prediction error, never a panic.
fn node_field<T: Copy>(field: &[T], node: usize) -> Result<T, PredictError> {
    field
        .get(node)
        .copied()
        .ok_or_else(|| PredictError::MalformedTree(format!("node index {node} out of range")))
}

/// The regressor. Opaque to callers: only `predict` is exposed.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    /// `intercept + coefficients · x`
    Linear {
        intercept: f64,
        coefficients: Vec<f64>,
    },
    /// Mean of the member trees' predictions.
    Forest { trees: Vec<RegressionTree> },
}

impl ModelArtifact {
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let model: ModelArtifact = read_json(path)?;
        if let ModelArtifact::Forest { trees } = &model {
            if trees.is_empty() {
                return Err(ArtifactError::Inconsistent {
                    path: path.display().to_string(),
                    detail: "forest has no trees".to_string(),
                });
            }
            if let Some(idx) = trees.iter().position(|tree| !tree.is_consistent()) {
                return Err(ArtifactError::Inconsistent {
                    path: path.display().to_string(),
                    detail: format!("tree {idx} has mismatched node array lengths"),
                });
            }
        }
        Ok(model)
    }

    /// Predict a scalar AQI from an already-scaled feature vector.
    pub fn predict(&self, features: &[f64]) -> Result<f64, PredictError> {
        match self {
            ModelArtifact::Linear {
                intercept,
                coefficients,
            } => {
                if features.len() != coefficients.len() {
                    return Err(PredictError::FeatureLength {
                        expected: coefficients.len(),
                        got: features.len(),
                    });
                }
                Ok(intercept
                    + coefficients
                        .iter()
                        .zip(features)
                        .map(|(c, x)| c * x)
                        .sum::<f64>())
            }
            ModelArtifact::Forest { trees } => {
                let mut sum = 0.0;
                for tree in trees {
                    sum += tree.predict(features)?;
                }
                Ok(sum / trees.len() as f64)
            }
        }
    }
}

/// Scaler and model loaded together; a failure of either disables both.
#[derive(Debug, Clone)]
pub struct ForecastModel {
    scaler: ScalerArtifact,
    model: ModelArtifact,
}

impl ForecastModel {
    pub fn load(model_path: &Path, scaler_path: &Path) -> Result<Self, ArtifactError> {
        let scaler = ScalerArtifact::load(scaler_path)?;
        let model = ModelArtifact::load(model_path)?;
        tracing::info!(
            model = %model_path.display(),
            scaler = %scaler_path.display(),
            features = scaler.feature_names.len(),
            "forecast artifacts loaded"
        );
        Ok(Self { scaler, model })
    }

    pub fn new(model: ModelArtifact, scaler: ScalerArtifact) -> Self {
        Self { scaler, model }
    }

    /// Scale a raw feature vector and run the regressor on it.
    pub fn predict(&self, features: &[f64]) -> Result<f64, PredictError> {
        let scaled = self.scaler.transform(features)?;
        self.model.predict(&scaled)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::FileNotFound(path.display().to_string()));
    }
    let text = std::fs::read_to_string(path).map_err(|e| ArtifactError::Io {
        path: path.display().to_string(),
        detail: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| ArtifactError::Malformed {
        path: path.display().to_string(),
        detail: e.to_string(),
    })
}

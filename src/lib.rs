//! Wine quality prediction
//!
//! A random forest regressor over physicochemical measurements, trained offline and
//! served over HTTP together with per-feature importances.

pub mod data;
pub mod features;
pub mod model;
pub mod predict;
pub mod server;
pub mod training;

use serde::{Deserialize, Serialize};
use indexmap::IndexMap;
use std::fmt;
use thiserror::Error;

pub use features::schema::ValidationError;

/// Kind of wine, encoded as the `type` feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WineType {
    Red,
    White,
}

impl WineType {
    /// Numeric encoding used by the model
    pub fn code(&self) -> u8 {
        match self {
            WineType::Red => 0,
            WineType::White => 1,
        }
    }

    /// File stem used by the raw UCI datasets
    pub fn file_stem(&self) -> &'static str {
        match self {
            WineType::Red => "red",
            WineType::White => "white",
        }
    }

    pub fn all() -> [WineType; 2] {
        [WineType::Red, WineType::White]
    }
}

impl fmt::Display for WineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WineType::Red => write!(f, "Red"),
            WineType::White => write!(f, "White"),
        }
    }
}

/// Discrete quality category derived from the predicted score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityLabel {
    Poor,
    Medium,
    Good,
}

impl QualityLabel {
    /// Score at or above which a wine is `Good`
    pub const GOOD_THRESHOLD: f64 = 7.0;
    /// Score at or above which a wine is at least `Medium`
    pub const MEDIUM_THRESHOLD: f64 = 5.0;

    /// Classify a score. Lower bounds are inclusive.
    pub fn from_score(score: f64) -> Self {
        if score >= Self::GOOD_THRESHOLD {
            QualityLabel::Good
        } else if score >= Self::MEDIUM_THRESHOLD {
            QualityLabel::Medium
        } else {
            QualityLabel::Poor
        }
    }
}

impl fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityLabel::Poor => write!(f, "Poor"),
            QualityLabel::Medium => write!(f, "Medium"),
            QualityLabel::Good => write!(f, "Good"),
        }
    }
}

/// Feature name to importance weight, in training column order
pub type FeatureImportance = IndexMap<String, f64>;

/// Prediction output returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub quality_score: f64,
    pub quality_label: QualityLabel,
    #[serde(default)]
    pub feature_importance: FeatureImportance,
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum WineError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Model not loaded")]
    ModelNotLoaded,

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Failed to load artifact {path}: {message}")]
    ArtifactLoad { path: String, message: String },

    #[error("Data error: {0}")]
    Data(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WineError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub training: TrainingConfig,
    pub data: DataConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub test_size: f64,
    pub seed: u64,
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub data_dir: String,
    pub model_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            training: TrainingConfig::default(),
            data: DataConfig {
                data_dir: "ml_pipeline/data".to_string(),
                model_dir: "models".to_string(),
            },
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            test_size: 0.2,
            seed: 42,
            n_estimators: 100,
            max_depth: 10,
            min_samples_split: 2,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            WineError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| WineError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| WineError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_boundaries() {
        assert_eq!(QualityLabel::from_score(7.0), QualityLabel::Good);
        assert_eq!(QualityLabel::from_score(6.999), QualityLabel::Medium);
        assert_eq!(QualityLabel::from_score(5.0), QualityLabel::Medium);
        assert_eq!(QualityLabel::from_score(4.999), QualityLabel::Poor);
    }

    #[test]
    fn test_label_extremes() {
        assert_eq!(QualityLabel::from_score(10.0), QualityLabel::Good);
        assert_eq!(QualityLabel::from_score(0.0), QualityLabel::Poor);
        assert_eq!(QualityLabel::from_score(-3.0), QualityLabel::Poor);
    }

    #[test]
    fn test_label_serializes_as_string() {
        let json = serde_json::to_string(&QualityLabel::Medium).unwrap();
        assert_eq!(json, "\"Medium\"");
    }

    #[test]
    fn test_wine_type_codes() {
        assert_eq!(WineType::Red.code(), 0);
        assert_eq!(WineType::White.code(), 1);
        assert_eq!(WineType::White.file_stem(), "white");
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();

        let mut config = Config::default();
        config.training.n_estimators = 7;
        config.save(path).unwrap();

        let loaded = Config::load(path).unwrap();
        assert_eq!(loaded.training.n_estimators, 7);
        assert_eq!(loaded.training.max_depth, 10);
        assert_eq!(loaded.data.model_dir, "models");
        assert_eq!(loaded.server.port, 8000);
    }

    #[test]
    fn test_config_missing_file() {
        let result = Config::load("/nonexistent/config.toml");
        assert!(matches!(result, Err(WineError::Config(_))));
    }
}

//! On-disk artifact store
//!
//! The training pipeline writes three bincode files (forest, scaler, feature order) plus a
//! JSON training report into one directory. The inference engine reads them back once.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::forest::RandomForestRegressor;
use super::scaler::StandardScaler;
use crate::training::metrics::TrainingReport;
use crate::{Result, WineError};

pub const MODEL_FILE: &str = "wine_quality_model.bin";
pub const SCALER_FILE: &str = "scaler.bin";
pub const FEATURE_NAMES_FILE: &str = "feature_names.bin";
pub const REPORT_FILE: &str = "training_report.json";

/// Directory holding the trained artifacts
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        ArtifactStore {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.dir.join(SCALER_FILE)
    }

    pub fn feature_names_path(&self) -> PathBuf {
        self.dir.join(FEATURE_NAMES_FILE)
    }

    pub fn report_path(&self) -> PathBuf {
        self.dir.join(REPORT_FILE)
    }

    /// True if both artifacts required for prediction exist
    pub fn has_trained_model(&self) -> bool {
        self.model_path().exists() && self.scaler_path().exists()
    }

    pub fn save_model(&self, model: &RandomForestRegressor) -> Result<()> {
        write_bincode(&self.model_path(), model)
    }

    pub fn save_scaler(&self, scaler: &StandardScaler) -> Result<()> {
        write_bincode(&self.scaler_path(), scaler)
    }

    pub fn save_feature_names(&self, names: &[String]) -> Result<()> {
        write_bincode(&self.feature_names_path(), &names.to_vec())
    }

    pub fn save_report(&self, report: &TrainingReport) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let content = serde_json::to_string_pretty(report)?;
        std::fs::write(self.report_path(), content)?;
        Ok(())
    }

    /// `Ok(None)` when the file does not exist
    pub fn load_model(&self) -> Result<Option<RandomForestRegressor>> {
        read_bincode(&self.model_path())
    }

    pub fn load_scaler(&self) -> Result<Option<StandardScaler>> {
        read_bincode(&self.scaler_path())
    }

    pub fn load_feature_names(&self) -> Result<Option<Vec<String>>> {
        read_bincode(&self.feature_names_path())
    }

    pub fn load_report(&self) -> Result<Option<TrainingReport>> {
        let path = self.report_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| artifact_error(&path, e))
    }
}

fn write_bincode<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut writer, value)?;
    writer.flush()?;
    log::debug!("Wrote {}", path.display());
    Ok(())
}

fn read_bincode<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path).map_err(|e| artifact_error(path, e))?;
    bincode::deserialize_from(BufReader::new(file))
        .map(Some)
        .map_err(|e| artifact_error(path, e))
}

fn artifact_error(path: &Path, e: impl std::fmt::Display) -> WineError {
    WineError::ArtifactLoad {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

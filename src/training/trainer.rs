//! Offline training pipeline
//!
//! data-loaded → split → scaled → fitted → evaluated → persisted. Evaluation is reported
//! but never gates persistence.

use chrono::Utc;
use std::path::Path;

use crate::data::WineDataset;
use crate::model::{ArtifactStore, ForestParams, RandomForestRegressor, StandardScaler};
use crate::training::metrics::{RegressionMetrics, TrainingReport};
use crate::{Result, TrainingConfig};

/// Everything a training run produces
#[derive(Debug, Clone)]
pub struct TrainedArtifacts {
    pub model: RandomForestRegressor,
    pub scaler: StandardScaler,
    pub feature_names: Vec<String>,
    pub report: TrainingReport,
}

/// Trainer for the random forest regressor
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Trainer { config }
    }

    /// Load the raw data, fit, evaluate and persist. Returns the report of the run.
    pub fn run(&self, data_dir: &Path, store: &ArtifactStore) -> Result<TrainingReport> {
        log::info!("Loading data from {}", data_dir.display());
        let dataset = WineDataset::load(data_dir)?;

        let artifacts = self.fit(&dataset)?;
        Self::persist(&artifacts, store)?;

        Ok(artifacts.report)
    }

    /// Split, scale, fit and evaluate without touching the filesystem
    pub fn fit(&self, dataset: &WineDataset) -> Result<TrainedArtifacts> {
        let (train, test) = dataset.train_test_split(self.config.test_size, self.config.seed)?;

        // Scaler statistics come from the training partition only
        let train_x = train.feature_matrix();
        let test_x = test.feature_matrix();
        let scaler = StandardScaler::fit(&train_x)?;
        let train_scaled = scaler.transform(&train_x)?;
        let test_scaled = scaler.transform(&test_x)?;
        log::debug!("Scaler mean={:?}, scale={:?}", scaler.mean, scaler.scale);

        let params = ForestParams::from(&self.config);
        log::info!(
            "Training random forest ({} trees, max depth {}) on {} samples",
            params.n_estimators,
            params.tree.max_depth,
            train.len()
        );
        let model = RandomForestRegressor::fit(&train_scaled, &train.targets(), params)?;

        let predictions = model.predict(&test_scaled)?;
        let test_metrics = RegressionMetrics::compute(&predictions, &test.targets());
        log::info!("Test: {}", test_metrics);

        let report = TrainingReport {
            trained_at: Utc::now(),
            n_train: train.len(),
            n_test: test.len(),
            test_size: self.config.test_size,
            params,
            feature_names: dataset.feature_names.clone(),
            test_metrics,
        };

        Ok(TrainedArtifacts {
            model,
            scaler,
            feature_names: dataset.feature_names.clone(),
            report,
        })
    }

    /// Write all artifacts, overwriting previous versions
    pub fn persist(artifacts: &TrainedArtifacts, store: &ArtifactStore) -> Result<()> {
        log::info!("Saving artifacts to {}", store.dir().display());
        store.save_model(&artifacts.model)?;
        store.save_scaler(&artifacts.scaler)?;
        store.save_feature_names(&artifacts.feature_names)?;
        store.save_report(&artifacts.report)?;
        Ok(())
    }
}

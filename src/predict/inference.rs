//! Model inference
//!
//! The engine is built once at startup from the artifact store and is read-only
//! afterwards, so it can be shared across request handlers without locking.

use crate::features::schema::feature_index;
use crate::features::WineFeatures;
use crate::model::artifacts::FEATURE_NAMES_FILE;
use crate::model::{ArtifactStore, RandomForestRegressor, StandardScaler};
use crate::{FeatureImportance, Result, WineError};

/// Where the engine's column order came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSource {
    /// Persisted by the training pipeline
    Artifact,
    /// Schema declaration order, used when the feature-order artifact is missing
    Fallback,
}

/// Loaded model state
struct LoadedModel {
    model: RandomForestRegressor,
    scaler: StandardScaler,
}

/// Scores validated features with the trained forest
pub struct InferenceEngine {
    loaded: Option<LoadedModel>,
    feature_order: Vec<String>,
    /// Position in the schema of each name in `feature_order`
    columns: Vec<usize>,
    order_source: OrderSource,
    importance: FeatureImportance,
}

impl InferenceEngine {
    /// Engine with no model; every prediction fails with [`WineError::ModelNotLoaded`]
    pub fn unloaded() -> Self {
        InferenceEngine {
            loaded: None,
            feature_order: Vec::new(),
            columns: Vec::new(),
            order_source: OrderSource::Fallback,
            importance: FeatureImportance::new(),
        }
    }

    /// Load from the artifact store. Never fails: missing or unreadable artifacts leave the
    /// engine unloaded and are reported in the log.
    pub fn load(store: &ArtifactStore) -> Self {
        match Self::try_load(store) {
            Ok(engine) if engine.is_loaded() => {
                log::info!(
                    "Model and scaler loaded from {} ({} features)",
                    store.dir().display(),
                    engine.feature_order.len()
                );
                if !engine.importance.is_empty() {
                    log::info!(
                        "Importance cache created with {} features",
                        engine.importance.len()
                    );
                }
                engine
            }
            Ok(engine) => {
                log::error!(
                    "Model artifacts not found in {}. Run `wine train` first; predictions will fail until then.",
                    store.dir().display()
                );
                engine
            }
            Err(e) => {
                log::error!("Failed to load model artifacts: {}", e);
                Self::unloaded()
            }
        }
    }

    /// Load from the artifact store, surfacing corrupt or inconsistent artifacts as errors.
    /// Missing model or scaler files yield an unloaded engine.
    pub fn try_load(store: &ArtifactStore) -> Result<Self> {
        let model = store.load_model()?;
        let scaler = store.load_scaler()?;
        let feature_names = store.load_feature_names()?;
        Self::from_parts(model, scaler, feature_names)
    }

    /// Assemble an engine from already-loaded artifacts
    pub fn from_parts(
        model: Option<RandomForestRegressor>,
        scaler: Option<StandardScaler>,
        feature_names: Option<Vec<String>>,
    ) -> Result<Self> {
        let (model, scaler) = match (model, scaler) {
            (Some(model), Some(scaler)) => (model, scaler),
            _ => return Ok(Self::unloaded()),
        };

        let (feature_order, order_source) = match feature_names {
            Some(names) => (names, OrderSource::Artifact),
            None => {
                log::warn!(
                    "{} not found; assuming training columns follow the schema order",
                    FEATURE_NAMES_FILE
                );
                (WineFeatures::declared_order(), OrderSource::Fallback)
            }
        };

        let columns = resolve_columns(&feature_order)?;

        if scaler.n_features() != columns.len() || model.n_features() != columns.len() {
            return Err(WineError::ArtifactLoad {
                path: FEATURE_NAMES_FILE.to_string(),
                message: format!(
                    "feature order has {} names but scaler expects {} and model expects {}",
                    columns.len(),
                    scaler.n_features(),
                    model.n_features()
                ),
            });
        }

        let importance = match (order_source, model.feature_importances()) {
            (OrderSource::Artifact, Some(weights)) => feature_order
                .iter()
                .cloned()
                .zip(weights)
                .collect(),
            _ => FeatureImportance::new(),
        };

        Ok(InferenceEngine {
            loaded: Some(LoadedModel { model, scaler }),
            feature_order,
            columns,
            order_source,
            importance,
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// Column order used to build model input (empty when unloaded)
    pub fn feature_order(&self) -> &[String] {
        &self.feature_order
    }

    pub fn order_source(&self) -> OrderSource {
        self.order_source
    }

    /// Score one wine: reorder to training columns, scale, run the forest
    pub fn predict(&self, features: &WineFeatures) -> Result<f64> {
        let loaded = self.loaded.as_ref().ok_or(WineError::ModelNotLoaded)?;

        let row: Vec<f64> = self.columns.iter().map(|&i| features.value_at(i)).collect();
        let scaled = loaded.scaler.transform_row(&row)?;
        let scores = loaded.model.predict(std::slice::from_ref(&scaled))?;

        scores
            .first()
            .copied()
            .ok_or_else(|| WineError::Inference("Model returned no prediction".to_string()))
    }

    /// Cached importances, empty when unavailable
    pub fn feature_importance(&self) -> FeatureImportance {
        self.importance.clone()
    }
}

fn resolve_columns(names: &[String]) -> Result<Vec<usize>> {
    let mut columns = Vec::with_capacity(names.len());
    for name in names {
        let index = feature_index(name).ok_or_else(|| WineError::ArtifactLoad {
            path: FEATURE_NAMES_FILE.to_string(),
            message: format!("unknown feature '{}'", name),
        })?;
        if columns.contains(&index) {
            return Err(WineError::ArtifactLoad {
                path: FEATURE_NAMES_FILE.to_string(),
                message: format!("feature '{}' listed twice", name),
            });
        }
        columns.push(index);
    }
    Ok(columns)
}

//! Prediction service
//!
//! Validates raw payloads, scores them and attaches the quality label and importances.

use serde_json::Value;

use super::inference::InferenceEngine;
use crate::features::WineFeatures;
use crate::{FeatureImportance, PredictionResult, QualityLabel, Result};

pub struct PredictionService {
    engine: InferenceEngine,
}

impl PredictionService {
    pub fn new(engine: InferenceEngine) -> Self {
        PredictionService { engine }
    }

    /// Validate a raw JSON payload and score it
    pub fn predict(&self, request: &Value) -> Result<PredictionResult> {
        let features = WineFeatures::from_json(request)?;
        self.predict_features(&features)
    }

    /// Score already-validated features
    pub fn predict_features(&self, features: &WineFeatures) -> Result<PredictionResult> {
        let score = self.engine.predict(features)?;
        let label = QualityLabel::from_score(score);
        log::debug!("Predicted {:.3} ({})", score, label);

        Ok(PredictionResult {
            quality_score: score,
            quality_label: label,
            feature_importance: self.engine.feature_importance(),
        })
    }

    pub fn feature_importance(&self) -> Result<FeatureImportance> {
        Ok(self.engine.feature_importance())
    }
}

/// Format a prediction for display
pub fn format_prediction(result: &PredictionResult) -> String {
    let mut ranked: Vec<(&String, &f64)> = result.feature_importance.iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(a.1));

    let mut out = format!(
        r#"
┌─────────────────────────────────────────────────┐
│  Wine quality prediction
├─────────────────────────────────────────────────┤
│  Score:            {:.2}
│  Label:            {}
"#,
        result.quality_score, result.quality_label
    );

    if !ranked.is_empty() {
        out.push_str("├─────────────────────────────────────────────────┤\n");
        out.push_str("│  Top features:\n");
        for (name, weight) in ranked.iter().take(5) {
            out.push_str(&format!("│    {:<22} {:>5.1}%\n", name, *weight * 100.0));
        }
    }
    out.push_str("└─────────────────────────────────────────────────┘\n");
    out
}

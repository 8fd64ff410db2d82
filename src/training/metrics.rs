//! Regression metrics and the persisted training report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::ForestParams;

/// Held-out evaluation of a regressor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Mean squared error
    pub mse: f64,
    /// Coefficient of determination
    pub r2: f64,
    /// Number of evaluated samples
    pub count: usize,
}

impl RegressionMetrics {
    /// Compute metrics from predictions and targets of equal length
    pub fn compute(predictions: &[f64], targets: &[f64]) -> Self {
        let count = predictions.len().min(targets.len());
        if count == 0 {
            return RegressionMetrics {
                mse: 0.0,
                r2: 0.0,
                count: 0,
            };
        }

        let n = count as f64;
        let ss_res: f64 = predictions
            .iter()
            .zip(targets)
            .map(|(p, t)| (t - p) * (t - p))
            .sum();
        let mean = targets[..count].iter().sum::<f64>() / n;
        let ss_tot: f64 = targets[..count].iter().map(|t| (t - mean) * (t - mean)).sum();

        // A constant target gives R² of 1.0 on a perfect fit and 0.0 otherwise
        let r2 = if ss_tot > 0.0 {
            1.0 - ss_res / ss_tot
        } else if ss_res == 0.0 {
            1.0
        } else {
            0.0
        };

        RegressionMetrics {
            mse: ss_res / n,
            r2,
            count,
        }
    }

    /// Root mean squared error
    pub fn rmse(&self) -> f64 {
        self.mse.sqrt()
    }
}

impl fmt::Display for RegressionMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MSE: {:.4} | RMSE: {:.4} | R2: {:.4} ({} samples)",
            self.mse,
            self.rmse(),
            self.r2,
            self.count
        )
    }
}

/// Summary written next to the artifacts after a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub trained_at: DateTime<Utc>,
    pub n_train: usize,
    pub n_test: usize,
    pub test_size: f64,
    pub params: ForestParams,
    pub feature_names: Vec<String>,
    pub test_metrics: RegressionMetrics,
}

impl fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Trained:    {}", self.trained_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(
            f,
            "Samples:    {} train / {} test (test_size {})",
            self.n_train, self.n_test, self.test_size
        )?;
        writeln!(
            f,
            "Forest:     {} trees, max depth {}, seed {}",
            self.params.n_estimators, self.params.tree.max_depth, self.params.seed
        )?;
        write!(f, "Test:       {}", self.test_metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_predictions() {
        let y = vec![3.0, 5.0, 7.0];
        let m = RegressionMetrics::compute(&y, &y);
        assert_eq!(m.mse, 0.0);
        assert_eq!(m.r2, 1.0);
        assert_eq!(m.count, 3);
    }

    #[test]
    fn test_mean_predictor_has_zero_r2() {
        let y = vec![4.0, 6.0, 8.0];
        let preds = vec![6.0; 3];
        let m = RegressionMetrics::compute(&preds, &y);
        assert!((m.mse - 8.0 / 3.0).abs() < 1e-12);
        assert!(m.r2.abs() < 1e-12);
    }

    #[test]
    fn test_known_values() {
        let y = vec![5.0, 6.0, 7.0, 6.0];
        let preds = vec![5.5, 6.0, 6.5, 6.0];
        let m = RegressionMetrics::compute(&preds, &y);
        assert!((m.mse - 0.125).abs() < 1e-12);
        // ss_tot = 2.0, ss_res = 0.5
        assert!((m.r2 - 0.75).abs() < 1e-12);
        assert!((m.rmse() - 0.125f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_empty_input() {
        let m = RegressionMetrics::compute(&[], &[]);
        assert_eq!(m.count, 0);
        assert_eq!(m.mse, 0.0);
    }
}

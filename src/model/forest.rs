//! Random forest regressor
//!
//! Bagged ensemble of [`RegressionTree`]s. Every split considers all features; the
//! randomness comes from bootstrap resampling alone, with one seed per tree derived from
//! the forest seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::tree::{RegressionTree, TreeParams};
use crate::{Result, TrainingConfig, WineError};

/// Forest hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub tree: TreeParams,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        ForestParams {
            n_estimators: 100,
            tree: TreeParams::default(),
            seed: 42,
        }
    }
}

impl From<&TrainingConfig> for ForestParams {
    fn from(config: &TrainingConfig) -> Self {
        ForestParams {
            n_estimators: config.n_estimators,
            tree: TreeParams {
                max_depth: config.max_depth,
                min_samples_split: config.min_samples_split,
            },
            seed: config.seed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    trees: Vec<RegressionTree>,
    n_features: usize,
    params: ForestParams,
}

impl RandomForestRegressor {
    /// Fit the forest on rows `x` with targets `y`
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: ForestParams) -> Result<Self> {
        if x.is_empty() {
            return Err(WineError::Data("Cannot fit forest on an empty dataset".to_string()));
        }
        if x.len() != y.len() {
            return Err(WineError::Data(format!(
                "Feature rows ({}) and targets ({}) differ in length",
                x.len(),
                y.len()
            )));
        }
        if params.n_estimators == 0 {
            return Err(WineError::Config("n_estimators must be at least 1".to_string()));
        }

        let n_features = x[0].len();
        if let Some(i) = x.iter().position(|row| row.len() != n_features) {
            return Err(WineError::Data(format!(
                "Row {} has {} features, expected {}",
                i,
                x[i].len(),
                n_features
            )));
        }

        let n = x.len();
        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut trees = Vec::with_capacity(params.n_estimators);

        for t in 0..params.n_estimators {
            let mut tree_rng = StdRng::seed_from_u64(rng.gen());
            let bootstrap: Vec<usize> = (0..n).map(|_| tree_rng.gen_range(0..n)).collect();

            let tree = RegressionTree::fit(x, y, &bootstrap, &params.tree);
            log::debug!(
                "Tree {}/{}: {} nodes, depth {}",
                t + 1,
                params.n_estimators,
                tree.node_count(),
                tree.depth()
            );
            trees.push(tree);
        }

        Ok(RandomForestRegressor {
            trees,
            n_features,
            params,
        })
    }

    /// Mean of the tree predictions for one row
    pub fn predict_row(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.n_features {
            return Err(WineError::Inference(format!(
                "Model expects {} features, got {}",
                self.n_features,
                row.len()
            )));
        }
        if self.trees.is_empty() {
            return Err(WineError::Inference("Model has no trees".to_string()));
        }

        let sum: f64 = self.trees.iter().map(|t| t.predict_row(row)).sum();
        Ok(sum / self.trees.len() as f64)
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        rows.iter().map(|row| self.predict_row(row)).collect()
    }

    /// Mean of per-tree normalized importances, renormalized to sum to 1.0.
    ///
    /// Trees that never split are ignored. Returns `None` for an empty forest and all
    /// zeros when no tree split at all.
    pub fn feature_importances(&self) -> Option<Vec<f64>> {
        if self.trees.is_empty() {
            return None;
        }

        let mut total = vec![0.0f64; self.n_features];
        let mut counted = 0usize;
        for tree in self.trees.iter().filter(|t| t.node_count() > 1) {
            for (acc, imp) in total.iter_mut().zip(tree.feature_importances()) {
                *acc += imp;
            }
            counted += 1;
        }

        if counted == 0 {
            return Some(total);
        }

        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            for v in total.iter_mut() {
                *v /= sum;
            }
        }
        Some(total)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        let mut rng = StdRng::seed_from_u64(7);
        let mut x = Vec::with_capacity(n);
        let mut y = Vec::with_capacity(n);
        for _ in 0..n {
            let a: f64 = rng.gen_range(0.0..10.0);
            let b: f64 = rng.gen_range(0.0..10.0);
            let noise: f64 = rng.gen_range(0.0..1.0);
            x.push(vec![a, b, noise]);
            y.push(2.0 * a + b);
        }
        (x, y)
    }

    fn small_params() -> ForestParams {
        ForestParams {
            n_estimators: 10,
            tree: TreeParams {
                max_depth: 6,
                min_samples_split: 2,
            },
            seed: 42,
        }
    }

    #[test]
    fn test_fit_is_deterministic_for_seed() {
        let (x, y) = synthetic(200);
        let a = RandomForestRegressor::fit(&x, &y, small_params()).unwrap();
        let b = RandomForestRegressor::fit(&x, &y, small_params()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.params(), &small_params());
        assert_eq!(a.n_trees(), 10);

        let other = ForestParams {
            seed: 43,
            ..small_params()
        };
        let c = RandomForestRegressor::fit(&x, &y, other).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_predictions_track_target() {
        let (x, y) = synthetic(400);
        let forest = RandomForestRegressor::fit(&x, &y, small_params()).unwrap();

        let preds = forest.predict(&x).unwrap();
        let mse: f64 =
            preds.iter().zip(&y).map(|(p, t)| (p - t).powi(2)).sum::<f64>() / y.len() as f64;
        // Target variance is ~42
        assert!(mse < 3.0, "mse too high: {}", mse);
    }

    #[test]
    fn test_importances_sum_to_one_and_rank_features() {
        let (x, y) = synthetic(300);
        let forest = RandomForestRegressor::fit(&x, &y, small_params()).unwrap();

        let importances = forest.feature_importances().unwrap();
        assert_eq!(importances.len(), 3);
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(importances.iter().all(|&v| v >= 0.0));
        assert!(importances[0] > importances[1]);
        assert!(importances[1] > importances[2]);
    }

    #[test]
    fn test_constant_target_has_zero_importances() {
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
        let y = vec![5.0; 20];
        let forest = RandomForestRegressor::fit(&x, &y, small_params()).unwrap();

        assert_eq!(forest.feature_importances(), Some(vec![0.0]));
        assert_eq!(forest.predict_row(&[3.0]).unwrap(), 5.0);
    }

    #[test]
    fn test_predict_rejects_wrong_width() {
        let (x, y) = synthetic(50);
        let forest = RandomForestRegressor::fit(&x, &y, small_params()).unwrap();
        assert!(matches!(
            forest.predict_row(&[1.0, 2.0]),
            Err(WineError::Inference(_))
        ));
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        assert!(RandomForestRegressor::fit(&[], &[], small_params()).is_err());
        assert!(RandomForestRegressor::fit(&[vec![1.0]], &[1.0, 2.0], small_params()).is_err());

        let zero_trees = ForestParams {
            n_estimators: 0,
            ..small_params()
        };
        assert!(RandomForestRegressor::fit(&[vec![1.0]], &[1.0], zero_trees).is_err());
    }

    #[test]
    fn test_params_from_training_config() {
        let params = ForestParams::from(&TrainingConfig::default());
        assert_eq!(params.n_estimators, 100);
        assert_eq!(params.tree.max_depth, 10);
        assert_eq!(params.tree.min_samples_split, 2);
        assert_eq!(params.seed, 42);
    }
}

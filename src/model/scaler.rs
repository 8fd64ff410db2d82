//! Standard scaler (z-score normalization per feature)

use serde::{Deserialize, Serialize};

use crate::{Result, WineError};

/// Per-feature mean and scale fitted on the training partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    /// Number of rows the scaler was fitted on
    pub n_samples_seen: usize,
}

impl StandardScaler {
    /// Fit mean and population standard deviation of each column.
    ///
    /// Columns with zero variance get a scale of 1.0 so they pass through centred.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let n_features = rows
            .first()
            .map(|r| r.len())
            .ok_or_else(|| WineError::Data("Cannot fit scaler on an empty dataset".to_string()))?;

        let mut sum = vec![0.0f64; n_features];
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n_features {
                return Err(WineError::Data(format!(
                    "Row {} has {} features, expected {}",
                    i,
                    row.len(),
                    n_features
                )));
            }
            for (s, x) in sum.iter_mut().zip(row) {
                *s += x;
            }
        }

        let n = rows.len() as f64;
        let mean: Vec<f64> = sum.iter().map(|s| s / n).collect();

        // Two-pass variance
        let mut sq_dev = vec![0.0f64; n_features];
        for row in rows {
            for ((acc, x), m) in sq_dev.iter_mut().zip(row).zip(&mean) {
                *acc += (x - m) * (x - m);
            }
        }

        let scale = sq_dev
            .iter()
            .map(|acc| {
                let std = (acc / n).sqrt();
                if std > f64::EPSILON {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        Ok(StandardScaler {
            mean,
            scale,
            n_samples_seen: rows.len(),
        })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Normalize a single row: (x - mean) / scale
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.n_features() {
            return Err(WineError::Inference(format!(
                "Scaler expects {} features, got {}",
                self.n_features(),
                row.len()
            )));
        }

        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect())
    }

    /// Normalize a batch of rows
    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_mean_and_scale() {
        let rows = vec![vec![1.0, 10.0], vec![3.0, 10.0], vec![5.0, 10.0]];
        let scaler = StandardScaler::fit(&rows).unwrap();

        assert_eq!(scaler.mean, vec![3.0, 10.0]);
        assert!((scaler.scale[0] - (8.0f64 / 3.0).sqrt()).abs() < 1e-12);
        // Constant column keeps unit scale
        assert_eq!(scaler.scale[1], 1.0);
        assert_eq!(scaler.n_samples_seen, 3);
    }

    #[test]
    fn test_transform_is_zero_mean_unit_variance() {
        let rows: Vec<Vec<f64>> = (0..50).map(|i| vec![i as f64 * 0.5 + 2.0]).collect();
        let scaler = StandardScaler::fit(&rows).unwrap();
        let scaled = scaler.transform(&rows).unwrap();

        let n = scaled.len() as f64;
        let mean: f64 = scaled.iter().map(|r| r[0]).sum::<f64>() / n;
        let var: f64 = scaled.iter().map(|r| (r[0] - mean).powi(2)).sum::<f64>() / n;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_transform_rejects_wrong_width() {
        let scaler = StandardScaler::fit(&[vec![1.0, 2.0], vec![2.0, 3.0]]).unwrap();
        let err = scaler.transform_row(&[1.0]).unwrap_err();
        assert!(matches!(err, WineError::Inference(_)));
    }

    #[test]
    fn test_fit_rejects_empty_and_ragged() {
        assert!(StandardScaler::fit(&[]).is_err());
        assert!(StandardScaler::fit(&[vec![1.0, 2.0], vec![1.0]]).is_err());
    }
}

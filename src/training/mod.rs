//! Model training
//!
//! Train/test split, scaler and forest fitting, evaluation and artifact persistence.

pub mod metrics;
pub mod trainer;

pub use metrics::{RegressionMetrics, TrainingReport};
pub use trainer::{TrainedArtifacts, Trainer};

#[cfg(test)]
pub(crate) use trainer::test_support;

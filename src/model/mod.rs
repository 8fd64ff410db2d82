//! Model primitives and persistence
//!
//! - Scaler: per-feature z-score normalization
//! - Tree / Forest: bagged CART regression trees with impurity importances
//! - Artifacts: bincode files shared between training and inference

pub mod artifacts;
pub mod forest;
pub mod scaler;
pub mod tree;

pub use artifacts::ArtifactStore;
pub use forest::{ForestParams, RandomForestRegressor};
pub use scaler::StandardScaler;
pub use tree::{RegressionTree, TreeParams};

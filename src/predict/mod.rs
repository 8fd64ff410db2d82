//! Prediction and inference
//!
//! Load trained artifacts and score wines.

pub mod inference;
pub mod service;

pub use inference::{InferenceEngine, OrderSource};
pub use service::{format_prediction, PredictionService};

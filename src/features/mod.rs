//! Feature schema and validation
//!
//! Converts raw request payloads into model-ready features.

pub mod schema;

pub use schema::{FeatureKind, FeatureSpec, ValidationError, WineFeatures, FEATURES};

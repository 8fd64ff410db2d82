//! Data ingestion
//!
//! Raw dataset download and loading of the labeled training data.

pub mod dataset;
pub mod download;

pub use dataset::{WineDataset, WineSample};
pub use download::Downloader;

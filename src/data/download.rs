//! Raw dataset downloader
//!
//! Fetches the UCI wine-quality CSV files into the data directory.

use std::path::{Path, PathBuf};

use super::dataset::WineDataset;
use crate::{Result, WineError, WineType};

const BASE_URL: &str =
    "https://archive.ics.uci.edu/ml/machine-learning-databases/wine-quality";

/// Source URL of the raw file for a wine type
pub fn source_url(wine_type: WineType) -> String {
    format!("{}/winequality-{}.csv", BASE_URL, wine_type.file_stem())
}

/// Downloader for the raw datasets
pub struct Downloader {
    client: reqwest::blocking::Client,
    max_attempts: u32,
}

impl Downloader {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("wine-quality/0.1")
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        Ok(Downloader {
            client,
            max_attempts: 3,
        })
    }

    /// Download one file into `data_dir`, overwriting any previous copy
    pub fn fetch(&self, wine_type: WineType, data_dir: &Path) -> Result<PathBuf> {
        let url = source_url(wine_type);
        let path = WineDataset::data_path(data_dir, wine_type);

        log::info!("Fetching {} wine data from {}", wine_type, url);

        let bytes = with_retry(
            || {
                let resp = self.client.get(&url).send()?;
                if !resp.status().is_success() {
                    return Err(WineError::Data(format!(
                        "{} returned {}",
                        url,
                        resp.status()
                    )));
                }
                Ok(resp.bytes()?)
            },
            self.max_attempts,
        )?;

        std::fs::create_dir_all(data_dir)?;
        std::fs::write(&path, &bytes)?;
        log::info!("Downloaded {} ({} bytes)", path.display(), bytes.len());

        Ok(path)
    }

    /// Download both files
    pub fn fetch_all(&self, data_dir: &Path) -> Result<Vec<PathBuf>> {
        WineType::all()
            .into_iter()
            .map(|wine_type| self.fetch(wine_type, data_dir))
            .collect()
    }
}

/// Retry an operation with exponential backoff
pub fn with_retry<T, F>(mut operation: F, max_attempts: u32) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let attempts = max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) if attempt + 1 < attempts => {
                log::warn!("Attempt {} failed: {}", attempt + 1, e);
                let delay = std::time::Duration::from_millis(100 * 2u64.pow(attempt));
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

//! Labeled wine dataset
//!
//! Loads the red and white UCI wine-quality CSV files, tags each row with its wine type and
//! concatenates them red-then-white in file order.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::features::schema::feature_index;
use crate::{Result, WineError, WineType};

/// Column holding the target score
pub const TARGET_COLUMN: &str = "quality";
/// Column appended to mark the wine type
pub const TYPE_COLUMN: &str = "type";

/// One labeled row
#[derive(Debug, Clone, PartialEq)]
pub struct WineSample {
    /// Values in the dataset's `feature_names` order
    pub features: Vec<f64>,
    pub quality: f64,
}

/// Labeled samples with their column order
#[derive(Debug, Clone)]
pub struct WineDataset {
    /// Feature columns in training order (target removed, `type` last)
    pub feature_names: Vec<String>,
    pub samples: Vec<WineSample>,
}

/// A single parsed CSV file, before tagging
struct RawTable {
    columns: Vec<String>,
    rows: Vec<(Vec<f64>, f64)>,
}

impl WineDataset {
    /// Path of the raw file for a wine type inside `data_dir`
    pub fn data_path(data_dir: &Path, wine_type: WineType) -> PathBuf {
        data_dir.join(format!("winequality-{}.csv", wine_type.file_stem()))
    }

    /// Load and combine both raw files from `data_dir`
    pub fn load(data_dir: &Path) -> Result<Self> {
        let red_path = Self::data_path(data_dir, WineType::Red);
        let white_path = Self::data_path(data_dir, WineType::White);

        let red = File::open(&red_path).map_err(|e| {
            WineError::Data(format!("Failed to open {}: {}", red_path.display(), e))
        })?;
        let white = File::open(&white_path).map_err(|e| {
            WineError::Data(format!("Failed to open {}: {}", white_path.display(), e))
        })?;

        let dataset = Self::from_readers(
            red,
            &red_path.display().to_string(),
            white,
            &white_path.display().to_string(),
        )?;

        log::info!(
            "Loaded {} samples ({} red, {} white) with {} features",
            dataset.len(),
            dataset.count_type(WineType::Red),
            dataset.count_type(WineType::White),
            dataset.feature_names.len()
        );

        Ok(dataset)
    }

    /// Combine two semicolon-separated tables. Column order follows the red table; the white
    /// table is re-aligned by column name.
    pub fn from_readers(
        red: impl Read,
        red_source: &str,
        white: impl Read,
        white_source: &str,
    ) -> Result<Self> {
        let red = parse_table(red, red_source)?;
        let white = parse_table(white, white_source)?;

        let mapping: Vec<usize> = red
            .columns
            .iter()
            .map(|name| {
                white.columns.iter().position(|c| c == name).ok_or_else(|| {
                    WineError::Data(format!("{} has no column '{}'", white_source, name))
                })
            })
            .collect::<Result<_>>()?;
        if white.columns.len() != red.columns.len() {
            return Err(WineError::Data(format!(
                "{} has {} feature columns, {} has {}",
                white_source,
                white.columns.len(),
                red_source,
                red.columns.len()
            )));
        }

        let mut samples = Vec::with_capacity(red.rows.len() + white.rows.len());
        for (mut features, quality) in red.rows {
            features.push(WineType::Red.code() as f64);
            samples.push(WineSample { features, quality });
        }
        for (values, quality) in white.rows {
            let mut features: Vec<f64> = mapping.iter().map(|&j| values[j]).collect();
            features.push(WineType::White.code() as f64);
            samples.push(WineSample { features, quality });
        }

        let mut feature_names = red.columns;
        feature_names.push(TYPE_COLUMN.to_string());

        let dataset = WineDataset {
            feature_names,
            samples,
        };
        if dataset.is_empty() {
            return Err(WineError::Data(format!(
                "{} and {} contain no samples",
                red_source, white_source
            )));
        }
        Ok(dataset)
    }

    /// Create dataset directly from samples
    pub fn from_samples(feature_names: Vec<String>, samples: Vec<WineSample>) -> Self {
        WineDataset {
            feature_names,
            samples,
        }
    }

    /// Get the number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if dataset is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of samples of one wine type
    pub fn count_type(&self, wine_type: WineType) -> usize {
        let code = wine_type.code() as f64;
        self.samples
            .iter()
            .filter(|s| s.features.last() == Some(&code))
            .count()
    }

    /// Feature rows, cloned
    pub fn feature_matrix(&self) -> Vec<Vec<f64>> {
        self.samples.iter().map(|s| s.features.clone()).collect()
    }

    pub fn targets(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.quality).collect()
    }

    /// Shuffled train/test split with a fixed seed.
    ///
    /// The test partition holds `ceil(test_size * n)` samples; both partitions must be
    /// non-empty.
    pub fn train_test_split(&self, test_size: f64, seed: u64) -> Result<(Self, Self)> {
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(WineError::Config(format!(
                "test_size must be in (0, 1), got {}",
                test_size
            )));
        }

        let n = self.samples.len();
        let n_test = (test_size * n as f64).ceil() as usize;
        if n_test == 0 || n_test >= n {
            return Err(WineError::Data(format!(
                "Cannot split {} samples with test_size {}",
                n, test_size
            )));
        }

        let mut order: Vec<usize> = (0..n).collect();
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        order.shuffle(&mut rng);

        let pick = |idx: &[usize]| -> Vec<WineSample> {
            idx.iter().map(|&i| self.samples[i].clone()).collect()
        };
        let test = pick(&order[..n_test]);
        let train = pick(&order[n_test..]);

        log::info!(
            "Split {} samples: train={}, test={}",
            n,
            train.len(),
            test.len()
        );

        Ok((
            Self::from_samples(self.feature_names.clone(), train),
            Self::from_samples(self.feature_names.clone(), test),
        ))
    }
}

fn parse_table(reader: impl Read, source: &str) -> Result<RawTable> {
    let mut csv = csv::ReaderBuilder::new()
        .delimiter(b';')
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv.headers()?.clone();
    let target = headers
        .iter()
        .position(|h| h == TARGET_COLUMN)
        .ok_or_else(|| {
            WineError::Data(format!("{} has no '{}' column", source, TARGET_COLUMN))
        })?;

    let mut columns = Vec::with_capacity(headers.len() - 1);
    for (j, name) in headers.iter().enumerate() {
        if j == target {
            continue;
        }
        if name == TYPE_COLUMN || feature_index(name).is_none() {
            return Err(WineError::Data(format!(
                "{} has unexpected column '{}'",
                source, name
            )));
        }
        if columns.iter().any(|c| c == name) {
            return Err(WineError::Data(format!(
                "{} has duplicate column '{}'",
                source, name
            )));
        }
        columns.push(name.to_string());
    }

    let mut rows = Vec::new();
    for record in csv.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let mut features = Vec::with_capacity(columns.len());
        let mut quality = 0.0;
        for (j, cell) in record.iter().enumerate() {
            let value: f64 = cell.parse().map_err(|_| {
                WineError::Data(format!(
                    "{} line {}: cannot parse '{}' in column '{}'",
                    source, line, cell, &headers[j]
                ))
            })?;
            if j == target {
                quality = value;
            } else {
                features.push(value);
            }
        }
        rows.push((features, quality));
    }

    Ok(RawTable { columns, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: &str = "\"fixed acidity\";\"volatile acidity\";\"citric acid\";\"residual sugar\";\"chlorides\";\"free sulfur dioxide\";\"total sulfur dioxide\";\"density\";\"pH\";\"sulphates\";\"alcohol\";\"quality\"
7.4;0.7;0;1.9;0.076;11;34;0.9978;3.51;0.56;9.4;5
7.8;0.88;0;2.6;0.098;25;67;0.9968;3.2;0.68;9.8;5
11.2;0.28;0.56;1.9;0.075;17;60;0.998;3.16;0.58;9.8;6
";

    // Same columns, alcohol and quality moved to the front
    const WHITE: &str = "\"alcohol\";\"quality\";\"fixed acidity\";\"volatile acidity\";\"citric acid\";\"residual sugar\";\"chlorides\";\"free sulfur dioxide\";\"total sulfur dioxide\";\"density\";\"pH\";\"sulphates\"
8.8;6;7;0.27;0.36;20.7;0.045;45;170;1.001;3;0.45
9.5;6;6.3;0.3;0.34;1.6;0.049;14;132;0.994;3.3;0.49
";

    fn dataset() -> WineDataset {
        WineDataset::from_readers(RED.as_bytes(), "red", WHITE.as_bytes(), "white").unwrap()
    }

    #[test]
    fn test_combines_red_then_white() {
        let ds = dataset();
        assert_eq!(ds.len(), 5);
        assert_eq!(ds.count_type(WineType::Red), 3);
        assert_eq!(ds.count_type(WineType::White), 2);

        let types: Vec<f64> = ds.samples.iter().map(|s| *s.features.last().unwrap()).collect();
        assert_eq!(types, vec![0.0, 0.0, 0.0, 1.0, 1.0]);
        assert_eq!(ds.targets(), vec![5.0, 5.0, 6.0, 6.0, 6.0]);
    }

    #[test]
    fn test_feature_names_follow_red_header() {
        let ds = dataset();
        assert_eq!(ds.feature_names.len(), 12);
        assert_eq!(ds.feature_names[0], "fixed acidity");
        assert_eq!(ds.feature_names[10], "alcohol");
        assert_eq!(ds.feature_names[11], "type");
    }

    #[test]
    fn test_white_columns_are_realigned() {
        let ds = dataset();
        let first_white = &ds.samples[3].features;
        assert_eq!(first_white[0], 7.0); // fixed acidity
        assert_eq!(first_white[10], 8.8); // alcohol
    }

    #[test]
    fn test_unparsable_cell_names_source() {
        let bad = RED.replace("11.2", "abc");
        let err = WineDataset::from_readers(bad.as_bytes(), "red.csv", WHITE.as_bytes(), "white")
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("red.csv"), "{}", msg);
        assert!(msg.contains("fixed acidity"), "{}", msg);
    }

    #[test]
    fn test_missing_target_column() {
        let bad = RED.replace("\"quality\"", "\"score\"");
        let err =
            WineDataset::from_readers(bad.as_bytes(), "red", WHITE.as_bytes(), "white").unwrap_err();
        assert!(matches!(err, WineError::Data(_)));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let bad = RED.replace("\"sulphates\"", "\"alcohol\"");
        let err =
            WineDataset::from_readers(bad.as_bytes(), "red", WHITE.as_bytes(), "white").unwrap_err();
        assert!(matches!(err, WineError::Data(_)));
        assert!(err.to_string().contains("duplicate column 'alcohol'"), "{}", err);
    }

    #[test]
    fn test_empty_tables_are_rejected() {
        let header_only = RED.lines().next().unwrap();
        let err = WineDataset::from_readers(
            header_only.as_bytes(),
            "red",
            header_only.as_bytes(),
            "white",
        )
        .unwrap_err();
        assert!(matches!(err, WineError::Data(_)));
    }

    #[test]
    fn test_split_sizes_and_determinism() {
        let samples: Vec<WineSample> = (0..100)
            .map(|i| WineSample {
                features: vec![i as f64],
                quality: i as f64,
            })
            .collect();
        let ds = WineDataset::from_samples(vec!["alcohol".to_string()], samples);

        let (train, test) = ds.train_test_split(0.2, 42).unwrap();
        assert_eq!(train.len(), 80);
        assert_eq!(test.len(), 20);

        let (train2, test2) = ds.train_test_split(0.2, 42).unwrap();
        assert_eq!(train.samples, train2.samples);
        assert_eq!(test.samples, test2.samples);

        // Disjoint and covering
        let mut all: Vec<f64> = train.targets().into_iter().chain(test.targets()).collect();
        all.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(all, (0..100).map(|i| i as f64).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_rounds_test_size_up() {
        let samples: Vec<WineSample> = (0..11)
            .map(|i| WineSample {
                features: vec![i as f64],
                quality: 0.0,
            })
            .collect();
        let ds = WineDataset::from_samples(vec!["alcohol".to_string()], samples);
        let (train, test) = ds.train_test_split(0.2, 1).unwrap();
        assert_eq!(test.len(), 3);
        assert_eq!(train.len(), 8);
    }

    #[test]
    fn test_split_rejects_bad_fraction() {
        let ds = dataset();
        assert!(ds.train_test_split(0.0, 42).is_err());
        assert!(ds.train_test_split(1.0, 42).is_err());
    }
}

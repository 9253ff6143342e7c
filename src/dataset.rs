//! Training data for the model fitter.
//!
//! A dataset is an ordered list of samples sharing one feature count. The
//! JSON loader reads the `[{"Feature": x, "Target": y}, ...]` records the
//! sample-data generator writes.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::error::{KernelError, KernelResult};
use crate::math::matrix::{Matrix, Vector};
use crate::scalar::Scalar;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed dataset json: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Kernel(#[from] KernelError),
}

/// One observation: its features and the target to fit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub features: Vector,
    pub target: Scalar,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dataset {
    samples: Vec<Sample>,
}

#[derive(Deserialize)]
struct Record {
    #[serde(rename = "Feature")]
    feature: i64,
    #[serde(rename = "Target")]
    target: i64,
}

impl Dataset {
    /// Creates a dataset, rejecting samples whose feature counts differ.
    pub fn new(samples: Vec<Sample>) -> KernelResult<Self> {
        if let Some(first) = samples.first() {
            let width = first.features.len();
            if let Some((index, sample)) = samples
                .iter()
                .enumerate()
                .find(|(_, s)| s.features.len() != width)
            {
                return Err(KernelError::shape(format!(
                    "sample {index} has {} features, expected {width}",
                    sample.features.len()
                )));
            }
        }
        Ok(Self { samples })
    }

    /// Single-feature dataset from `(feature, target)` pairs.
    pub fn from_pairs(pairs: &[(i64, i64)]) -> Self {
        let samples = pairs
            .iter()
            .map(|&(feature, target)| Sample {
                features: Vector::from_i64(&[feature]),
                target: Scalar::new(target),
            })
            .collect();
        Self { samples }
    }

    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let records: Vec<Record> = serde_json::from_reader(reader)?;
        debug!(rows = records.len(), "loaded dataset records");
        let pairs: Vec<(i64, i64)> = records.iter().map(|r| (r.feature, r.target)).collect();
        Ok(Self::from_pairs(&pairs))
    }

    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let file = File::open(path)?;
        Self::from_json_reader(BufReader::new(file))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Number of features per sample, zero for an empty dataset.
    pub fn feature_count(&self) -> usize {
        self.samples.first().map_or(0, |s| s.features.len())
    }

    /// Design matrix `X`: the features of each sample followed by a bias column of ones.
    pub fn design_matrix(&self) -> KernelResult<Matrix> {
        if self.is_empty() {
            return Err(KernelError::EmptyDataset);
        }
        let rows = self
            .samples
            .iter()
            .map(|s| {
                s.features
                    .iter()
                    .copied()
                    .chain(std::iter::once(Scalar::ONE))
                    .collect()
            })
            .collect();
        Matrix::from_rows(rows)
    }

    /// Target column `y`.
    pub fn targets(&self) -> Vector {
        self.samples.iter().map(|s| s.target).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_records() {
        let json = r#"[{"Feature": 1, "Target": 3}, {"Feature": -2, "Target": -3}]"#;
        let dataset = Dataset::from_json_reader(json.as_bytes()).unwrap();
        assert_eq!(dataset, Dataset::from_pairs(&[(1, 3), (-2, -3)]));
        assert_eq!(dataset.feature_count(), 1);
    }

    #[test]
    fn test_malformed_json() {
        let json = r#"[{"Feature": 1.5, "Target": 3}]"#;
        assert!(matches!(
            Dataset::from_json_reader(json.as_bytes()),
            Err(DatasetError::Json(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Dataset::from_json_path("/nonexistent/data.json"),
            Err(DatasetError::Io(_))
        ));
    }

    #[test]
    fn test_design_matrix_has_bias_column() {
        let dataset = Dataset::from_pairs(&[(1, 3), (2, 5)]);
        let x = dataset.design_matrix().unwrap();
        assert_eq!(x, Matrix::from_i64(&[[1, 1], [2, 1]]).unwrap());
        assert_eq!(dataset.targets(), Vector::from_i64(&[3, 5]));
    }

    #[test]
    fn test_ragged_features_rejected() {
        let samples = vec![
            Sample {
                features: Vector::from_i64(&[1, 2]),
                target: Scalar::ONE,
            },
            Sample {
                features: Vector::from_i64(&[1]),
                target: Scalar::ONE,
            },
        ];
        assert!(matches!(Dataset::new(samples), Err(KernelError::Shape(_))));
    }

    #[test]
    fn test_empty_design_matrix() {
        assert_eq!(
            Dataset::default().design_matrix(),
            Err(KernelError::EmptyDataset)
        );
    }
}

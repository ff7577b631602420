//! Train/test splitting

use crate::error::{ExplorerError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Absorbs float noise such as 1.0 - 0.85 = 0.15000000000000002
const SIZE_EPS: f64 = 1e-9;

/// Disjoint train and test partitions
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
}

impl TrainTestSplit {
    pub fn n_train(&self) -> usize {
        self.x_train.nrows()
    }

    pub fn n_test(&self) -> usize {
        self.x_test.nrows()
    }
}

/// Number of test rows for `n_samples` and a test fraction: the fraction of
/// rows rounded up, leaving at least one row on each side.
pub fn test_size_for(n_samples: usize, test_fraction: f64) -> Result<usize> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(ExplorerError::InvalidParameter {
            name: "test_fraction".to_string(),
            value: test_fraction.to_string(),
            reason: "must be strictly between 0 and 1".to_string(),
        });
    }

    let n_test = (test_fraction * n_samples as f64 - SIZE_EPS).ceil().max(0.0) as usize;
    if n_test == 0 || n_test >= n_samples {
        return Err(ExplorerError::PreprocessingError(format!(
            "with {} rows a test fraction of {:.2} leaves an empty partition",
            n_samples, test_fraction
        )));
    }
    Ok(n_test)
}

/// Shuffle rows with a seeded RNG and split off the test partition
pub fn train_test_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    test_fraction: f64,
    random_state: Option<u64>,
) -> Result<TrainTestSplit> {
    let n_samples = x.nrows();
    if y.len() != n_samples {
        return Err(ExplorerError::ShapeError {
            expected: format!("{} target values", n_samples),
            actual: y.len().to_string(),
        });
    }

    let n_test = test_size_for(n_samples, test_fraction)?;

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = match random_state {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);

    Ok(TrainTestSplit {
        x_train: x.select(Axis(0), train_idx),
        x_test: x.select(Axis(0), test_idx),
        y_train: y.select(Axis(0), train_idx),
        y_test: y.select(Axis(0), test_idx),
    })
}

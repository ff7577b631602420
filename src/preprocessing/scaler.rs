//! Feature standardization

use crate::error::{ExplorerError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// How the test partition is standardized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ScalingMode {
    /// Fit on the train partition, apply the same transform to the test partition
    #[default]
    TrainFitted,
    /// Fit a separate transform on each partition
    PerPartition,
}

impl fmt::Display for ScalingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalingMode::TrainFitted => write!(f, "train-fitted"),
            ScalingMode::PerPartition => write!(f, "per-partition"),
        }
    }
}

impl FromStr for ScalingMode {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "train-fitted" | "train" => Ok(ScalingMode::TrainFitted),
            "per-partition" | "partition" => Ok(ScalingMode::PerPartition),
            _ => Err(ExplorerError::InvalidParameter {
                name: "scaling".to_string(),
                value: s.to_string(),
                reason: "expected train-fitted or per-partition".to_string(),
            }),
        }
    }
}

/// Standard scaling (z-score normalization): (x - mean) / std
///
/// Uses the population standard deviation; constant columns keep a scale of 1.
#[derive(Debug, Clone, Default)]
pub struct StandardScaler {
    mean: Option<Array1<f64>>,
    scale: Option<Array1<f64>>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute per-column mean and standard deviation
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(ExplorerError::PreprocessingError(
                "cannot fit a scaler on zero rows".to_string(),
            ));
        }

        let mean = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(x.ncols()));
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s == 0.0 || !s.is_finite() { 1.0 } else { s });

        self.mean = Some(mean);
        self.scale = Some(scale);
        Ok(self)
    }

    /// Apply the fitted transform
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (mean, scale) = match (&self.mean, &self.scale) {
            (Some(m), Some(s)) => (m, s),
            _ => return Err(ExplorerError::ModelNotFitted),
        };
        if x.ncols() != mean.len() {
            return Err(ExplorerError::ShapeError {
                expected: format!("{} columns", mean.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }
        Ok((x - mean) / scale)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

/// Standardize both partitions according to `mode`
pub fn scale_partitions(
    mode: ScalingMode,
    x_train: &Array2<f64>,
    x_test: &Array2<f64>,
) -> Result<(Array2<f64>, Array2<f64>)> {
    debug!(%mode, train_rows = x_train.nrows(), test_rows = x_test.nrows(), "scaling partitions");
    let mut train_scaler = StandardScaler::new();
    let train = train_scaler.fit_transform(x_train)?;
    let test = match mode {
        ScalingMode::TrainFitted => train_scaler.transform(x_test)?,
        ScalingMode::PerPartition => StandardScaler::new().fit_transform(x_test)?,
    };
    Ok((train, test))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standard_scaler() {
        let x = array![[1.0, 10.0], [2.0, 10.0], [3.0, 10.0], [4.0, 10.0], [5.0, 10.0]];
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&x).unwrap();

        let mean = scaled.mean_axis(Axis(0)).unwrap();
        assert!(mean[0].abs() < 1e-10);
        let std = scaled.std_axis(Axis(0), 0.0);
        assert!((std[0] - 1.0).abs() < 1e-10);
        // Constant column is centered, not divided by zero
        assert!(scaled.column(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_transform_requires_fit() {
        let scaler = StandardScaler::new();
        assert!(matches!(
            scaler.transform(&array![[1.0]]),
            Err(ExplorerError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_column_mismatch() {
        let mut scaler = StandardScaler::new();
        scaler.fit(&array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        assert!(scaler.transform(&array![[1.0]]).is_err());
    }

    #[test]
    fn test_train_fitted_mode_uses_train_statistics() {
        let train = array![[0.0], [2.0]];
        let test = array![[10.0], [12.0]];
        let (_, scaled_test) = scale_partitions(ScalingMode::TrainFitted, &train, &test).unwrap();
        // train mean 1, std 1
        assert_eq!(scaled_test, array![[9.0], [11.0]]);
    }

    #[test]
    fn test_per_partition_mode_refits_on_test() {
        let train = array![[0.0], [2.0]];
        let test = array![[10.0], [12.0]];
        let (_, scaled_test) = scale_partitions(ScalingMode::PerPartition, &train, &test).unwrap();
        assert_eq!(scaled_test, array![[-1.0], [1.0]]);
    }

    #[test]
    fn test_zero_columns() {
        let x = Array2::<f64>::zeros((4, 0));
        let scaled = StandardScaler::new().fit_transform(&x).unwrap();
        assert_eq!(scaled.shape(), &[4, 0]);
    }

    #[test]
    fn test_scaling_mode_parse() {
        assert_eq!("per-partition".parse::<ScalingMode>().unwrap(), ScalingMode::PerPartition);
        assert_eq!("TRAIN-FITTED".parse::<ScalingMode>().unwrap(), ScalingMode::TrainFitted);
        assert!("zscore".parse::<ScalingMode>().is_err());
    }
}

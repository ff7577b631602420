//! Confusion matrix for multi-class classification

use crate::error::{ExplorerError, Result};
use ndarray::Array1;
use serde::Serialize;
use std::fmt;

/// Confusion matrix over the classes seen in either the true or the
/// predicted labels.
///
/// Element `[i][j]` counts samples with true label `labels[i]` predicted as
/// `labels[j]`. Labels are sorted ascending.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    /// matrix[actual][predicted] = count
    matrix: Vec<Vec<usize>>,
    labels: Vec<i64>,
}

impl ConfusionMatrix {
    /// Build from ground truth and predictions
    pub fn from_predictions(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(ExplorerError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: y_pred.len().to_string(),
            });
        }

        let truth: Vec<i64> = y_true.iter().map(|v| v.round() as i64).collect();
        let pred: Vec<i64> = y_pred.iter().map(|v| v.round() as i64).collect();

        let mut labels: Vec<i64> = truth.iter().chain(pred.iter()).copied().collect();
        labels.sort_unstable();
        labels.dedup();

        let n = labels.len();
        let mut matrix = vec![vec![0; n]; n];
        for (t, p) in truth.iter().zip(pred.iter()) {
            // Both labels are in `labels` by construction
            if let (Ok(i), Ok(j)) = (labels.binary_search(t), labels.binary_search(p)) {
                matrix[i][j] += 1;
            }
        }

        Ok(Self { matrix, labels })
    }

    /// Raw rows, actual class first
    pub fn matrix(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    pub fn labels(&self) -> &[i64] {
        &self.labels
    }

    pub fn n_classes(&self) -> usize {
        self.labels.len()
    }

    /// Count of samples with the given actual and predicted labels
    pub fn get(&self, actual: i64, predicted: i64) -> Option<usize> {
        let i = self.labels.binary_search(&actual).ok()?;
        let j = self.labels.binary_search(&predicted).ok()?;
        Some(self.matrix[i][j])
    }

    /// Total number of samples
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    /// Largest single cell, used to scale heatmap colors
    pub fn max_count(&self) -> usize {
        self.matrix.iter().flatten().copied().max().unwrap_or(0)
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: usize = (0..self.n_classes()).map(|i| self.matrix[i][i]).sum();
        correct as f64 / total as f64
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8}", "")?;
        for label in &self.labels {
            write!(f, "{:>7}", format!("P{}", label))?;
        }
        writeln!(f)?;

        for (label, row) in self.labels.iter().zip(&self.matrix) {
            write!(f, "{:>8}", format!("A{}", label))?;
            for count in row {
                write!(f, "{:>7}", count)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_from_predictions() {
        let y_true = array![1.0, 1.0, 2.0, 3.0, 3.0];
        let y_pred = array![1.0, 2.0, 2.0, 3.0, 1.0];
        let cm = ConfusionMatrix::from_predictions(&y_true, &y_pred).unwrap();

        assert_eq!(cm.labels(), &[1, 2, 3]);
        assert_eq!(cm.get(1, 1), Some(1));
        assert_eq!(cm.get(1, 2), Some(1));
        assert_eq!(cm.get(3, 1), Some(1));
        assert_eq!(cm.get(4, 1), None);
        assert_eq!(cm.total(), 5);
        assert!((cm.accuracy() - 0.6).abs() < 1e-12);
        assert_eq!(cm.max_count(), 1);
    }

    #[test]
    fn test_predicted_only_class_gets_a_row() {
        let y_true = array![1.0, 1.0];
        let y_pred = array![1.0, 4.0];
        let cm = ConfusionMatrix::from_predictions(&y_true, &y_pred).unwrap();
        assert_eq!(cm.n_classes(), 2);
        assert_eq!(cm.matrix()[1], vec![0, 0]);
    }

    #[test]
    fn test_rows_sum_to_class_support() {
        let y_true = array![0.0, 0.0, 0.0, 1.0];
        let y_pred = array![0.0, 1.0, 1.0, 1.0];
        let cm = ConfusionMatrix::from_predictions(&y_true, &y_pred).unwrap();
        let supports: Vec<usize> = cm.matrix().iter().map(|r| r.iter().sum()).collect();
        assert_eq!(supports, vec![3, 1]);
    }

    #[test]
    fn test_display() {
        let cm = ConfusionMatrix::from_predictions(&array![1.0, 2.0], &array![1.0, 2.0]).unwrap();
        let text = cm.to_string();
        assert!(text.contains("P1"));
        assert!(text.contains("A2"));
    }
}

//! Accuracy metrics

use super::confusion::ConfusionMatrix;
use crate::error::{ExplorerError, Result};
use crate::training::KNNClassifier;
use ndarray::{Array1, Array2};
use serde::Serialize;

/// Fraction of predictions equal to the true label
pub fn accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    if y_true.len() != y_pred.len() {
        return Err(ExplorerError::ShapeError {
            expected: format!("{} predictions", y_true.len()),
            actual: y_pred.len().to_string(),
        });
    }
    if y_true.is_empty() {
        return Ok(0.0);
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t.round() as i64 == p.round() as i64)
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Accuracy as a percentage rounded to two decimals
pub fn accuracy_percent(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    Ok(round2(accuracy(y_true, y_pred)? * 100.0))
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Test-partition results shown on the page
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub accuracy_percent: f64,
    pub confusion: ConfusionMatrix,
    pub n_test: usize,
}

/// Predict the test partition once and derive accuracy and confusion matrix
pub fn evaluate(model: &KNNClassifier, x_test: &Array2<f64>, y_test: &Array1<f64>) -> Result<Evaluation> {
    let y_pred = model.predict(x_test)?;
    let accuracy_percent = accuracy_percent(y_test, &y_pred)?;
    let confusion = ConfusionMatrix::from_predictions(y_test, &y_pred)?;
    Ok(Evaluation {
        accuracy_percent,
        confusion,
        n_test: y_test.len(),
    })
}

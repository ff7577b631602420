//! K-Nearest Neighbors implementation
//!
//! KNN classifier with Minkowski-family distances and uniform or
//! inverse-distance vote weighting.

use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::str::FromStr;

use crate::error::{ExplorerError, Result};

/// Distance metric for KNN
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum DistanceMetric {
    /// Euclidean distance (L2)
    #[default]
    Euclidean,
    /// Manhattan distance (L1)
    Manhattan,
    /// Minkowski distance with parameter p
    Minkowski(f64),
}

impl DistanceMetric {
    /// Minkowski metric of power `p`, using the specialised forms for 1 and 2
    pub fn minkowski(p: f64) -> Self {
        if p == 2.0 {
            Self::Euclidean
        } else if p == 1.0 {
            Self::Manhattan
        } else {
            Self::Minkowski(p)
        }
    }
}

/// Weighting scheme for neighbors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeightScheme {
    /// All neighbors have equal weight
    #[default]
    Uniform,
    /// Closer neighbors have more weight (inverse distance)
    Distance,
}

impl fmt::Display for WeightScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightScheme::Uniform => write!(f, "uniform"),
            WeightScheme::Distance => write!(f, "distance"),
        }
    }
}

impl FromStr for WeightScheme {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "uniform" => Ok(WeightScheme::Uniform),
            "distance" => Ok(WeightScheme::Distance),
            _ => Err(ExplorerError::InvalidParameter {
                name: "weights".to_string(),
                value: s.to_string(),
                reason: "expected uniform or distance".to_string(),
            }),
        }
    }
}

/// KNN configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNConfig {
    /// Number of neighbors
    pub n_neighbors: usize,
    /// Distance metric
    pub metric: DistanceMetric,
    /// Weighting scheme
    pub weights: WeightScheme,
}

impl Default for KNNConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 5,
            metric: DistanceMetric::Euclidean,
            weights: WeightScheme::Uniform,
        }
    }
}

/// K-Nearest Neighbors Classifier
///
/// Labels are class codes stored as `f64`; they are compared after rounding
/// to integers.
#[derive(Debug, Clone)]
pub struct KNNClassifier {
    config: KNNConfig,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<i64>>,
    classes: Vec<i64>,
}

impl KNNClassifier {
    pub fn new(config: KNNConfig) -> Self {
        Self {
            config,
            x_train: None,
            y_train: None,
            classes: Vec::new(),
        }
    }

    /// Create with default config and specified k
    pub fn with_k(k: usize) -> Self {
        Self::new(KNNConfig {
            n_neighbors: k,
            ..Default::default()
        })
    }

    /// Sorted class labels seen during fit
    pub fn classes(&self) -> &[i64] {
        &self.classes
    }

    /// Fit the classifier (stores training data)
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let k = self.config.n_neighbors;
        if k == 0 {
            return Err(ExplorerError::InvalidParameter {
                name: "n_neighbors".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if x.nrows() != y.len() {
            return Err(ExplorerError::ShapeError {
                expected: format!("{} labels", x.nrows()),
                actual: y.len().to_string(),
            });
        }
        if x.ncols() == 0 {
            return Err(ExplorerError::TrainingError(format!(
                "found array with 0 feature(s) (shape=({}, 0)) while a minimum of 1 is required",
                x.nrows()
            )));
        }
        if k > x.nrows() {
            return Err(ExplorerError::TrainingError(format!(
                "expected n_neighbors <= n_samples_fit, but n_neighbors = {}, n_samples_fit = {}",
                k,
                x.nrows()
            )));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(ExplorerError::TrainingError(
                "input contains NaN or infinity".to_string(),
            ));
        }

        let labels: Array1<i64> = y.mapv(|v| v.round() as i64);
        let mut class_set: Vec<i64> = labels.to_vec();
        class_set.sort_unstable();
        class_set.dedup();

        self.x_train = Some(x.clone());
        self.y_train = Some(labels);
        self.classes = class_set;

        Ok(())
    }

    /// Predict class labels (parallelized over test samples)
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (x_train, y_train) = match (&self.x_train, &self.y_train) {
            (Some(xt), Some(yt)) => (xt, yt),
            _ => return Err(ExplorerError::ModelNotFitted),
        };
        if x.ncols() != x_train.ncols() {
            return Err(ExplorerError::ShapeError {
                expected: format!("{} features", x_train.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(ExplorerError::TrainingError(
                "input contains NaN or infinity".to_string(),
            ));
        }

        let k = self.config.n_neighbors;
        let metric = self.config.metric;
        let weights = self.config.weights;
        let classes = &self.classes;

        let predictions: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let row = x.row(i);
                let neighbors = find_k_nearest(row, x_train, y_train, k, metric);
                vote_classify(&neighbors, classes, weights) as f64
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    /// Mean accuracy on the given data and labels
    pub fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let predictions = self.predict(x)?;
        if predictions.is_empty() {
            return Ok(0.0);
        }
        let correct = predictions
            .iter()
            .zip(y.iter())
            .filter(|(p, t)| p.round() as i64 == t.round() as i64)
            .count();
        Ok(correct as f64 / predictions.len() as f64)
    }

    /// Distance between two points under the configured metric
    pub fn distance(&self, a: &Array1<f64>, b: &Array1<f64>) -> f64 {
        compute_distance(a.view(), b.view(), self.config.metric)
    }
}

// ============================================================================
// Neighbor search and voting
// ============================================================================

/// Max-heap entry for partial sort (keeps k smallest distances)
#[derive(PartialEq)]
struct DistLabel(f64, i64);

impl Eq for DistLabel {}
impl PartialOrd for DistLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DistLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
    }
}

/// Find k nearest neighbors using a max-heap, O(n log k).
/// On equal distances the earlier training row wins.
fn find_k_nearest(
    point: ArrayView1<f64>,
    x_train: &Array2<f64>,
    y_train: &Array1<i64>,
    k: usize,
    metric: DistanceMetric,
) -> Vec<(f64, i64)> {
    let mut heap = BinaryHeap::with_capacity(k + 1);

    for (i, row) in x_train.rows().into_iter().enumerate() {
        let dist = compute_distance(point, row, metric);
        if heap.len() < k {
            heap.push(DistLabel(dist, y_train[i]));
        } else if let Some(top) = heap.peek() {
            if dist < top.0 {
                heap.pop();
                heap.push(DistLabel(dist, y_train[i]));
            }
        }
    }

    heap.into_iter().map(|dl| (dl.0, dl.1)).collect()
}

/// Compute distance between two points using the specified metric
fn compute_distance(a: ArrayView1<f64>, b: ArrayView1<f64>, metric: DistanceMetric) -> f64 {
    match metric {
        DistanceMetric::Euclidean => a
            .iter()
            .zip(b.iter())
            .map(|(ai, bi)| {
                let d = ai - bi;
                d * d
            })
            .sum::<f64>()
            .sqrt(),
        DistanceMetric::Manhattan => a.iter().zip(b.iter()).map(|(ai, bi)| (ai - bi).abs()).sum(),
        DistanceMetric::Minkowski(p) => a
            .iter()
            .zip(b.iter())
            .map(|(ai, bi)| (ai - bi).abs().powf(p))
            .sum::<f64>()
            .powf(1.0 / p),
    }
}

/// Vote weights for a neighbor set. With distance weighting, neighbors at
/// distance zero take the whole vote.
fn neighbor_weights(neighbors: &[(f64, i64)], weights: WeightScheme) -> Vec<f64> {
    match weights {
        WeightScheme::Uniform => vec![1.0; neighbors.len()],
        WeightScheme::Distance => {
            if neighbors.iter().any(|(d, _)| *d == 0.0) {
                neighbors
                    .iter()
                    .map(|(d, _)| if *d == 0.0 { 1.0 } else { 0.0 })
                    .collect()
            } else {
                neighbors.iter().map(|(d, _)| 1.0 / d).collect()
            }
        }
    }
}

/// Classify by weighted majority vote; ties go to the smallest class label
fn vote_classify(neighbors: &[(f64, i64)], classes: &[i64], weights: WeightScheme) -> i64 {
    let w = neighbor_weights(neighbors, weights);
    let mut votes = vec![0.0; classes.len()];
    for (&(_, label), weight) in neighbors.iter().zip(w) {
        if let Ok(idx) = classes.binary_search(&label) {
            votes[idx] += weight;
        }
    }

    let mut best = 0;
    for (idx, v) in votes.iter().enumerate() {
        if *v > votes[best] {
            best = idx;
        }
    }
    classes.get(best).copied().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_classification_data() -> (Array2<f64>, Array1<f64>) {
        // Create linearly separable data
        let x = Array2::from_shape_vec((20, 2), vec![
            // Class 0 (low values)
            1.0, 1.0, 1.5, 1.5, 2.0, 2.0, 2.5, 2.5, 1.0, 2.0,
            1.5, 2.5, 2.0, 1.5, 2.5, 1.0, 1.2, 1.8, 1.8, 1.2,
            // Class 1 (high values)
            8.0, 8.0, 8.5, 8.5, 9.0, 9.0, 9.5, 9.5, 8.0, 9.0,
            8.5, 9.5, 9.0, 8.5, 9.5, 8.0, 8.2, 8.8, 8.8, 8.2,
        ]).unwrap();

        let y = Array1::from_vec(vec![
            0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
            1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0,
        ]);

        (x, y)
    }

    #[test]
    fn test_knn_classifier() {
        let (x, y) = create_classification_data();

        let mut knn = KNNClassifier::with_k(3);
        knn.fit(&x, &y).unwrap();

        let accuracy = knn.score(&x, &y).unwrap();
        assert!(accuracy > 0.9, "Accuracy ({}) should be above 90%", accuracy);
        assert_eq!(knn.classes(), &[0, 1]);
    }

    #[test]
    fn test_distance_metrics() {
        let a = Array1::from_vec(vec![0.0, 0.0]);
        let b = Array1::from_vec(vec![3.0, 4.0]);

        let knn = KNNClassifier::new(KNNConfig {
            metric: DistanceMetric::minkowski(2.0),
            ..Default::default()
        });
        assert!((knn.distance(&a, &b) - 5.0).abs() < 0.001, "Euclidean distance should be 5.0");

        let manhattan = KNNClassifier::new(KNNConfig {
            metric: DistanceMetric::minkowski(1.0),
            ..Default::default()
        });
        assert!((manhattan.distance(&a, &b) - 7.0).abs() < 1e-12);

        let cubic = KNNClassifier::new(KNNConfig {
            metric: DistanceMetric::minkowski(3.0),
            ..Default::default()
        });
        let expected = (27.0f64 + 64.0).powf(1.0 / 3.0);
        assert!((cubic.distance(&a, &b) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_knn() {
        let (x, y) = create_classification_data();

        let mut knn = KNNClassifier::new(KNNConfig {
            n_neighbors: 5,
            weights: WeightScheme::Distance,
            ..Default::default()
        });
        knn.fit(&x, &y).unwrap();

        let predictions = knn.predict(&x).unwrap();
        assert_eq!(predictions.len(), 20);
        // Every training point is its own zero-distance neighbor
        assert_eq!(predictions, y);
    }

    #[test]
    fn test_distance_weights_override_majority() {
        // Two far points of class 1, one close point of class 0
        let x = Array2::from_shape_vec((3, 1), vec![0.1, 5.0, 5.5]).unwrap();
        let y = Array1::from_vec(vec![0.0, 1.0, 1.0]);
        let query = Array2::from_shape_vec((1, 1), vec![0.0]).unwrap();

        let mut uniform = KNNClassifier::with_k(3);
        uniform.fit(&x, &y).unwrap();
        assert_eq!(uniform.predict(&query).unwrap()[0], 1.0);

        let mut weighted = KNNClassifier::new(KNNConfig {
            n_neighbors: 3,
            weights: WeightScheme::Distance,
            ..Default::default()
        });
        weighted.fit(&x, &y).unwrap();
        assert_eq!(weighted.predict(&query).unwrap()[0], 0.0);
    }

    #[test]
    fn test_tie_goes_to_smallest_label() {
        let x = Array2::from_shape_vec((2, 1), vec![-1.0, 1.0]).unwrap();
        let y = Array1::from_vec(vec![4.0, 2.0]);
        let mut knn = KNNClassifier::with_k(2);
        knn.fit(&x, &y).unwrap();
        let query = Array2::from_shape_vec((1, 1), vec![0.0]).unwrap();
        assert_eq!(knn.predict(&query).unwrap()[0], 2.0);
    }

    #[test]
    fn test_fit_rejects_empty_features() {
        let x = Array2::<f64>::zeros((10, 0));
        let y = Array1::zeros(10);
        let err = KNNClassifier::with_k(3).fit(&x, &y).unwrap_err();
        assert!(matches!(err, ExplorerError::TrainingError(_)));
    }

    #[test]
    fn test_fit_rejects_too_many_neighbors() {
        let (x, y) = create_classification_data();
        assert!(KNNClassifier::with_k(21).fit(&x, &y).is_err());
        assert!(KNNClassifier::with_k(0).fit(&x, &y).is_err());
    }

    #[test]
    fn test_non_finite_input_is_rejected() {
        let (x, y) = create_classification_data();
        let mut with_nan = x.clone();
        with_nan[[3, 1]] = f64::NAN;
        assert!(KNNClassifier::with_k(3).fit(&with_nan, &y).is_err());

        let mut knn = KNNClassifier::with_k(3);
        knn.fit(&x, &y).unwrap();
        let query = Array2::from_shape_vec((1, 2), vec![1.0, f64::NAN]).unwrap();
        assert!(matches!(knn.predict(&query), Err(ExplorerError::TrainingError(_))));
    }

    #[test]
    fn test_predict_requires_fit() {
        let knn = KNNClassifier::with_k(3);
        let x = Array2::zeros((1, 2));
        assert!(matches!(knn.predict(&x), Err(ExplorerError::ModelNotFitted)));
    }

    #[test]
    fn test_weight_scheme_parse() {
        assert_eq!("distance".parse::<WeightScheme>().unwrap(), WeightScheme::Distance);
        assert_eq!("Uniform".parse::<WeightScheme>().unwrap(), WeightScheme::Uniform);
        assert!("gaussian".parse::<WeightScheme>().is_err());
    }
}

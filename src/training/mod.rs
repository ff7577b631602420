//! Model training module
//!
//! Provides the k-nearest-neighbors classifier trained by the page.

pub mod knn;

pub use knn::{DistanceMetric, KNNClassifier, KNNConfig, WeightScheme};

//! knn-explorer - k-nearest-neighbors classification explorer
//!
//! A logged-in user picks a categorical target and a set of predictor
//! features, trains a k-NN classifier on demand and inspects its accuracy
//! together with a confusion-matrix heatmap.
//!
//! # Modules
//!
//! ## Pipeline
//! - [`session`] - Login-state capability and the page guard
//! - [`data`] - Dataset decoding (plain or sealed CSV) and loading
//! - [`selection`] - Target and feature selection
//! - [`preprocessing`] - Train/test split and standard scaling
//! - [`training`] - K-nearest-neighbors classifier
//! - [`evaluation`] - Accuracy and confusion matrix
//! - [`page`] - The render pipeline tying the stages together
//!
//! ## Infrastructure
//! - [`cache`] - Memoization caches keyed by input hashes
//! - [`config`] - Page configuration and the variable catalog
//! - [`render`] - Terminal and SVG output
//! - [`cli`] - Command-line interface

pub mod error;

pub mod config;
pub mod session;
pub mod data;
pub mod selection;
pub mod preprocessing;
pub mod training;
pub mod evaluation;
pub mod cache;
pub mod page;
pub mod render;
pub mod cli;

pub use error::{ExplorerError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{ExplorerError, Result};
    pub use crate::config::{PageConfig, SplitConfig, KNNSettings, FeatureSelection, VariableCatalog};
    pub use crate::session::{SessionStore, InMemorySession};
    pub use crate::data::{DatasetLoader, DatasetDecoder, PlainCsv, SealedCsv, TargetLabels};
    pub use crate::preprocessing::{StandardScaler, ScalingMode, TrainTestSplit, train_test_split};
    pub use crate::training::{KNNClassifier, KNNConfig, DistanceMetric, WeightScheme};
    pub use crate::evaluation::{ConfusionMatrix, Evaluation};
    pub use crate::page::{KnnPage, PageOutcome, PageReport, Halt};
}

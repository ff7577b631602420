//! Data preprocessing module
//!
//! Provides the two steps between feature extraction and training:
//! - Seeded train/test splitting
//! - Feature standardization (zero mean, unit variance)

mod scaler;
mod split;

pub use scaler::{scale_partitions, ScalingMode, StandardScaler};
pub use split::{test_size_for, train_test_split, TrainTestSplit};

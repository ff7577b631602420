//! Model evaluation
//!
//! Accuracy and confusion matrix of a fitted classifier on the held-out
//! test partition.

mod confusion;
mod metrics;

pub use confusion::ConfusionMatrix;
pub use metrics::{accuracy, accuracy_percent, evaluate, Evaluation};

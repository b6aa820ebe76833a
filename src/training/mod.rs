//! Model training module
//!
//! Provides the training side of the pipeline:
//! - Gradient-boosted tree classifier minimizing log-loss
//! - Seeded stratified train/holdout split
//! - Holdout metrics (accuracy, precision, recall, F1, log-loss)
//! - The [`Trainer`] that produces a complete artifact bundle

mod config;
mod engine;
mod metrics;
pub mod booster;
pub mod split;

pub use booster::{BoostedClassifier, TreeNode};
pub use config::{BoosterConfig, TrainingConfig};
pub use engine::Trainer;
pub use metrics::ModelMetrics;
pub use split::{stratified_split, SplitPart};

//! Talent Retention - employee job-change prediction
//!
//! This crate trains a gradient-boosted classifier on tabular employee data
//! and serves it behind a strict feature-encoding contract:
//! - Label encoding with persisted, lexicographically ordered code tables
//! - An explicit feature schema that fixes column order
//! - One versioned artifact bundle validated by a schema hash at load
//! - Single-record and batch prediction with a fixed `p > 0.5` rule
//! - HTTP server and CLI with a session-based login gate
//!
//! # Modules
//!
//! ## Core
//! - [`preprocessing`] - Encoders, feature schema, encoding contract
//! - [`training`] - Boosted trees, stratified split, metrics, trainer
//! - [`export`] - Artifact bundle persistence
//! - [`inference`] - Predictor, form descriptors, probability chart
//!
//! ## Services
//! - [`security`] - Credential store and sessions
//! - [`server`] - HTTP server with REST API
//! - [`cli`] - Command-line interface
//!
//! ## Utilities
//! - [`utils`] - CSV loading and saving

// Core error handling
pub mod error;

// Core ML modules
pub mod preprocessing;
pub mod training;
pub mod export;
pub mod inference;

// Utilities
pub mod utils;

// Services
pub mod security;
pub mod server;
pub mod cli;

pub use error::{Result, RetentionError};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{Result, RetentionError};

    // Preprocessing
    pub use crate::preprocessing::{
        ColumnType, EncoderRegistry, EncodingContract, FeatureSchema, LabelEncoder, RawRecord, RawValue,
    };

    // Training
    pub use crate::training::{BoostedClassifier, BoosterConfig, ModelMetrics, Trainer, TrainingConfig};

    // Export
    pub use crate::export::{ArtifactBundle, TrainingMetadata};

    // Inference
    pub use crate::inference::{InferenceConfig, JobChangeLabel, Prediction, Predictor};

    // Security
    pub use crate::security::{CredentialStore, InMemoryCredentialStore, SessionManager};

    // Utilities
    pub use crate::utils::DataLoader;
}

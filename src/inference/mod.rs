//! Inference module
//!
//! Provides prediction over a loaded artifact bundle:
//! - Single-record prediction through the encoding contract
//! - Batch prediction over a table (parallel via rayon)
//! - Form descriptors and the two-bar probability chart for UIs

mod config;
mod engine;

pub use config::InferenceConfig;
pub use engine::{
    probability_chart, ChartBar, FieldDescriptor, JobChangeLabel, Prediction, Predictor,
    DECISION_THRESHOLD,
};

//! Predictor over a loaded artifact bundle
//!
//! The bundle is shared read-only behind an `Arc`. A prediction encodes the
//! record through the bundle's contract, runs one forward pass and applies
//! the fixed `p > 0.5` decision rule. Nothing is cached or counted, so a
//! failed encode leaves no trace.

use super::InferenceConfig;
use crate::error::Result;
use crate::export::ArtifactBundle;
use crate::preprocessing::{ColumnType, RawRecord};
use ndarray::{Array1, Axis};
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Probability above which a record is labeled [`JobChangeLabel::WillChange`]
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Predicted outcome for one employee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobChangeLabel {
    WillChange,
    WillStay,
}

impl JobChangeLabel {
    pub fn from_probability(probability: f64) -> Self {
        if probability > DECISION_THRESHOLD {
            JobChangeLabel::WillChange
        } else {
            JobChangeLabel::WillStay
        }
    }

    /// Numeric class as in the training target
    pub fn as_class(&self) -> u8 {
        match self {
            JobChangeLabel::WillChange => 1,
            JobChangeLabel::WillStay => 0,
        }
    }
}

impl fmt::Display for JobChangeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobChangeLabel::WillChange => write!(f, "Likely to Change Job"),
            JobChangeLabel::WillStay => write!(f, "Likely to Stay"),
        }
    }
}

/// Label plus positive-class probability
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: JobChangeLabel,
    /// Probability of a job change, in [0, 1]
    pub probability: f64,
}

impl Prediction {
    pub fn from_probability(probability: f64) -> Self {
        let probability = probability.clamp(0.0, 1.0);
        Self {
            label: JobChangeLabel::from_probability(probability),
            probability,
        }
    }

    pub fn stay_probability(&self) -> f64 {
        1.0 - self.probability
    }
}

/// One input field of the prediction form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: ColumnType,
    /// Known categories in code order; empty for numeric fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// One bar of the probability chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartBar {
    pub label: String,
    pub value: f64,
}

/// Two-bar series: `[Stay: 1 - p, Change Job: p]`
pub fn probability_chart(prediction: &Prediction) -> Vec<ChartBar> {
    vec![
        ChartBar {
            label: "Stay".to_string(),
            value: prediction.stay_probability(),
        },
        ChartBar {
            label: "Change Job".to_string(),
            value: prediction.probability,
        },
    ]
}

/// Scores raw records against a loaded bundle
#[derive(Debug, Clone)]
pub struct Predictor {
    bundle: Arc<ArtifactBundle>,
    config: InferenceConfig,
}

impl Predictor {
    pub fn new(bundle: Arc<ArtifactBundle>) -> Self {
        Self {
            bundle,
            config: InferenceConfig::default(),
        }
    }

    /// Load and validate a bundle from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bundle = ArtifactBundle::load(path)?;
        tracing::info!(
            features = bundle.schema.len(),
            hash = %bundle.schema_hash,
            "Loaded artifact bundle"
        );
        Ok(Self::new(Arc::new(bundle)))
    }

    pub fn with_config(mut self, config: InferenceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bundle(&self) -> &Arc<ArtifactBundle> {
        &self.bundle
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Predict one raw record
    pub fn predict(&self, record: &RawRecord) -> Result<Prediction> {
        let row = self.bundle.contract().encode_record(record)?;
        let probability = self.bundle.classifier.predict_proba_row(row.view())?;
        Ok(Prediction::from_probability(probability))
    }

    /// Predict every row of a table, in row order
    pub fn predict_frame(&self, df: &DataFrame) -> Result<Vec<Prediction>> {
        let x = self.bundle.contract().encode_frame(df)?;
        let classifier = &self.bundle.classifier;
        let batch_size = self.config.batch_size.max(1);

        let chunks: Vec<_> = x.axis_chunks_iter(Axis(0), batch_size).collect();
        let scored: Vec<Array1<f64>> = if self.config.parallel {
            chunks
                .par_iter()
                .map(|chunk| classifier.predict_proba(&chunk.to_owned()))
                .collect::<Result<_>>()?
        } else {
            chunks
                .iter()
                .map(|chunk| classifier.predict_proba(&chunk.to_owned()))
                .collect::<Result<_>>()?
        };

        Ok(scored
            .iter()
            .flat_map(|probs| probs.iter().copied())
            .map(Prediction::from_probability)
            .collect())
    }

    /// Form fields for every caller-supplied column, in schema order
    pub fn form_fields(&self) -> Vec<FieldDescriptor> {
        let schema = &self.bundle.schema;
        let encoders = &self.bundle.encoders;
        schema
            .required_columns()
            .map(|name| {
                let kind = ColumnType::of(name, encoders);
                let options = encoders
                    .get(name)
                    .map(|encoder| encoder.classes().to_vec())
                    .unwrap_or_default();
                FieldDescriptor {
                    name: name.to_string(),
                    kind,
                    options,
                }
            })
            .collect()
    }
}

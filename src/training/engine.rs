//! Training engine
//!
//! Turns a labeled table into an [`ArtifactBundle`]: fits the encoders,
//! records the feature schema, encodes the table through the same contract
//! inference uses, splits, boosts and evaluates.

use super::booster::BoostedClassifier;
use super::config::TrainingConfig;
use super::metrics::ModelMetrics;
use super::split::stratified_split;
use crate::error::{Result, RetentionError};
use crate::export::{ArtifactBundle, TrainingMetadata};
use crate::preprocessing::{EncoderRegistry, EncodingContract, FeatureSchema};
use ndarray::Array1;
use polars::prelude::*;
use std::time::Instant;
use tracing::info;

/// Fits the full artifact set from a labeled DataFrame
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train on `df` and return the validated bundle
    pub fn fit(&self, df: &DataFrame) -> Result<ArtifactBundle> {
        self.config.validate()?;
        let start = Instant::now();
        let target = self.config.target_column.as_str();

        let y = self.extract_target(df)?;
        let schema = self.build_schema(df)?;

        let mut exclude = vec![target];
        if let Some(id) = schema.identifier() {
            exclude.push(id);
        }
        let encoders = EncoderRegistry::fit(df, &exclude)?;

        info!(
            rows = df.height(),
            features = schema.len(),
            categorical = encoders.len(),
            "Prepared training data"
        );

        let x = EncodingContract::new(&schema, &encoders).encode_frame(df)?;
        let (train, test) = stratified_split(&x, &y, self.config.test_size, self.config.random_state)?;

        let mut classifier = BoostedClassifier::new(self.config.booster.clone());
        classifier.fit(&train.x, &train.y)?;

        let probabilities = classifier.predict_proba(&test.x)?;
        let metrics = ModelMetrics::compute_binary(&test.y, &probabilities);

        info!(
            accuracy = metrics.accuracy,
            f1 = metrics.f1_score,
            log_loss = metrics.log_loss,
            train = train.y.len(),
            holdout = test.y.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Training complete"
        );

        let feature_importances = classifier
            .feature_importances()
            .map(|imp| schema.columns().iter().cloned().zip(imp.iter().copied()).collect())
            .unwrap_or_default();

        let metadata = TrainingMetadata {
            target_column: target.to_string(),
            test_size: self.config.test_size,
            random_state: self.config.random_state,
            n_rows: df.height(),
            n_train: train.y.len(),
            n_test: test.y.len(),
            metrics,
            booster: self.config.booster.clone(),
            feature_importances,
        };

        ArtifactBundle::new(schema, encoders, classifier, metadata)
    }

    /// Binary target as 0.0/1.0
    fn extract_target(&self, df: &DataFrame) -> Result<Array1<f64>> {
        let name = &self.config.target_column;
        let series = df
            .column(name)
            .map_err(|_| RetentionError::FeatureNotFound(name.clone()))?
            .as_materialized_series()
            .cast(&DataType::Float64)
            .map_err(|e| RetentionError::DataError(format!("target '{}': {}", name, e)))?;

        let values = series
            .f64()?
            .into_iter()
            .enumerate()
            .map(|(row, v)| match v {
                Some(v) if v == 0.0 || v == 1.0 => Ok(v),
                other => Err(RetentionError::DataError(format!(
                    "target '{}' must be 0 or 1, row {} has {:?}",
                    name, row, other
                ))),
            })
            .collect::<Result<Vec<f64>>>()?;

        Ok(Array1::from(values))
    }

    /// Every non-target column, in table order
    fn build_schema(&self, df: &DataFrame) -> Result<FeatureSchema> {
        let columns: Vec<String> = df
            .get_column_names()
            .into_iter()
            .filter(|name| name.as_str() != self.config.target_column)
            .map(|name| name.to_string())
            .collect();

        let identifier = self
            .config
            .identifier_column
            .clone()
            .filter(|id| columns.contains(id));

        FeatureSchema::new(columns, identifier)
    }
}

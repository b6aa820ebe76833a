//! Training configuration

use crate::error::{Result, RetentionError};
use serde::{Deserialize, Serialize};

/// Hyperparameters of the gradient-boosted tree ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoosterConfig {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Shrinkage applied to every tree's output
    pub learning_rate: f64,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Minimum hessian sum per child
    pub min_child_weight: f64,
    /// L2 regularization on leaf weights
    pub reg_lambda: f64,
    /// L1 regularization on leaf weights
    pub reg_alpha: f64,
    /// Minimum loss reduction to make a split
    pub gamma: f64,
    /// Row sampling ratio per tree
    pub subsample: f64,
    /// Column sampling ratio per tree
    pub colsample_bytree: f64,
    /// Seed for row and column sampling
    pub random_state: Option<u64>,
}

impl Default for BoosterConfig {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            learning_rate: 0.1,
            max_depth: 5,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            reg_alpha: 0.0,
            gamma: 0.0,
            subsample: 0.8,
            colsample_bytree: 0.8,
            random_state: Some(42),
        }
    }
}

impl BoosterConfig {
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(invalid("n_estimators", self.n_estimators, "must be at least 1"));
        }
        if self.max_depth == 0 {
            return Err(invalid("max_depth", self.max_depth, "must be at least 1"));
        }
        if !(self.learning_rate > 0.0) {
            return Err(invalid("learning_rate", self.learning_rate, "must be positive"));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(invalid("subsample", self.subsample, "must be in (0, 1]"));
        }
        if !(self.colsample_bytree > 0.0 && self.colsample_bytree <= 1.0) {
            return Err(invalid("colsample_bytree", self.colsample_bytree, "must be in (0, 1]"));
        }
        if self.reg_lambda < 0.0 || self.reg_alpha < 0.0 || self.gamma < 0.0 || self.min_child_weight < 0.0 {
            return Err(invalid(
                "regularization",
                format!("lambda={}, alpha={}, gamma={}, min_child_weight={}",
                    self.reg_lambda, self.reg_alpha, self.gamma, self.min_child_weight),
                "must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Configuration for a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Binary target column name
    pub target_column: String,

    /// Passthrough identifier column (kept in the schema, neutralized)
    pub identifier_column: Option<String>,

    /// Fraction of rows held out for evaluation
    pub test_size: f64,

    /// Seed for the stratified split
    pub random_state: u64,

    /// Booster hyperparameters
    pub booster: BoosterConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            target_column: "target".to_string(),
            identifier_column: Some("enrollee_id".to_string()),
            test_size: 0.2,
            random_state: 42,
            booster: BoosterConfig::default(),
        }
    }
}

impl TrainingConfig {
    /// Create a new configuration
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target_column: target.into(),
            ..Default::default()
        }
    }

    /// Builder method to set (or clear) the identifier column
    pub fn with_identifier(mut self, column: Option<String>) -> Self {
        self.identifier_column = column;
        self
    }

    /// Builder method to set the holdout fraction
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    /// Builder method to seed both the split and the booster
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self.booster.random_state = Some(seed);
        self
    }

    /// Builder method to replace booster hyperparameters
    pub fn with_booster(mut self, booster: BoosterConfig) -> Self {
        self.booster = booster;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_column.is_empty() {
            return Err(RetentionError::ConfigError("target column must not be empty".to_string()));
        }
        if self.identifier_column.as_deref() == Some(self.target_column.as_str()) {
            return Err(RetentionError::ConfigError(
                "identifier column cannot be the target column".to_string(),
            ));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(invalid("test_size", self.test_size, "must be in (0, 1)"));
        }
        self.booster.validate()
    }
}

fn invalid(name: &str, value: impl ToString, reason: &str) -> RetentionError {
    RetentionError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

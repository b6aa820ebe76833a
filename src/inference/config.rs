//! Inference configuration

use serde::{Deserialize, Serialize};

/// Configuration for batch prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Rows scored per chunk
    pub batch_size: usize,

    /// Score chunks in parallel with rayon
    pub parallel: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            parallel: true,
        }
    }
}

impl InferenceConfig {
    /// Create a new inference configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set batch size
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Builder method to toggle parallel scoring
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InferenceConfig::default();
        assert_eq!(config.batch_size, 1000);
        assert!(config.parallel);
    }

    #[test]
    fn test_builder_pattern() {
        let config = InferenceConfig::new().with_batch_size(0).with_parallel(false);
        assert_eq!(config.batch_size, 1);
        assert!(!config.parallel);
    }
}

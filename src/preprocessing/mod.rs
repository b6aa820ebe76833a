//! Feature preprocessing module
//!
//! Provides the pieces that turn raw employee records into model input:
//! - Label encoding of categorical columns with persisted code tables
//! - The ordered feature schema recorded at training time
//! - The encoding contract applied identically at training and inference

mod encoder;
mod schema;
pub mod contract;

pub use contract::{EncodingContract, RawRecord, RawValue, IDENTIFIER_PLACEHOLDER};
pub use encoder::{EncoderRegistry, LabelEncoder, MISSING_CATEGORY};
pub use schema::FeatureSchema;

use serde::{Deserialize, Serialize};

/// Kind of a feature column as seen by the contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Numeric,
    Categorical,
}

impl ColumnType {
    /// Classify `column` by whether the registry holds an encoder for it
    pub fn of(column: &str, registry: &EncoderRegistry) -> Self {
        if registry.contains(column) {
            ColumnType::Categorical
        } else {
            ColumnType::Numeric
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_of() {
        let mut registry = EncoderRegistry::new();
        registry.insert("city", LabelEncoder::fit(vec![Some("city_1")]));
        assert_eq!(ColumnType::of("city", &registry), ColumnType::Categorical);
        assert_eq!(ColumnType::of("training_hours", &registry), ColumnType::Numeric);
    }

    #[test]
    fn test_column_type_serialize() {
        let json = serde_json::to_string(&ColumnType::Categorical).unwrap();
        assert_eq!(json, "\"categorical\"");
    }
}

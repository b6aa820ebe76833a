//! Ordered feature schema recorded at training time

use crate::error::{Result, RetentionError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Ordered list of the columns the classifier was fit on.
///
/// The identifier column, when present, is part of the schema (the model
/// was trained with it) but never carries a caller-supplied value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    columns: Vec<String>,
    identifier: Option<String>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>, identifier: Option<String>) -> Result<Self> {
        let schema = Self { columns, identifier };
        schema.validate()?;
        Ok(schema)
    }

    /// Check column uniqueness and identifier membership
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(RetentionError::SchemaMismatch(
                "feature schema has no columns".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(self.columns.len());
        for column in &self.columns {
            if !seen.insert(column.as_str()) {
                return Err(RetentionError::SchemaMismatch(format!(
                    "duplicate column '{}' in feature schema",
                    column
                )));
            }
        }

        if let Some(id) = &self.identifier {
            if !seen.contains(id.as_str()) {
                return Err(RetentionError::SchemaMismatch(format!(
                    "identifier column '{}' is not part of the feature schema",
                    id
                )));
            }
        }

        Ok(())
    }

    /// All columns in model order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn is_identifier(&self, column: &str) -> bool {
        self.identifier.as_deref() == Some(column)
    }

    /// Columns a caller must supply, in model order
    pub fn required_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .map(String::as_str)
            .filter(move |c| !self.is_identifier(c))
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

//! Feature-encoding contract shared by training and inference
//!
//! A raw record (column name -> raw value) becomes the exact numeric row the
//! classifier was fit on:
//! - categorical columns are replaced by their registry code; values never
//!   seen during training are rejected
//! - numeric columns pass through unchanged
//! - the identifier column is always the neutral placeholder
//! - the output follows the feature schema's column order
//!
//! [`EncodingContract::encode_frame`] applies the same rules to a whole
//! table, and training builds its matrix through it, so both ends go through
//! one code path.

use super::encoder::{as_string_series, EncoderRegistry, MISSING_CATEGORY};
use super::schema::FeatureSchema;
use crate::error::{Result, RetentionError};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Value written into the identifier column
pub const IDENTIFIER_PLACEHOLDER: f64 = 0.0;

/// One raw input value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Missing,
}

impl RawValue {
    fn describe(&self) -> String {
        match self {
            RawValue::Number(n) => n.to_string(),
            RawValue::Text(s) => format!("{:?}", s),
            RawValue::Missing => "null".to_string(),
        }
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Number(v)
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        RawValue::Number(v as f64)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        RawValue::Text(v)
    }
}

/// Unordered mapping from column name to raw value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(HashMap<String, RawValue>);

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, column: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<RawValue>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.0.get(column)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<RawValue>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Read-only view pairing a schema with its encoders
#[derive(Debug, Clone, Copy)]
pub struct EncodingContract<'a> {
    schema: &'a FeatureSchema,
    registry: &'a EncoderRegistry,
}

impl<'a> EncodingContract<'a> {
    pub fn new(schema: &'a FeatureSchema, registry: &'a EncoderRegistry) -> Self {
        Self { schema, registry }
    }

    pub fn schema(&self) -> &'a FeatureSchema {
        self.schema
    }

    pub fn registry(&self) -> &'a EncoderRegistry {
        self.registry
    }

    /// Encode one record into a row vector in schema order.
    pub fn encode_record(&self, record: &RawRecord) -> Result<Array1<f64>> {
        let missing: Vec<&str> = self
            .schema
            .required_columns()
            .filter(|c| record.get(c).is_none())
            .collect();

        if !missing.is_empty() {
            return Err(RetentionError::SchemaMismatch(format!(
                "missing required columns: {}",
                missing.join(", ")
            )));
        }

        let mut row = Vec::with_capacity(self.schema.len());
        for column in self.schema.columns() {
            if self.schema.is_identifier(column) {
                row.push(IDENTIFIER_PLACEHOLDER);
                continue;
            }

            let value = record
                .get(column)
                .ok_or_else(|| RetentionError::SchemaMismatch(format!("missing required column: {}", column)))?;
            row.push(self.encode_value(column, value)?);
        }

        Ok(Array1::from(row))
    }

    /// Encode a single value for `column`.
    pub fn encode_value(&self, column: &str, value: &RawValue) -> Result<f64> {
        if self.registry.contains(column) {
            let category = match value {
                RawValue::Text(s) => s.as_str(),
                RawValue::Missing => MISSING_CATEGORY,
                RawValue::Number(_) => {
                    return Err(RetentionError::InvalidInput(format!(
                        "column '{}' is categorical, got number {}",
                        column,
                        value.describe()
                    )))
                }
            };
            return self.registry.encode(column, category).map(|code| code as f64);
        }

        match value {
            RawValue::Number(n) => Ok(*n),
            RawValue::Missing => Ok(f64::NAN),
            RawValue::Text(s) => s.trim().parse::<f64>().map_err(|_| {
                RetentionError::InvalidInput(format!(
                    "column '{}' is numeric, got {}",
                    column,
                    value.describe()
                ))
            }),
        }
    }

    /// Encode every row of a table into a matrix in schema order.
    pub fn encode_frame(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let n_rows = df.height();
        let available: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();

        let missing: Vec<&str> = self
            .schema
            .required_columns()
            .filter(|c| !available.iter().any(|a| a == c))
            .collect();

        if !missing.is_empty() {
            return Err(RetentionError::SchemaMismatch(format!(
                "missing required columns: {}",
                missing.join(", ")
            )));
        }

        let col_data: Vec<Vec<f64>> = self
            .schema
            .columns()
            .iter()
            .map(|column| {
                if self.schema.is_identifier(column) {
                    return Ok(vec![IDENTIFIER_PLACEHOLDER; n_rows]);
                }
                let series = df.column(column)?.as_materialized_series();
                self.encode_series(column, series)
            })
            .collect::<Result<_>>()?;

        let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
        Ok(Array2::from_shape_fn((n_rows, col_refs.len()), |(r, c)| col_refs[c][r]))
    }

    fn encode_series(&self, column: &str, series: &Series) -> Result<Vec<f64>> {
        if self.registry.contains(column) {
            let strings = as_string_series(series)?;
            return strings
                .str()?
                .into_iter()
                .map(|v| {
                    self.registry
                        .encode(column, v.unwrap_or(MISSING_CATEGORY))
                        .map(|code| code as f64)
                })
                .collect();
        }

        let numeric = series.strict_cast(&DataType::Float64).map_err(|_| {
            RetentionError::InvalidInput(format!("column '{}' must be numeric", column))
        })?;

        Ok(numeric
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect())
    }

    /// Category string behind `code` in `column`.
    pub fn decode(&self, column: &str, code: usize) -> Result<&'a str> {
        self.registry.decode(column, code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::LabelEncoder;

    fn fixture() -> (FeatureSchema, EncoderRegistry) {
        let schema = FeatureSchema::new(
            vec![
                "enrollee_id".to_string(),
                "city".to_string(),
                "city_development_index".to_string(),
                "gender".to_string(),
            ],
            Some("enrollee_id".to_string()),
        )
        .unwrap();

        let mut registry = EncoderRegistry::new();
        registry.insert("city", LabelEncoder::fit(vec![Some("city_103"), Some("city_21")]));
        registry.insert("gender", LabelEncoder::fit(vec![Some("Male"), Some("Female"), None]));
        (schema, registry)
    }

    #[test]
    fn test_encode_record_in_schema_order() {
        let (schema, registry) = fixture();
        let contract = EncodingContract::new(&schema, &registry);

        let record = RawRecord::new()
            .with("gender", "Male")
            .with("city_development_index", 0.92)
            .with("city", "city_21");

        let row = contract.encode_record(&record).unwrap();
        // gender classes: ["(missing)", "Female", "Male"]
        assert_eq!(row.to_vec(), vec![IDENTIFIER_PLACEHOLDER, 1.0, 0.92, 2.0]);
    }

    #[test]
    fn test_supplied_identifier_is_ignored() {
        let (schema, registry) = fixture();
        let contract = EncodingContract::new(&schema, &registry);

        let record = RawRecord::new()
            .with("enrollee_id", 12345i64)
            .with("gender", "Female")
            .with("city_development_index", 0.5)
            .with("city", "city_103");

        let row = contract.encode_record(&record).unwrap();
        assert_eq!(row[0], IDENTIFIER_PLACEHOLDER);
    }

    #[test]
    fn test_missing_column_is_schema_mismatch() {
        let (schema, registry) = fixture();
        let contract = EncodingContract::new(&schema, &registry);

        let record = RawRecord::new().with("gender", "Male").with("city", "city_21");
        let err = contract.encode_record(&record).unwrap_err();
        assert!(matches!(err, RetentionError::SchemaMismatch(ref m) if m.contains("city_development_index")));
    }

    #[test]
    fn test_type_errors_are_invalid_input() {
        let (schema, registry) = fixture();
        let contract = EncodingContract::new(&schema, &registry);

        let err = contract.encode_value("city", &RawValue::Number(3.0)).unwrap_err();
        assert!(matches!(err, RetentionError::InvalidInput(_)));

        let err = contract
            .encode_value("city_development_index", &RawValue::Text("high".into()))
            .unwrap_err();
        assert!(matches!(err, RetentionError::InvalidInput(_)));

        let parsed = contract
            .encode_value("city_development_index", &RawValue::Text(" 0.75 ".into()))
            .unwrap();
        assert_eq!(parsed, 0.75);
    }

    #[test]
    fn test_missing_values() {
        let (schema, registry) = fixture();
        let contract = EncodingContract::new(&schema, &registry);

        let code = contract.encode_value("gender", &RawValue::Missing).unwrap();
        assert_eq!(contract.decode("gender", code as usize).unwrap(), MISSING_CATEGORY);
        assert!(contract
            .encode_value("city_development_index", &RawValue::Missing)
            .unwrap()
            .is_nan());
    }

    #[test]
    fn test_encode_frame_matches_encode_record() {
        let (schema, registry) = fixture();
        let contract = EncodingContract::new(&schema, &registry);

        let df = df!(
            "gender" => &["Female", "Male"],
            "city" => &["city_103", "city_21"],
            "enrollee_id" => &[77i64, 88],
            "city_development_index" => &[0.4, 0.9]
        )
        .unwrap();

        let matrix = contract.encode_frame(&df).unwrap();
        assert_eq!(matrix.dim(), (2, 4));

        let record = RawRecord::new()
            .with("gender", "Male")
            .with("city", "city_21")
            .with("city_development_index", 0.9);
        let row = contract.encode_record(&record).unwrap();
        assert_eq!(matrix.row(1).to_vec(), row.to_vec());
    }

    #[test]
    fn test_encode_frame_rejects_unknown_category() {
        let (schema, registry) = fixture();
        let contract = EncodingContract::new(&schema, &registry);

        let df = df!(
            "gender" => &["Male"],
            "city" => &["city_999"],
            "city_development_index" => &[0.4]
        )
        .unwrap();

        let err = contract.encode_frame(&df).unwrap_err();
        assert!(matches!(err, RetentionError::UnknownCategory { ref column, .. } if column == "city"));
    }

    #[test]
    fn test_encode_frame_missing_column_is_schema_mismatch() {
        let (schema, registry) = fixture();
        let contract = EncodingContract::new(&schema, &registry);

        // identifier absent too, which is allowed
        let df = df!(
            "gender" => &["Male"],
            "city" => &["city_21"]
        )
        .unwrap();

        let err = contract.encode_frame(&df).unwrap_err();
        assert!(matches!(err, RetentionError::SchemaMismatch(ref m)
            if m.contains("city_development_index") && !m.contains("enrollee_id")));
    }

    #[test]
    fn test_raw_record_from_json() {
        let record: RawRecord =
            serde_json::from_str(r#"{"city": "city_21", "city_development_index": 0.92, "gender": null}"#).unwrap();
        assert_eq!(record.get("city"), Some(&RawValue::Text("city_21".into())));
        assert_eq!(record.get("city_development_index"), Some(&RawValue::Number(0.92)));
        assert_eq!(record.get("gender"), Some(&RawValue::Missing));
    }
}

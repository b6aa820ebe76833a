//! Label encoding for categorical columns
//!
//! Each categorical column gets a closed set of known categories. Codes are
//! assigned in lexicographic order of the category strings, so fitting the
//! same data on any platform yields the same table. The table itself is what
//! gets persisted: a `LabelEncoder` serializes as its explicit
//! `category -> code` map and is rebuilt (and checked) from it on load.

use crate::error::{Result, RetentionError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Category recorded for null cells in a categorical column. Reserved: it may
/// not appear as a literal value in training data.
pub const MISSING_CATEGORY: &str = "(missing)";

/// Closed category set for one column with stable integer codes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, usize>", into = "BTreeMap<String, usize>")]
pub struct LabelEncoder {
    codes: BTreeMap<String, usize>,
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit an encoder over the observed values; nulls become [`MISSING_CATEGORY`].
    pub fn fit<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let distinct: BTreeSet<String> = values
            .into_iter()
            .map(|v| v.unwrap_or(MISSING_CATEGORY).to_string())
            .collect();

        let classes: Vec<String> = distinct.into_iter().collect();
        let codes = classes
            .iter()
            .enumerate()
            .map(|(code, class)| (class.clone(), code))
            .collect();

        Self { codes, classes }
    }

    /// Fit from a string (or string-castable) series
    pub fn fit_series(series: &Series) -> Result<Self> {
        let strings = as_string_series(series)?;
        let ca = strings.str()?;
        if ca.into_iter().flatten().any(|v| v == MISSING_CATEGORY) {
            return Err(RetentionError::DataError(format!(
                "column '{}' contains the reserved value {:?}",
                series.name(),
                MISSING_CATEGORY
            )));
        }
        Ok(Self::fit(ca))
    }

    /// Integer code of a known category
    pub fn encode(&self, value: &str) -> Option<usize> {
        self.codes.get(value).copied()
    }

    /// Category string for a code
    pub fn decode(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }

    /// Known categories, ordered by code
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Explicit `category -> code` table
    pub fn table(&self) -> &BTreeMap<String, usize> {
        &self.codes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl TryFrom<BTreeMap<String, usize>> for LabelEncoder {
    type Error = String;

    fn try_from(codes: BTreeMap<String, usize>) -> std::result::Result<Self, Self::Error> {
        let mut slots: Vec<Option<String>> = vec![None; codes.len()];
        for (class, &code) in &codes {
            let slot = slots
                .get_mut(code)
                .ok_or_else(|| format!("code {} for category {:?} is out of range", code, class))?;
            if slot.is_some() {
                return Err(format!("code {} is assigned more than once", code));
            }
            *slot = Some(class.clone());
        }

        let classes = slots.into_iter().flatten().collect();
        Ok(Self { codes, classes })
    }
}

impl From<LabelEncoder> for BTreeMap<String, usize> {
    fn from(encoder: LabelEncoder) -> Self {
        encoder.codes
    }
}

/// Per-column encoders for every categorical feature
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncoderRegistry {
    encoders: BTreeMap<String, LabelEncoder>,
}

impl EncoderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit one encoder per string-typed column of `df`, skipping `exclude`.
    pub fn fit(df: &DataFrame, exclude: &[&str]) -> Result<Self> {
        let mut registry = Self::new();

        for column in df.get_columns() {
            let name = column.name().as_str();
            if exclude.contains(&name) || column.dtype() != &DataType::String {
                continue;
            }

            let encoder = LabelEncoder::fit_series(column.as_materialized_series())?;
            tracing::debug!(column = name, categories = encoder.len(), "Fitted label encoder");
            registry.insert(name, encoder);
        }

        Ok(registry)
    }

    pub fn insert(&mut self, column: impl Into<String>, encoder: LabelEncoder) {
        self.encoders.insert(column.into(), encoder);
    }

    pub fn get(&self, column: &str) -> Option<&LabelEncoder> {
        self.encoders.get(column)
    }

    /// Whether `column` is categorical
    pub fn contains(&self, column: &str) -> bool {
        self.encoders.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.encoders.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LabelEncoder)> {
        self.encoders.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.encoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoders.is_empty()
    }

    /// Code for `value` in `column`; unknown values are a hard error.
    pub fn encode(&self, column: &str, value: &str) -> Result<usize> {
        let encoder = self
            .get(column)
            .ok_or_else(|| RetentionError::FeatureNotFound(column.to_string()))?;

        encoder.encode(value).ok_or_else(|| RetentionError::UnknownCategory {
            column: column.to_string(),
            value: value.to_string(),
        })
    }

    /// Inverse of [`encode`](Self::encode)
    pub fn decode(&self, column: &str, code: usize) -> Result<&str> {
        self.get(column)
            .and_then(|encoder| encoder.decode(code))
            .ok_or_else(|| RetentionError::UnknownCategory {
                column: column.to_string(),
                value: code.to_string(),
            })
    }

    /// Plain `column -> (category -> code)` tables for export
    pub fn tables(&self) -> BTreeMap<&str, &BTreeMap<String, usize>> {
        self.encoders
            .iter()
            .map(|(column, encoder)| (column.as_str(), encoder.table()))
            .collect()
    }
}

/// Borrow the series when it is already string-typed, otherwise cast it.
pub(crate) fn as_string_series(series: &Series) -> Result<std::borrow::Cow<'_, Series>> {
    if series.dtype() == &DataType::String {
        Ok(std::borrow::Cow::Borrowed(series))
    } else {
        Ok(std::borrow::Cow::Owned(series.cast(&DataType::String)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_follow_lexicographic_order() {
        let encoder = LabelEncoder::fit(vec![Some("Male"), Some("Female"), Some("Other"), Some("Male")]);
        assert_eq!(encoder.classes(), &["Female", "Male", "Other"]);
        assert_eq!(encoder.encode("Female"), Some(0));
        assert_eq!(encoder.encode("Other"), Some(2));
        assert_eq!(encoder.encode("Unknown"), None);
    }

    #[test]
    fn test_nulls_become_missing_category() {
        let encoder = LabelEncoder::fit(vec![Some("a"), None, Some("b")]);
        assert_eq!(encoder.len(), 3);
        assert!(encoder.encode(MISSING_CATEGORY).is_some());
    }

    #[test]
    fn test_literal_missing_value_rejected_at_fit() {
        let df = df!(
            "company_type" => &[Some("Pvt Ltd"), None, Some(MISSING_CATEGORY)]
        )
        .unwrap();

        let err = EncoderRegistry::fit(&df, &[]).unwrap_err();
        assert!(matches!(err, RetentionError::DataError(ref m) if m.contains("company_type")));

        let nulls_only = df!("company_type" => &[Some("Pvt Ltd"), None]).unwrap();
        let registry = EncoderRegistry::fit(&nulls_only, &[]).unwrap();
        assert_eq!(registry.get("company_type").unwrap().classes(), &[MISSING_CATEGORY, "Pvt Ltd"]);
    }

    #[test]
    fn test_table_roundtrips_through_json() {
        let encoder = LabelEncoder::fit(vec![Some("x"), Some("y"), Some("z")]);
        let json = serde_json::to_string(&encoder).unwrap();
        assert_eq!(json, r#"{"x":0,"y":1,"z":2}"#);

        let restored: LabelEncoder = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, encoder);
        assert_eq!(restored.decode(1), Some("y"));
    }

    #[test]
    fn test_corrupt_table_rejected() {
        assert!(serde_json::from_str::<LabelEncoder>(r#"{"x":0,"y":0}"#).is_err());
        assert!(serde_json::from_str::<LabelEncoder>(r#"{"x":0,"y":5}"#).is_err());
    }

    #[test]
    fn test_registry_fits_string_columns_only() {
        let df = df!(
            "enrollee_id" => &[1i64, 2, 3],
            "city" => &["city_1", "city_2", "city_1"],
            "training_hours" => &[10.0, 20.0, 30.0]
        )
        .unwrap();

        let registry = EncoderRegistry::fit(&df, &[]).unwrap();
        assert_eq!(registry.columns().collect::<Vec<_>>(), vec!["city"]);
        assert_eq!(registry.encode("city", "city_2").unwrap(), 1);
        assert_eq!(registry.decode("city", 0).unwrap(), "city_1");
    }

    #[test]
    fn test_registry_unknown_value_is_error() {
        let mut registry = EncoderRegistry::new();
        registry.insert("gender", LabelEncoder::fit(vec![Some("Male")]));

        let err = registry.encode("gender", "Female").unwrap_err();
        assert!(matches!(err, RetentionError::UnknownCategory { .. }));
        assert!(registry.decode("gender", 7).is_err());
    }
}

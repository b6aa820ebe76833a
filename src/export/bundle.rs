//! Versioned artifact bundle
//!
//! A bundle pairs everything inference needs: the feature schema, the
//! encoder tables and the fitted classifier. It also stores a SHA-256 hash
//! over the schema and tables. Loading rejects unknown format versions and
//! bundles whose parts no longer agree with each other.

use crate::error::{Result, RetentionError};
use crate::preprocessing::{EncoderRegistry, EncodingContract, FeatureSchema};
use crate::training::{BoostedClassifier, BoosterConfig, ModelMetrics};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Current on-disk bundle format
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// Facts about the training run recorded alongside the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetadata {
    pub target_column: String,
    pub test_size: f64,
    pub random_state: u64,
    /// Rows in the training input
    pub n_rows: usize,
    pub n_train: usize,
    pub n_test: usize,
    /// Holdout metrics
    pub metrics: ModelMetrics,
    pub booster: BoosterConfig,
    /// Normalized split counts per schema column
    #[serde(default)]
    pub feature_importances: BTreeMap<String, f64>,
}

/// Schema, encoders and classifier persisted as one unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactBundle {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    pub schema: FeatureSchema,
    pub encoders: EncoderRegistry,
    pub classifier: BoostedClassifier,
    pub schema_hash: String,
    pub metadata: TrainingMetadata,
}

#[derive(Deserialize)]
struct BundleHeader {
    format_version: u32,
}

#[derive(Serialize)]
struct HashedParts<'a> {
    columns: &'a [String],
    identifier: Option<&'a str>,
    encoders: BTreeMap<&'a str, &'a BTreeMap<String, usize>>,
}

/// SHA-256 (hex) over the schema and the encoder tables
pub fn schema_hash(schema: &FeatureSchema, encoders: &EncoderRegistry) -> Result<String> {
    let parts = HashedParts {
        columns: schema.columns(),
        identifier: schema.identifier(),
        encoders: encoders.tables(),
    };
    let bytes = serde_json::to_vec(&parts)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

impl ArtifactBundle {
    /// Assemble a bundle and stamp it with the current format and hash
    pub fn new(
        schema: FeatureSchema,
        encoders: EncoderRegistry,
        classifier: BoostedClassifier,
        metadata: TrainingMetadata,
    ) -> Result<Self> {
        let schema_hash = schema_hash(&schema, &encoders)?;
        let bundle = Self {
            format_version: BUNDLE_FORMAT_VERSION,
            created_at: Utc::now(),
            schema,
            encoders,
            classifier,
            schema_hash,
            metadata,
        };
        bundle.validate()?;
        Ok(bundle)
    }

    /// Check that schema, encoders and classifier belong together
    pub fn validate(&self) -> Result<()> {
        if self.format_version != BUNDLE_FORMAT_VERSION {
            return Err(RetentionError::ArtifactVersionMismatch {
                expected: format!("format version {}", BUNDLE_FORMAT_VERSION),
                found: format!("format version {}", self.format_version),
            });
        }

        self.schema.validate()?;

        let recomputed = schema_hash(&self.schema, &self.encoders)?;
        if recomputed != self.schema_hash {
            return Err(RetentionError::ArtifactVersionMismatch {
                expected: format!("schema hash {}", self.schema_hash),
                found: format!("schema hash {}", recomputed),
            });
        }

        if self.classifier.n_features() != self.schema.len() {
            return Err(RetentionError::ArtifactVersionMismatch {
                expected: format!("classifier over {} schema columns", self.schema.len()),
                found: format!("classifier over {} features", self.classifier.n_features()),
            });
        }

        for column in self.encoders.columns() {
            if self.schema.position(column).is_none() || self.schema.is_identifier(column) {
                return Err(RetentionError::SchemaMismatch(format!(
                    "encoder for '{}' has no matching feature column",
                    column
                )));
            }
        }

        Ok(())
    }

    /// Encoding contract over this bundle's schema and encoders
    pub fn contract(&self) -> EncodingContract<'_> {
        EncodingContract::new(&self.schema, &self.encoders)
    }

    /// Write the bundle as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        tracing::info!(path = %path.display(), hash = %self.schema_hash, "Saved artifact bundle");
        Ok(())
    }

    /// Load and validate a bundle
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Parse and validate a bundle from its JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        // Check the version before the body so older layouts fail cleanly
        let header: BundleHeader = serde_json::from_str(json)?;
        if header.format_version != BUNDLE_FORMAT_VERSION {
            return Err(RetentionError::ArtifactVersionMismatch {
                expected: format!("format version {}", BUNDLE_FORMAT_VERSION),
                found: format!("format version {}", header.format_version),
            });
        }

        let bundle: Self = serde_json::from_str(json)?;
        bundle.validate()?;
        Ok(bundle)
    }

    /// Write the encoder tables alone as human-readable JSON
    pub fn export_encoders(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, &self.encoders.tables())?;
        writer.flush()?;
        tracing::debug!(path = %path.display(), columns = self.encoders.len(), "Exported encoder tables");
        Ok(())
    }
}

/// Read only the encoder tables from an `encoders.json` export
pub fn load_encoders(path: impl AsRef<Path>) -> Result<EncoderRegistry> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

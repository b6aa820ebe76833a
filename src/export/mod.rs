//! Model persistence
//!
//! The trained artifacts are written as one versioned JSON bundle, with an
//! optional standalone export of the encoder tables.

mod bundle;

pub use bundle::{
    load_encoders, schema_hash, ArtifactBundle, TrainingMetadata, BUNDLE_FORMAT_VERSION,
};

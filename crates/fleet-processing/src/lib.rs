//! Schema validation and batch preprocessing for vehicle sensor data.
//!
//! This crate is the data-quality half of the fleetml pipeline. It takes a
//! raw batch of CSV files, checks each one against a declared
//! [`SchemaDescriptor`], and transforms the accepted rows into a fully
//! numeric feature table through a fixed sequence of stages that is applied
//! identically at training and prediction time.
//!
//! # Overview
//!
//! - **Schema validation**: filename pattern, column layout, and per-column
//!   missing-value checks; bad files are routed aside, never aborting the
//!   batch.
//! - **Preprocessing**: sentinel replacement, missing-value diagnostics,
//!   mean imputation, zero-variance pruning, standardization, and PCA: all
//!   batch-local fits, with row alignment preserved through every stage.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use fleet_processing::{PreprocessConfig, Preprocessor, SchemaDescriptor, SchemaValidator};
//!
//! let descriptor = SchemaDescriptor::from_file("schema_training.json")?;
//! let validator = SchemaValidator::new(descriptor, vec!["na".into()]);
//! let (accepted, manifest) = validator.validate_batch(batch);
//!
//! let config = PreprocessConfig::builder().pca_components(50).build()?;
//! let outcome = Preprocessor::new(config).run(merged_table, Some("class"))?;
//! println!("features: {:?}", outcome.features.shape());
//! ```

pub mod config;
pub mod error;
pub mod labels;
pub mod preprocess;
pub mod schema;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use config::{ConfigValidationError, PreprocessConfig, PreprocessConfigBuilder};
pub use error::{ProcessingError, Result as ProcessingResult, ResultExt};
pub use labels::{LABEL_NEG, LABEL_POS, decode_label, encode_label, encode_label_series};
pub use preprocess::{PreprocessOutcome, Preprocessor, frame_to_array};
pub use schema::{RawBatch, RawFile, SchemaDescriptor, SchemaValidator};
pub use types::{
    FileVerdict, NullReport, PreprocessReport, RejectionReason, ValidationManifest,
};

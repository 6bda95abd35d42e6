//! Schema validation for raw sensor batches.
//!
//! A raw batch is an ordered collection of CSV files whose names carry an
//! embedded date/time stamp. Each file is checked against the declared
//! [`SchemaDescriptor`]; files that fail are routed to the invalid area and
//! the rest proceed downstream.

mod descriptor;
mod validator;

pub use descriptor::SchemaDescriptor;
pub use validator::SchemaValidator;

use polars::prelude::DataFrame;

/// A single raw file: its name plus the parsed table, or the reason the
/// loader could not parse it.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub name: String,
    pub frame: DataFrame,
    /// Set when the file could not be read as CSV. Such a file still enters
    /// the batch so the validator can reject it with the real cause.
    pub read_error: Option<String>,
}

impl RawFile {
    pub fn parsed(name: impl Into<String>, frame: DataFrame) -> Self {
        Self {
            name: name.into(),
            frame,
            read_error: None,
        }
    }

    pub fn unreadable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frame: DataFrame::empty(),
            read_error: Some(reason.into()),
        }
    }
}

/// An ordered collection of raw files making up one batch.
pub type RawBatch = Vec<RawFile>;

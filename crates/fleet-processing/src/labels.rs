//! Domain label encoding.
//!
//! The failure label is `"neg"` / `"pos"` in raw files and `0` / `1` inside
//! the models; the mapping is a bijection in both directions.

use crate::error::{ProcessingError, Result};
use polars::prelude::*;

pub const LABEL_NEG: &str = "neg";
pub const LABEL_POS: &str = "pos";

/// Encode one domain label. Quoted variants (`"'neg'"`) from the raw files
/// are accepted.
pub fn encode_label(value: &str) -> Option<u8> {
    match value.trim().trim_matches('\'') {
        LABEL_NEG => Some(0),
        LABEL_POS => Some(1),
        _ => None,
    }
}

/// Decode a numeric prediction back to its domain label.
pub fn decode_label(value: u8) -> &'static str {
    if value == 0 { LABEL_NEG } else { LABEL_POS }
}

/// Encode a label series to `0` / `1` values.
///
/// An unrecognized label is an error; it means the batch was mis-validated
/// upstream rather than a value worth guessing about.
pub fn encode_label_series(series: &Series) -> Result<Vec<u8>> {
    let ca = series.str()?;
    let mut encoded = Vec::with_capacity(series.len());

    for (idx, value) in ca.into_iter().enumerate() {
        let value = value.ok_or_else(|| ProcessingError::StageFailed {
            stage: "encode_labels",
            rows: series.len(),
            cols: 1,
            reason: format!("null label at row {idx}"),
        })?;
        let code = encode_label(value).ok_or_else(|| ProcessingError::StageFailed {
            stage: "encode_labels",
            rows: series.len(),
            cols: 1,
            reason: format!("unrecognized label '{value}' at row {idx}"),
        })?;
        encoded.push(code);
    }

    Ok(encoded)
}

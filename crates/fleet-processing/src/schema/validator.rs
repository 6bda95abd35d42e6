//! Per-file schema checks and batch routing.

use crate::schema::{RawBatch, RawFile, SchemaDescriptor};
use crate::types::{FileVerdict, RejectionReason, ValidationManifest};
use crate::utils::missing_count;
use tracing::{debug, info, warn};

/// Validates raw files against a [`SchemaDescriptor`] and sorts them into
/// valid and invalid sets.
///
/// Checks run in a fixed order per file: readability, filename, column
/// layout, then per-column missing values. A file failing any check is
/// rejected with the first reason found; a malformed file never aborts the
/// batch.
pub struct SchemaValidator {
    descriptor: SchemaDescriptor,
    /// Sentinel strings counted as missing when measuring column emptiness.
    invalid_markers: Vec<String>,
}

impl SchemaValidator {
    pub fn new(descriptor: SchemaDescriptor, invalid_markers: Vec<String>) -> Self {
        Self {
            descriptor,
            invalid_markers,
        }
    }

    pub fn descriptor(&self) -> &SchemaDescriptor {
        &self.descriptor
    }

    /// Validate one file and return its verdict.
    pub fn validate_file(&self, file: &RawFile) -> FileVerdict {
        if let Some(reason) = &file.read_error {
            debug!(file = %file.name, %reason, "file could not be parsed");
            return FileVerdict::Invalid(RejectionReason::Unreadable(reason.clone()));
        }

        if !self.descriptor.filename_matches(&file.name) {
            debug!(file = %file.name, "filename does not match schema pattern");
            return FileVerdict::Invalid(RejectionReason::BadFilename);
        }

        let actual_cols = file.frame.width();
        if actual_cols != self.descriptor.column_count {
            debug!(
                file = %file.name,
                expected = self.descriptor.column_count,
                actual = actual_cols,
                "column count mismatch"
            );
            return FileVerdict::Invalid(RejectionReason::BadColumns {
                expected: self.descriptor.column_count,
                actual: actual_cols,
            });
        }

        if !self.column_names_match(file) {
            debug!(file = %file.name, "column names do not match schema");
            return FileVerdict::Invalid(RejectionReason::BadColumns {
                expected: self.descriptor.column_count,
                actual: actual_cols,
            });
        }

        // Fully empty columns are a hard rejection; partially missing columns
        // are tagged but the file is accepted.
        let mut columns_with_missing = Vec::new();
        for column in file.frame.get_columns() {
            let series = column.as_materialized_series();
            let missing = missing_count(series, &self.invalid_markers);

            if missing == series.len() && !series.is_empty() {
                debug!(file = %file.name, column = %series.name(), "column fully empty");
                return FileVerdict::Invalid(RejectionReason::FullyEmptyColumn(
                    series.name().to_string(),
                ));
            }

            if missing > 0 {
                columns_with_missing.push(series.name().to_string());
            }
        }

        FileVerdict::Valid {
            columns_with_missing,
        }
    }

    /// Validate every file in the batch, producing the observability
    /// manifest plus the accepted files in batch order.
    pub fn validate_batch(&self, batch: RawBatch) -> (Vec<RawFile>, ValidationManifest) {
        let mut manifest = ValidationManifest::default();
        let mut accepted = Vec::new();

        for file in batch {
            match self.validate_file(&file) {
                FileVerdict::Valid {
                    columns_with_missing,
                } => {
                    if !columns_with_missing.is_empty() {
                        debug!(
                            file = %file.name,
                            columns = ?columns_with_missing,
                            "accepted with missing values"
                        );
                    }
                    manifest.valid_files.push(file.name.clone());
                    accepted.push(file);
                }
                FileVerdict::Invalid(reason) => {
                    warn!(file = %file.name, %reason, "file rejected");
                    manifest
                        .invalid_files
                        .push((file.name.clone(), reason.to_string()));
                }
            }
        }

        info!(
            valid = manifest.valid_count(),
            invalid = manifest.invalid_count(),
            "raw batch validation complete"
        );

        (accepted, manifest)
    }

    fn column_names_match(&self, file: &RawFile) -> bool {
        let mut expected: Vec<&str> = self
            .descriptor
            .column_names
            .iter()
            .map(String::as_str)
            .collect();
        let mut actual: Vec<String> = file
            .frame
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        expected.sort_unstable();
        actual.sort_unstable();

        expected.len() == actual.len() && expected.iter().zip(&actual).all(|(e, a)| *e == a)
    }
}

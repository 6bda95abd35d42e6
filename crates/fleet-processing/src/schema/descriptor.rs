//! The declared schema for incoming raw files.

use crate::error::{ProcessingError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Declared schema for a raw batch: the filename convention and the exact
/// column set every accepted file must carry.
///
/// Loaded from a JSON schema file, e.g.:
///
/// ```json
/// {
///   "sample_file_prefix": "aps_failure",
///   "date_stamp_length": 8,
///   "time_stamp_length": 6,
///   "column_count": 171,
///   "column_names": ["class", "aa_000", "..."]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    /// Fixed prefix of every raw file name.
    pub sample_file_prefix: String,
    /// Number of digits in the embedded date stamp.
    pub date_stamp_length: usize,
    /// Number of digits in the embedded time stamp.
    pub time_stamp_length: usize,
    /// Expected number of columns.
    pub column_count: usize,
    /// Expected column names; order follows the file layout, names are unique.
    pub column_names: Vec<String>,
}

impl SchemaDescriptor {
    /// Load the descriptor from a JSON file.
    ///
    /// An unreadable or malformed schema is the one fatal validation error;
    /// per-file findings never abort a batch.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| ProcessingError::SchemaUnreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let descriptor: SchemaDescriptor =
            serde_json::from_str(&contents).map_err(|e| ProcessingError::SchemaUnreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        descriptor.check_consistency(&path.display().to_string())?;
        Ok(descriptor)
    }

    /// Build the filename pattern:
    /// `^<prefix>_(\d{date_stamp_length})_(\d{time_stamp_length})\.csv$`.
    pub fn filename_regex(&self) -> Regex {
        let pattern = format!(
            r"^{}_(\d{{{}}})_(\d{{{}}})\.csv$",
            regex::escape(&self.sample_file_prefix),
            self.date_stamp_length,
            self.time_stamp_length,
        );
        // Escaped text plus fixed repetition counts always compiles.
        Regex::new(&pattern).expect("Invalid regex: filename pattern")
    }

    /// True when `name` matches the declared filename convention, including
    /// the stamp lengths.
    pub fn filename_matches(&self, name: &str) -> bool {
        self.filename_regex().is_match(name)
    }

    fn check_consistency(&self, path: &str) -> Result<()> {
        if self.column_names.len() != self.column_count {
            return Err(ProcessingError::SchemaUnreadable {
                path: path.to_string(),
                reason: format!(
                    "column_count is {} but {} column names are declared",
                    self.column_count,
                    self.column_names.len()
                ),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for name in &self.column_names {
            if !seen.insert(name) {
                return Err(ProcessingError::SchemaUnreadable {
                    path: path.to_string(),
                    reason: format!("duplicate column name '{name}'"),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> SchemaDescriptor {
        SchemaDescriptor {
            sample_file_prefix: "aps_failure".to_string(),
            date_stamp_length: 8,
            time_stamp_length: 6,
            column_count: 3,
            column_names: vec!["class".into(), "aa_000".into(), "ab_000".into()],
        }
    }

    #[test]
    fn test_filename_matches_valid_name() {
        let d = descriptor();
        assert!(d.filename_matches("aps_failure_20240101_120000.csv"));
    }

    #[test]
    fn test_filename_rejects_wrong_stamp_lengths() {
        let d = descriptor();
        assert!(!d.filename_matches("aps_failure_2024_120000.csv"));
        assert!(!d.filename_matches("aps_failure_20240101_12.csv"));
    }

    #[test]
    fn test_filename_rejects_wrong_prefix_and_extension() {
        let d = descriptor();
        assert!(!d.filename_matches("sensor_20240101_120000.csv"));
        assert!(!d.filename_matches("aps_failure_20240101_120000.txt"));
    }

    #[test]
    fn test_from_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");
        std::fs::write(&path, serde_json::to_string(&descriptor()).unwrap()).unwrap();

        let loaded = SchemaDescriptor::from_file(&path).unwrap();
        assert_eq!(loaded.column_count, 3);
        assert_eq!(loaded.column_names[0], "class");
    }

    #[test]
    fn test_from_file_missing_is_fatal() {
        let result = SchemaDescriptor::from_file("/nonexistent/schema.json");
        assert!(matches!(
            result.unwrap_err(),
            ProcessingError::SchemaUnreadable { .. }
        ));
    }

    #[test]
    fn test_from_file_rejects_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");
        let mut d = descriptor();
        d.column_count = 5;
        std::fs::write(&path, serde_json::to_string(&d).unwrap()).unwrap();

        assert!(matches!(
            SchemaDescriptor::from_file(&path).unwrap_err(),
            ProcessingError::SchemaUnreadable { .. }
        ));
    }
}

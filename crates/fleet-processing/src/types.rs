//! Common types shared across validation and preprocessing.

use serde::{Deserialize, Serialize};

/// Why a raw file was rejected during schema validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionReason {
    /// Filename did not match the declared pattern or stamp lengths.
    BadFilename,
    /// Column count differed from the declared count, or column names did
    /// not match the declared set exactly.
    BadColumns { expected: usize, actual: usize },
    /// A column was 100% missing.
    FullyEmptyColumn(String),
    /// The file could not be read as CSV at all.
    Unreadable(String),
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadFilename => write!(f, "filename does not match the expected pattern"),
            Self::BadColumns { expected, actual } => {
                write!(f, "expected {expected} columns, found {actual}")
            }
            Self::FullyEmptyColumn(col) => write!(f, "column '{col}' is fully empty"),
            Self::Unreadable(reason) => write!(f, "unreadable: {reason}"),
        }
    }
}

/// Verdict for a single raw file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FileVerdict {
    /// File passed all checks and proceeds downstream.
    Valid {
        /// Columns that contain some (but not all) missing values.
        columns_with_missing: Vec<String>,
    },
    /// File failed a check and is routed to the invalid area.
    Invalid(RejectionReason),
}

impl FileVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}

/// Summary of a validation pass over a raw batch, emitted for observability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationManifest {
    /// Names of files that passed validation, in batch order.
    pub valid_files: Vec<String>,
    /// Names and reasons for files that were rejected.
    pub invalid_files: Vec<(String, String)>,
}

impl ValidationManifest {
    pub fn valid_count(&self) -> usize {
        self.valid_files.len()
    }

    pub fn invalid_count(&self) -> usize {
        self.invalid_files.len()
    }
}

/// Per-column missing-value counts, emitted as a side artifact when any
/// column of the batch contains nulls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NullReport {
    /// (column name, missing count) for every affected column.
    pub columns: Vec<(String, usize)>,
}

impl NullReport {
    /// True when at least one column has missing values.
    pub fn any_missing(&self) -> bool {
        !self.columns.is_empty()
    }
}

/// Record of what each preprocessing stage did to the table, carried through
/// the run for logging and test assertions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreprocessReport {
    /// Missing-value diagnostic computed by `detect_missing`.
    pub null_report: NullReport,
    /// Columns dropped because their missing fraction exceeded the threshold.
    pub dropped_missing_columns: Vec<String>,
    /// Columns dropped because their standard deviation was zero.
    pub dropped_zero_variance_columns: Vec<String>,
    /// Human-readable step descriptions, in execution order.
    pub steps: Vec<String>,
}

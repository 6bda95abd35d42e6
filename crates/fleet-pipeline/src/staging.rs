//! Batch loading and staging areas.
//!
//! A run reads every CSV in the input directory into a [`RawBatch`], routes
//! each file to the valid or invalid staging area after validation, and
//! merges the accepted files into one master table exported per run.

use crate::error::{PipelineError, Result};
use chrono::Utc;
use fleet_processing::{RawBatch, RawFile, ValidationManifest};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Read every `.csv` file in `dir` into a raw batch, in filename order.
///
/// Every column is read as a string so sentinel markers anywhere in the
/// file survive loading; the preprocessor coerces to numeric later. A file
/// that cannot be parsed at all is still carried into the batch, tagged
/// with its read error, so the validator can reject it with the real cause
/// instead of the loader aborting the run.
pub fn load_raw_batch(dir: &Path) -> Result<RawBatch> {
    let mut names: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| PipelineError::storage("list", dir.display().to_string(), e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    names.sort();

    let mut batch = Vec::with_capacity(names.len());
    for path in names {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let file = match read_csv(&path) {
            Ok(frame) => RawFile::parsed(name, frame),
            Err(e) => {
                warn!(file = %name, error = %e, "file unreadable, carrying error to validation");
                RawFile::unreadable(name, e.to_string())
            }
        };
        batch.push(file);
    }

    info!(files = batch.len(), dir = %dir.display(), "raw batch loaded");
    Ok(batch)
}

/// Report every rejected file through the run-level error taxonomy. The
/// violations are per-file and non-fatal; the batch continues without them.
pub(crate) fn report_rejections(manifest: &ValidationManifest) {
    for (file, reason) in &manifest.invalid_files {
        let violation = PipelineError::SchemaViolation {
            file: file.clone(),
            reason: reason.clone(),
        };
        warn!(code = violation.error_code(), "{violation}");
    }
}

fn read_csv(path: &Path) -> PolarsResult<DataFrame> {
    // Schema inference length 0 reads every column as a string. Inferring
    // over a prefix misparses files whose sentinel values first appear past
    // the inference window.
    CsvReadOptions::default()
        .with_infer_schema_length(Some(0))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
}

/// Valid/invalid staging areas for one run.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn valid_dir(&self) -> PathBuf {
        self.root.join("valid")
    }

    fn invalid_dir(&self) -> PathBuf {
        self.root.join("invalid")
    }

    /// Copy accepted files into the valid area and record rejected names
    /// with their reasons in the invalid area.
    pub fn stage(&self, accepted: &[RawFile], manifest: &ValidationManifest) -> Result<()> {
        fs::create_dir_all(self.valid_dir())
            .map_err(|e| PipelineError::storage("save", "staging/valid", e))?;
        fs::create_dir_all(self.invalid_dir())
            .map_err(|e| PipelineError::storage("save", "staging/invalid", e))?;

        for file in accepted {
            let path = self.valid_dir().join(&file.name);
            write_csv_file(&path, &mut file.frame.clone())
                .map_err(|e| PipelineError::storage("save", file.name.clone(), e))?;
        }

        for (name, reason) in &manifest.invalid_files {
            let marker = self.invalid_dir().join(format!("{name}.rejected"));
            fs::write(&marker, reason)
                .map_err(|e| PipelineError::storage("save", name.clone(), e))?;
        }

        info!(
            valid = accepted.len(),
            invalid = manifest.invalid_files.len(),
            "batch staged"
        );
        Ok(())
    }

    /// Merge the accepted files into one master table, aligned to the first
    /// file's column order, and export it as this run's master CSV.
    pub fn merge_master(&self, accepted: &[RawFile]) -> Result<DataFrame> {
        let Some(first) = accepted.first() else {
            return Err(PipelineError::preprocessing(
                "merge_master",
                "no valid files to merge",
            ));
        };

        let column_order: Vec<PlSmallStr> = first
            .frame
            .get_column_names()
            .into_iter()
            .cloned()
            .collect();

        let mut master = first.frame.clone();
        for file in &accepted[1..] {
            // Validation guarantees the same column set; order may differ.
            let aligned = file
                .frame
                .select(column_order.iter().cloned())
                .map_err(|e| PipelineError::preprocessing("merge_master", e))?;
            master = master
                .vstack(&aligned)
                .map_err(|e| PipelineError::preprocessing("merge_master", e))?;
        }

        let export = self
            .root
            .join(format!("master_{}.csv", Utc::now().format("%Y%m%d_%H%M%S")));
        write_csv_file(&export, &mut master.clone())
            .map_err(|e| PipelineError::storage("save", export.display().to_string(), e))?;
        info!(
            rows = master.height(),
            cols = master.width(),
            export = %export.display(),
            "master table merged"
        );

        Ok(master)
    }
}

fn write_csv_file(path: &Path, df: &mut DataFrame) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .finish(df)?;
    Ok(())
}

/// Serialize a table to CSV bytes for artifact storage.
pub fn frame_to_csv_bytes(df: &mut DataFrame) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    CsvWriter::new(&mut buf)
        .include_header(true)
        .with_separator(b',')
        .finish(df)
        .map_err(|e| PipelineError::preprocessing("csv_export", e))?;
    Ok(buf)
}

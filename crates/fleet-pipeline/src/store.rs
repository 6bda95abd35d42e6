//! Artifact storage at the collaborator boundary.
//!
//! The trait is the seam where a real object store would plug in; the
//! filesystem implementation roots every key under a bucket directory.
//! Keys are `/`-separated relative paths like `models/cluster-0-adaboost.json`.

use crate::error::{PipelineError, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Tri-state existence probe. Absence is a normal answer; only real I/O
/// trouble becomes an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Found,
    NotFound,
}

/// Append/overwrite-by-key artifact storage.
pub trait ArtifactStore {
    /// Keys under the given prefix, sorted.
    fn list(&self, prefix: &str) -> Result<Vec<String>>;

    fn load(&self, key: &str) -> Result<Vec<u8>>;

    fn save(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Idempotent delete: removing an absent key succeeds.
    fn delete(&self, key: &str) -> Result<()>;

    /// Existence check without exception-as-control-flow: `Found`,
    /// `NotFound`, or an escalated I/O error.
    fn probe(&self, key: &str) -> Result<Probe>;
}

/// Filesystem store rooted at a bucket directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn collect_keys(&self, dir: &Path, out: &mut Vec<String>) -> io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                self.collect_keys(&path, out)?;
            } else if let Ok(rel) = path.strip_prefix(&self.root) {
                out.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
        Ok(())
    }
}

impl ArtifactStore for LocalStore {
    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        self.collect_keys(&self.root.clone(), &mut keys)
            .map_err(|e| PipelineError::storage("list", prefix, e))?;
        keys.retain(|k| k.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }

    fn load(&self, key: &str) -> Result<Vec<u8>> {
        fs::read(self.path_for(key)).map_err(|e| PipelineError::storage("load", key, e))
    }

    fn save(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| PipelineError::storage("save", key, e))?;
        }
        fs::write(&path, bytes).map_err(|e| PipelineError::storage("save", key, e))?;
        debug!(key, bytes = bytes.len(), "artifact saved");
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => {
                debug!(key, "artifact deleted");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PipelineError::storage("delete", key, e)),
        }
    }

    fn probe(&self, key: &str) -> Result<Probe> {
        match fs::metadata(self.path_for(key)) {
            Ok(_) => Ok(Probe::Found),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Probe::NotFound),
            Err(e) => Err(PipelineError::storage("probe", key, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, LocalStore) {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_save_load_round_trip() {
        let (_dir, store) = store();
        store.save("models/cluster-0-adaboost.json", b"payload").unwrap();
        assert_eq!(store.load("models/cluster-0-adaboost.json").unwrap(), b"payload");
    }

    #[test]
    fn test_probe_tri_state() {
        let (_dir, store) = store();
        assert_eq!(store.probe("missing.json").unwrap(), Probe::NotFound);
        store.save("present.json", b"x").unwrap();
        assert_eq!(store.probe("present.json").unwrap(), Probe::Found);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (_dir, store) = store();
        store.save("a.json", b"x").unwrap();
        store.delete("a.json").unwrap();
        // Second delete of an absent key still succeeds.
        store.delete("a.json").unwrap();
        assert_eq!(store.probe("a.json").unwrap(), Probe::NotFound);
    }

    #[test]
    fn test_list_filters_by_prefix_and_sorts() {
        let (_dir, store) = store();
        store.save("models/cluster-1-adaboost.json", b"x").unwrap();
        store.save("models/cluster-0-random-forest.json", b"x").unwrap();
        store.save("artifacts/partitioner.json", b"x").unwrap();

        let keys = store.list("models/").unwrap();
        assert_eq!(
            keys,
            vec![
                "models/cluster-0-random-forest.json".to_string(),
                "models/cluster-1-adaboost.json".to_string(),
            ]
        );
    }

    #[test]
    fn test_list_on_empty_root() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path().join("never-created"));
        assert!(store.list("models/").unwrap().is_empty());
    }

    #[test]
    fn test_load_missing_is_storage_failure() {
        let (_dir, store) = store();
        let err = store.load("nope.json").unwrap_err();
        assert_eq!(err.error_code(), "STORAGE_FAILURE");
    }
}

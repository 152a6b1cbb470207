//! File-backed checkpoint store with atomic replace-on-write.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use super::CheckpointStore;
use crate::error::AuthError;

/// Durable checkpoint store persisting a JSON snapshot on disk.
///
/// Every mutation rewrites the snapshot with the write-to-temp-then-rename
/// pattern, so the file on disk is always either the complete old state or
/// the complete new state, never a partial write.
pub struct FileCheckpointStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileCheckpointStore {
    /// Opens the store at `path`, loading any existing snapshot.
    ///
    /// A missing file starts an empty store; the file is created on the
    /// first write.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Checkpoint`] if an existing snapshot cannot be
    /// read or parsed.
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self, AuthError> {
        let path = path.into();
        let entries = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                AuthError::checkpoint(format!("corrupt snapshot {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(AuthError::checkpoint(format!(
                    "read {}: {e}",
                    path.display()
                )))
            }
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<(), AuthError> {
        let bytes = serde_json::to_vec_pretty(entries)
            .map_err(|e| AuthError::checkpoint(format!("serialize snapshot: {e}")))?;
        let tmp = self.path.with_extension("tmp");
        let io_err =
            |op: &str, e: std::io::Error| AuthError::checkpoint(format!("{op} {}: {e}", tmp.display()));
        let mut file = fs::File::create(&tmp).map_err(|e| io_err("create", e))?;
        file.write_all(&bytes).map_err(|e| io_err("write", e))?;
        file.sync_all().map_err(|e| io_err("sync", e))?;
        drop(file);
        fs::rename(&tmp, &self.path).map_err(|e| {
            AuthError::checkpoint(format!("rename into {}: {e}", self.path.display()))
        })
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AuthError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), AuthError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

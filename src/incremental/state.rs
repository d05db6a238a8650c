//! Persisted incremental state
//!
//! One record per module: the fingerprint of the last successful generation and
//! where its output was promoted to.

use crate::error::StorageError;
use crate::incremental::fingerprint::Fingerprint;
use crate::types::ModuleId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const STATE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncrementalState {
    pub version: u32,
    pub fingerprint: Fingerprint,
    pub output_dir: PathBuf,
    pub recorded_at: DateTime<Utc>,
}

impl IncrementalState {
    pub fn new(fingerprint: Fingerprint, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            version: STATE_FORMAT_VERSION,
            fingerprint,
            output_dir: output_dir.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// Store interface for incremental state
pub trait IncrementalStateStore: Send + Sync {
    fn get(&self, module: &ModuleId) -> Result<Option<IncrementalState>, StorageError>;

    /// Replaces any previous record for the module.
    fn put(&self, module: &ModuleId, state: &IncrementalState) -> Result<(), StorageError>;

    fn remove(&self, module: &ModuleId) -> Result<(), StorageError>;
}

/// Sled-backed state store, one key per module id.
pub struct SledStateStore {
    db: sled::Db,
}

impl SledStateStore {
    /// Open or create the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path.as_ref()).map_err(|e| {
            StorageError::Database(format!(
                "Failed to open state database at {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Ok(Self { db })
    }

    /// Temporary database removed when dropped; for tests and dry runs.
    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }
}

impl IncrementalStateStore for SledStateStore {
    fn get(&self, module: &ModuleId) -> Result<Option<IncrementalState>, StorageError> {
        match self.db.get(module.as_str().as_bytes())? {
            Some(value) => {
                let state: IncrementalState = bincode::deserialize(&value).map_err(|e| {
                    StorageError::Serialization {
                        what: format!("incremental state for {}", module),
                        message: e.to_string(),
                    }
                })?;
                if state.version > STATE_FORMAT_VERSION {
                    return Err(StorageError::UnsupportedVersion {
                        what: "incremental state",
                        found: state.version,
                        expected: STATE_FORMAT_VERSION,
                    });
                }
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    fn put(&self, module: &ModuleId, state: &IncrementalState) -> Result<(), StorageError> {
        let value = bincode::serialize(state).map_err(|e| StorageError::Serialization {
            what: format!("incremental state for {}", module),
            message: e.to_string(),
        })?;
        self.db.insert(module.as_str().as_bytes(), value)?;
        self.db.flush()?;
        Ok(())
    }

    fn remove(&self, module: &ModuleId) -> Result<(), StorageError> {
        self.db.remove(module.as_str().as_bytes())?;
        self.db.flush()?;
        Ok(())
    }
}

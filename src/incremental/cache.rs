//! Content-addressed build cache
//!
//! Generated output trees keyed by fingerprint, stored at
//! `{root}/{hex[0..2]}/{hex}`. Identical fingerprints imply identical output, so an
//! existing entry is never rewritten.

use crate::error::StorageError;
use crate::incremental::fingerprint::Fingerprint;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use walkdir::WalkDir;

static STAGING_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct BuildCache {
    root: PathBuf,
}

impl BuildCache {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| io_context(e, "create cache root", &root))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.entry_path(fingerprint).is_dir()
    }

    /// Copy `output` into the cache under `fingerprint`.
    ///
    /// The copy is written to a unique staging directory first and renamed into
    /// place. Losing a race to a concurrent writer is not an error.
    pub fn store(&self, fingerprint: &Fingerprint, output: &Path) -> Result<(), StorageError> {
        if self.contains(fingerprint) {
            return Ok(());
        }

        let entry = self.entry_path(fingerprint);
        let parent = entry.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent).map_err(|e| io_context(e, "create cache shard", parent))?;

        let staging = parent.join(format!(
            ".{}.{}.{}.tmp",
            fingerprint.to_hex(),
            std::process::id(),
            STAGING_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        if let Err(err) = copy_tree(output, &staging) {
            let _ = fs::remove_dir_all(&staging);
            return Err(err);
        }

        if let Err(err) = fs::rename(&staging, &entry) {
            let _ = fs::remove_dir_all(&staging);
            if self.contains(fingerprint) {
                return Ok(());
            }
            return Err(io_context(err, "publish cache entry", &entry));
        }

        debug!(fingerprint = %fingerprint, "Stored output in build cache");
        Ok(())
    }

    /// Copy the cached tree for `fingerprint` into `dest`. Returns false on a miss.
    pub fn restore(&self, fingerprint: &Fingerprint, dest: &Path) -> Result<bool, StorageError> {
        if !self.contains(fingerprint) {
            return Ok(false);
        }
        copy_tree(&self.entry_path(fingerprint), dest)?;
        debug!(
            fingerprint = %fingerprint,
            dest = %dest.display(),
            "Restored output from build cache"
        );
        Ok(true)
    }

    /// `{root}/{hex[0..2]}/{hex}`
    fn entry_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        let hex = fingerprint.to_hex();
        self.root.join(&hex[0..2]).join(hex)
    }
}

/// Recursively copy `from` into `to`, creating `to` and any missing parents.
pub fn copy_tree(from: &Path, to: &Path) -> Result<(), StorageError> {
    fs::create_dir_all(to).map_err(|e| io_context(e, "create directory", to))?;
    for entry in WalkDir::new(from).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to walk {}: {}", from.display(), e),
            ))
        })?;
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| io_context(e, "create directory", &target))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| io_context(e, "copy file to", &target))?;
        }
    }
    Ok(())
}

fn io_context(err: std::io::Error, action: &str, path: &Path) -> StorageError {
    StorageError::IoError(std::io::Error::new(
        err.kind(),
        format!("Failed to {} {}: {}", action, path.display(), err),
    ))
}

//! Filesystem walker for fingerprint inputs

use crate::error::StorageError;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Filesystem entry types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A file entry with its path and size
    File { path: PathBuf, size: u64 },
    /// A directory entry with its path
    Directory { path: PathBuf },
}

impl Entry {
    pub fn path(&self) -> &Path {
        match self {
            Entry::File { path, .. } | Entry::Directory { path } => path,
        }
    }
}

/// Filesystem walker configuration
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Whether to follow symbolic links (default: false for determinism)
    pub follow_symlinks: bool,
    /// Path components to skip entirely (VCS metadata by default)
    pub ignore_components: Vec<String>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            ignore_components: vec![".git".to_string(), ".hg".to_string(), ".svn".to_string()],
        }
    }
}

/// Collects every entry under a root. A root that is a plain file (a classpath
/// jar, an includes file) yields just that file.
pub struct Walker {
    root: PathBuf,
    config: WalkerConfig,
}

impl Walker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            config: WalkerConfig::default(),
        }
    }

    pub fn with_config(root: impl Into<PathBuf>, config: WalkerConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// Walk the root and return entries sorted by path.
    pub fn walk(&self) -> Result<Vec<Entry>, StorageError> {
        let mut entries = Vec::new();

        let walker = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name();

        for entry in walker.into_iter().filter_entry(|e| !self.should_ignore(e)) {
            let entry = entry.map_err(|e| {
                StorageError::IoError(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Failed to walk {:?}: {}", self.root, e),
                ))
            })?;

            let path = entry.path().to_path_buf();
            let file_type = entry.file_type();

            if file_type.is_file() {
                let size = entry.metadata().map(|m| m.len()).map_err(|e| {
                    StorageError::IoError(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        format!("Failed to read metadata for {:?}: {}", path, e),
                    ))
                })?;
                entries.push(Entry::File { path, size });
            } else if file_type.is_dir() && path != self.root {
                entries.push(Entry::Directory { path });
            }
            // Unfollowed symlinks are skipped
        }

        entries.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(entries)
    }

    fn should_ignore(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        self.config
            .ignore_components
            .iter()
            .any(|pattern| name == pattern.as_str())
    }
}

//! Fingerprints of generation inputs using BLAKE3
//!
//! Fingerprint = hash("docweave-fingerprint" || len || canonical configuration ||
//! for each input root in sorted order: root || entries)
//!
//! Entries are the files and directories under the root, sorted by path, each
//! hashed as its root-relative path plus (for files) the content hash. A root that
//! does not exist contributes a `missing` marker, so creating it later changes the
//! fingerprint.

use crate::aggregate::GlobalConfiguration;
use crate::error::StorageError;
use crate::incremental::walker::{Entry, Walker};
use crate::types::Hash;
use blake3::Hasher;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Digest of everything that affects generated output. Serialized as hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(Hash);

impl Fingerprint {
    pub fn from_bytes(bytes: Hash) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(value: &str) -> Option<Self> {
        let bytes = hex::decode(value).ok()?;
        let hash: Hash = bytes.try_into().ok()?;
        Some(Self(hash))
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Fingerprint::from_hex(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid fingerprint '{}'", value)))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..16])
    }
}

/// Compute content hash for file bytes
pub fn compute_content_hash(content: &[u8]) -> Hash {
    let mut hasher = Hasher::new();
    hasher.update(content);
    *hasher.finalize().as_bytes()
}

/// Every filesystem path whose contents feed generation, sorted and deduplicated.
pub fn input_paths(configuration: &GlobalConfiguration) -> BTreeSet<PathBuf> {
    let mut paths = BTreeSet::new();
    for spec in configuration.source_sets.values() {
        paths.extend(spec.source_roots.iter().cloned());
        paths.extend(spec.samples.iter().cloned());
        paths.extend(spec.includes.iter().cloned());
        paths.extend(spec.suppressed_files.iter().cloned());
        paths.extend(spec.classpath.iter().map(|entry| entry.path.clone()));
    }
    paths.extend(configuration.plugins_classpath.iter().map(|entry| entry.path.clone()));
    paths
}

/// Fingerprint a configuration and the current contents of all its inputs.
pub fn fingerprint_configuration(
    configuration: &GlobalConfiguration,
) -> Result<Fingerprint, StorageError> {
    let canonical = configuration.to_json()?;

    let mut hasher = Hasher::new();
    hasher.update(b"docweave-fingerprint");
    hasher.update(&(canonical.len() as u64).to_be_bytes());
    hasher.update(&canonical);

    for root in input_paths(configuration) {
        hash_root(&mut hasher, &root)?;
    }

    Ok(Fingerprint(*hasher.finalize().as_bytes()))
}

fn hash_root(hasher: &mut Hasher, root: &Path) -> Result<(), StorageError> {
    update_with_path(hasher, b"root", root);

    if !root.exists() {
        hasher.update(b"missing");
        return Ok(());
    }

    for entry in Walker::new(root).walk()? {
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        match &entry {
            Entry::File { path, .. } => {
                update_with_path(hasher, b"file", relative);
                let content = fs::read(path).map_err(|e| {
                    StorageError::IoError(std::io::Error::new(
                        e.kind(),
                        format!("Failed to read {:?}: {}", path, e),
                    ))
                })?;
                hasher.update(&compute_content_hash(&content));
            }
            Entry::Directory { .. } => update_with_path(hasher, b"dir", relative),
        }
    }
    Ok(())
}

/// tag || path_len (8 bytes, big-endian) || path
fn update_with_path(hasher: &mut Hasher, tag: &[u8], path: &Path) {
    let path_string = path.to_string_lossy();
    let path_bytes = path_string.as_bytes();
    hasher.update(tag);
    hasher.update(&(path_bytes.len() as u64).to_be_bytes());
    hasher.update(path_bytes);
}

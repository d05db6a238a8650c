//! Shared identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 32-byte BLAKE3 digest
pub type Hash = [u8; 32];

/// Identity of a module (a buildable unit owning source sets), e.g. `:core`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(String);

impl ModuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem-safe form of the id, used for per-module directories and files.
    ///
    /// Ids made of `:`-separated alphanumeric segments map to the segments joined
    /// by `_` (`:parent:child-a` becomes `parent_child-a`). Any other id gets a
    /// readable prefix plus `.` and a digest of the raw id, so distinct ids never
    /// share a stem.
    pub fn file_stem(&self) -> String {
        let trimmed = self.0.strip_prefix(':').unwrap_or(&self.0);
        let readable: String = trimmed
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        let plain = self.0.starts_with(':')
            && !trimmed.is_empty()
            && trimmed.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == ':');
        if plain {
            return readable;
        }
        let digest = blake3::hash(self.0.as_bytes());
        let prefix = if readable.is_empty() { "root" } else { readable.as_str() };
        format!("{}.{}", prefix, &digest.to_hex().as_str()[..16])
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ModuleId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

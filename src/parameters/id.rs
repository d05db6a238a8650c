//! Source set identity

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable cross-module reference to one documentable source set.
///
/// `scope` names the owning module or configuration bucket, `name` the source set
/// within it. Ordering is `(scope, name)`, which fixes the order of source sets in
/// every serialized configuration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceSetId {
    pub scope: String,
    pub name: String,
}

impl SourceSetId {
    pub fn new(scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for SourceSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scope, self.name)
    }
}

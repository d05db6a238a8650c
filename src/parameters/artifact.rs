//! Module artifact: the serialized [`ModuleParameters`] one module publishes for
//! others to consume.
//!
//! The document is versioned JSON. Unknown fields are ignored so producers and
//! consumers built by different tool versions can still exchange parameters.

use crate::error::{ConfigurationError, StorageError};
use crate::parameters::ModuleParameters;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleArtifact {
    pub format_version: u32,
    pub module: ModuleParameters,
}

/// Write `parameters` to `path` atomically (write `.tmp`, then rename).
pub fn publish_artifact(parameters: &ModuleParameters, path: &Path) -> Result<(), StorageError> {
    let document = ModuleArtifact {
        format_version: ARTIFACT_FORMAT_VERSION,
        module: parameters.clone(),
    };
    let bytes = serde_json::to_vec_pretty(&document).map_err(|e| StorageError::Serialization {
        what: format!("module artifact for {}", parameters.module_id),
        message: e.to_string(),
    })?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, &bytes)?;
    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        StorageError::IoError(e)
    })?;

    debug!(module = %parameters.module_id, path = %path.display(), "Published module artifact");
    Ok(())
}

/// Read a published artifact and re-validate its parameters.
pub fn read_artifact(path: &Path) -> Result<ModuleParameters, ConfigurationError> {
    let invalid = |reason: String| ConfigurationError::InvalidArtifact {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = fs::read(path).map_err(|e| invalid(e.to_string()))?;
    let document: ModuleArtifact =
        serde_json::from_slice(&bytes).map_err(|e| invalid(e.to_string()))?;

    if document.format_version == 0 {
        return Err(invalid("format_version must be at least 1".to_string()));
    }
    if document.format_version > ARTIFACT_FORMAT_VERSION {
        warn!(
            path = %path.display(),
            found = document.format_version,
            supported = ARTIFACT_FORMAT_VERSION,
            "Module artifact was written by a newer producer; unknown fields are ignored"
        );
    }

    document.module.validate()?;
    Ok(document.module)
}

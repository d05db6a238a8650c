//! Configuration System
//!
//! Layered runtime configuration: built-in defaults, the global file, workspace
//! files, an optional explicit file, then `DOCWEAVE__*` environment variables.

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

mod merge {
    pub mod merge_policy;
}
mod sources {
    pub mod global_file;
    pub mod workspace_file;
}

pub use sources::global_file::global_config_path;
pub use sources::workspace_file::ENV_NAME_VAR;

pub const ENV_PREFIX: &str = "DOCWEAVE";

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocweaveConfig {
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub engine: EngineConfig,
    /// Stop starting new levels after the first fatal module failure.
    pub fail_fast: bool,
}

/// Where generated output and incremental bookkeeping live. Relative paths are
/// resolved against the workspace root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub output_dir: PathBuf,
    pub work_dir: PathBuf,
    pub state_path: PathBuf,
    pub cache_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("build/docs"),
            work_dir: PathBuf::from(".docweave/work"),
            state_path: PathBuf::from(".docweave/state"),
            cache_path: PathBuf::from(".docweave/cache"),
        }
    }
}

impl StorageConfig {
    pub fn resolve(&self, workspace_root: &Path) -> StorageConfig {
        let join = |path: &PathBuf| {
            if path.is_absolute() {
                path.clone()
            } else {
                workspace_root.join(path)
            }
        };
        StorageConfig {
            output_dir: join(&self.output_dir),
            work_dir: join(&self.work_dir),
            state_path: join(&self.state_path),
            cache_path: join(&self.cache_path),
        }
    }

    fn validate(&self) -> Result<(), String> {
        for (name, path) in [
            ("output_dir", &self.output_dir),
            ("work_dir", &self.work_dir),
            ("state_path", &self.state_path),
            ("cache_path", &self.cache_path),
        ] {
            if path.as_os_str().is_empty() {
                return Err(format!("{} cannot be empty", name));
            }
        }
        if self.output_dir == self.cache_path {
            return Err("output_dir and cache_path must differ".to_string());
        }
        Ok(())
    }
}

/// The external renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub program: Option<PathBuf>,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Storage(String),
    Engine(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Storage(msg) => write!(f, "Storage: {}", msg),
            ValidationError::Engine(msg) => write!(f, "Engine: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl DocweaveConfig {
    /// Validate the entire configuration, reporting every problem found.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.storage.validate() {
            errors.push(ValidationError::Storage(e));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }
        if let Some(program) = &self.engine.program {
            if program.as_os_str().is_empty() {
                errors.push(ValidationError::Engine("program cannot be empty".to_string()));
            }
        }
        for key in self.engine.env.keys() {
            if key.is_empty() || key.contains('=') {
                errors.push(ValidationError::Engine(format!(
                    "invalid environment variable name '{}'",
                    key
                )));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold all problems into one error.
    pub fn ensure_valid(&self) -> Result<(), ApiError> {
        self.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the layered configuration for `workspace_root`.
    pub fn load(workspace_root: &Path) -> Result<DocweaveConfig, ApiError> {
        Self::load_with(workspace_root, None)
    }

    /// As [`ConfigLoader::load`], with `explicit` layered above the workspace files.
    pub fn load_with(
        workspace_root: &Path,
        explicit: Option<&Path>,
    ) -> Result<DocweaveConfig, ApiError> {
        let mut builder = merge::merge_policy::builder_with_defaults()?;
        builder = sources::global_file::add_to_builder(builder)?;
        builder = sources::workspace_file::add_to_builder(builder, workspace_root)?;
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ApiError::ConfigError(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: DocweaveConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Load a single file over the defaults, ignoring every other layer.
    pub fn load_from_file(path: &Path) -> Result<DocweaveConfig, ApiError> {
        let config = merge::merge_policy::builder_with_defaults()?
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }
}

//! Error types for documentation configuration and generation.

use crate::parameters::SourceSetId;
use crate::types::ModuleId;
use std::path::PathBuf;
use thiserror::Error;

/// Storage-related errors (incremental state, build cache, artifacts on disk)
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to serialize {what}: {message}")]
    Serialization { what: String, message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Unsupported {what} version: {found} (expected {expected})")]
    UnsupportedVersion {
        what: &'static str,
        found: u32,
        expected: u32,
    },
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

/// Errors raised while constructing, resolving or aggregating documentation parameters.
///
/// All of these are fatal to the whole run: no generation starts once one is reported.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Source set {source_set}: required field '{field}' has no value and no convention default")]
    MissingRequiredField { source_set: String, field: &'static str },

    #[error("Source set {source_set}: invalid package pattern '{pattern}': {reason}")]
    InvalidPackagePattern {
        source_set: String,
        pattern: String,
        reason: String,
    },

    #[error("Module {consumer}: consumed module {target} cannot be resolved ({reason})")]
    UnresolvedDependency {
        consumer: ModuleId,
        target: ModuleId,
        reason: String,
    },

    #[error("Source set {source_set} in module {module}: dependent source set {target} is not declared by the module or any module it consumes")]
    UnresolvedSourceSet {
        module: ModuleId,
        source_set: SourceSetId,
        target: SourceSetId,
    },

    #[error("Cyclic module dependency: {}", format_cycle(.cycle))]
    CyclicModuleDependency { cycle: Vec<ModuleId> },

    #[error("Duplicate source set {id}: declared by module {first} and module {second}")]
    DuplicateSourceSetId {
        id: SourceSetId,
        first: ModuleId,
        second: ModuleId,
    },

    #[error("Invalid module artifact {path:?}: {reason}")]
    InvalidArtifact { path: PathBuf, reason: String },

    #[error("Invalid workspace manifest: {0}")]
    InvalidManifest(String),
}

fn format_cycle(cycle: &[ModuleId]) -> String {
    cycle
        .iter()
        .map(ModuleId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Per-module generation errors. These never abort sibling modules.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Module {module}: renderer exited with {status}")]
    EngineFailed { module: ModuleId, status: String },

    #[error("Module {module}: renderer reported {count} error diagnostic(s)")]
    EngineErrors { module: ModuleId, count: usize },

    #[error("Module {module}: {count} warning(s) reported and failOnWarning is enabled")]
    WarningsAsErrors { module: ModuleId, count: usize },

    #[error("Module {module}: generation cancelled")]
    Cancelled { module: ModuleId },

    #[error("Module {module}: renderer could not be started: {reason}")]
    EngineUnavailable { module: ModuleId, reason: String },

    #[error("Module {module}: {source}")]
    Storage {
        module: ModuleId,
        #[source]
        source: StorageError,
    },
}

impl GenerationError {
    pub fn module(&self) -> &ModuleId {
        match self {
            GenerationError::EngineFailed { module, .. }
            | GenerationError::EngineErrors { module, .. }
            | GenerationError::WarningsAsErrors { module, .. }
            | GenerationError::Cancelled { module }
            | GenerationError::EngineUnavailable { module, .. }
            | GenerationError::Storage { module, .. } => module,
        }
    }
}

/// Top-level error for library entry points
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

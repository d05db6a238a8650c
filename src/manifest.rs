//! Workspace manifest
//!
//! `docweave.toml` declares the modules of a workspace, their source sets and
//! which modules they consume:
//!
//! ```toml
//! [[module]]
//! id = ":core"
//! path = "core"
//!
//! [[module.source_set]]
//! name = "jvmMain"
//! jdk_version = 17
//!
//! [[module]]
//! id = ":app"
//! path = "app"
//! consumes = [{ kind = "in_run", module = ":core" }]
//! ```
//!
//! Relative paths are resolved against the module directory (`path`, itself
//! relative to the manifest). Source sets without declared roots default to
//! `src/{name}/kotlin` under the module directory.

use crate::error::ConfigurationError;
use crate::parameters::{
    ClasspathEntry, Conventions, FailurePolicy, ModuleConventions, ModuleDependency,
    ModuleParameters, OutputFormat, SourceSetBuilder,
};
use crate::types::ModuleId;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const MANIFEST_FILE: &str = "docweave.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkspaceManifest {
    #[serde(default, rename = "module")]
    pub modules: Vec<ModuleManifest>,
    /// Directory relative paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModuleManifest {
    pub id: ModuleId,
    /// Module directory, relative to the manifest.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Scope given to source sets that do not declare one; defaults to the id.
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default, rename = "source_set")]
    pub source_sets: Vec<SourceSetBuilder>,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default)]
    pub plugins_classpath: Vec<ClasspathEntry>,
    #[serde(default)]
    pub suppress_inherited_members: bool,
    #[serde(default = "default_true")]
    pub suppress_obvious_functions: bool,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default)]
    pub consumes: Vec<ModuleDependency>,
    /// Per-source-set convention values, keyed by source set name.
    #[serde(default)]
    pub conventions: BTreeMap<String, Conventions>,
}

impl WorkspaceManifest {
    /// Read `docweave.toml` from `workspace_root`.
    pub fn load_workspace(workspace_root: &Path) -> Result<Self, ConfigurationError> {
        Self::load(&workspace_root.join(MANIFEST_FILE))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let text = fs::read_to_string(path).map_err(|e| {
            ConfigurationError::InvalidManifest(format!("cannot read {}: {}", path.display(), e))
        })?;
        let base_dir = path
            .parent()
            .map(|dir| dunce::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf()))
            .unwrap_or_default();
        Self::parse(&text, base_dir)
    }

    pub fn parse(text: &str, base_dir: impl Into<PathBuf>) -> Result<Self, ConfigurationError> {
        let mut manifest: WorkspaceManifest =
            toml::from_str(text).map_err(|e| ConfigurationError::InvalidManifest(e.to_string()))?;
        manifest.base_dir = base_dir.into();
        debug!(
            modules = manifest.modules.len(),
            base = %manifest.base_dir.display(),
            "Parsed manifest"
        );
        Ok(manifest)
    }

    /// Finalize every source set and build the per-module parameters.
    pub fn into_parameters(self) -> Result<Vec<ModuleParameters>, ConfigurationError> {
        let base_dir = self.base_dir;
        self.modules
            .into_iter()
            .map(|module| module.into_parameters(&base_dir))
            .collect()
    }
}

impl ModuleManifest {
    pub fn module_dir(&self, base_dir: &Path) -> PathBuf {
        match &self.path {
            Some(path) => resolve(base_dir, path),
            None => base_dir.to_path_buf(),
        }
    }

    fn into_parameters(self, base_dir: &Path) -> Result<ModuleParameters, ConfigurationError> {
        let dir = self.module_dir(base_dir);
        let scope = self.scope.clone().unwrap_or_else(|| self.id.to_string());

        let mut conventions = ModuleConventions::new(scope);
        for builder in &self.source_sets {
            let mut convention = self.conventions.get(&builder.name).cloned().unwrap_or_default();
            if convention.source_roots.is_empty() {
                convention.source_roots =
                    vec![PathBuf::from("src").join(&builder.name).join("kotlin")];
            }
            convention.source_roots =
                convention.source_roots.iter().map(|p| resolve(&dir, p)).collect();
            convention.classpath = resolve_classpath(&dir, convention.classpath);
            convention.generated_dir = Some(match convention.generated_dir.take() {
                Some(generated) => resolve(&dir, &generated),
                None => dir.join("build").join("generated"),
            });
            conventions = conventions.with_source_set(builder.name.clone(), convention);
        }

        let specs = self
            .source_sets
            .into_iter()
            .map(|builder| resolve_builder(&dir, builder).finalize(&conventions))
            .collect::<Result<Vec<_>, _>>()?;

        let consumes = self
            .consumes
            .into_iter()
            .map(|dependency| match dependency {
                ModuleDependency::External { module, artifact } => ModuleDependency::External {
                    module,
                    artifact: resolve(&dir, &artifact),
                },
                in_run => in_run,
            })
            .collect();

        let mut parameters = ModuleParameters::new(self.id, specs)?
            .with_output_format(self.output_format)
            .with_plugins(resolve_classpath(&dir, self.plugins_classpath))
            .with_failure_policy(self.failure_policy)
            .with_suppress_inherited_members(self.suppress_inherited_members);
        parameters.suppress_obvious_functions = self.suppress_obvious_functions;
        parameters.consumes = consumes;
        Ok(parameters)
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn resolve_all(base: &Path, paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths.into_iter().map(|p| resolve(base, &p)).collect()
}

fn resolve_classpath(base: &Path, entries: Vec<ClasspathEntry>) -> Vec<ClasspathEntry> {
    entries
        .into_iter()
        .map(|entry| ClasspathEntry {
            path: resolve(base, &entry.path),
            ..entry
        })
        .collect()
}

fn resolve_builder(base: &Path, mut builder: SourceSetBuilder) -> SourceSetBuilder {
    builder.source_roots = resolve_all(base, builder.source_roots);
    builder.samples = resolve_all(base, builder.samples);
    builder.includes = resolve_all(base, builder.includes);
    builder.suppressed_files = resolve_all(base, builder.suppressed_files);
    builder.classpath = resolve_classpath(base, builder.classpath);
    for link in &mut builder.source_links {
        link.local_directory = resolve(base, &link.local_directory);
    }
    builder
}

//! Module-level documentation parameters

use crate::error::ConfigurationError;
use crate::parameters::classpath::{dedup_classpath, ClasspathEntry};
use crate::parameters::{SourceSetId, SourceSetSpec};
use crate::types::ModuleId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Renderer output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Html,
    Javadoc,
    Gfm,
    Jekyll,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Javadoc => "javadoc",
            OutputFormat::Gfm => "gfm",
            OutputFormat::Jekyll => "jekyll",
        }
    }
}

/// How diagnostics reported by the renderer affect a module's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailurePolicy {
    /// Treat any warning as a failed generation.
    pub fail_on_warning: bool,
    /// Whether a failed generation fails the overall run. Output is never promoted
    /// for a failed generation either way.
    pub fail_on_error: bool,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self {
            fail_on_warning: false,
            fail_on_error: true,
        }
    }
}

/// A consumption edge from one module to a producer of documentation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModuleDependency {
    /// Producer configured in the same run.
    InRun { module: ModuleId },
    /// Producer published by an earlier run; read from its artifact.
    External { module: ModuleId, artifact: PathBuf },
}

impl ModuleDependency {
    pub fn in_run(module: impl Into<ModuleId>) -> Self {
        ModuleDependency::InRun {
            module: module.into(),
        }
    }

    pub fn external(module: impl Into<ModuleId>, artifact: impl Into<PathBuf>) -> Self {
        ModuleDependency::External {
            module: module.into(),
            artifact: artifact.into(),
        }
    }

    pub fn module(&self) -> &ModuleId {
        match self {
            ModuleDependency::InRun { module } | ModuleDependency::External { module, .. } => {
                module
            }
        }
    }
}

fn default_true() -> bool {
    true
}

/// Everything one module declares for documentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleParameters {
    pub module_id: ModuleId,
    /// Source sets in declaration order.
    pub source_sets: Vec<SourceSetSpec>,
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
}

impl ModuleParameters {
    pub fn new(
        module_id: ModuleId,
        source_sets: Vec<SourceSetSpec>,
    ) -> Result<Self, ConfigurationError> {
        let parameters = Self {
            module_id,
            source_sets,
            output_format: OutputFormat::default(),
            plugins_classpath: Vec::new(),
            suppress_inherited_members: false,
            suppress_obvious_functions: true,
            failure_policy: FailurePolicy::default(),
            consumes: Vec::new(),
        };
        parameters.validate()?;
        Ok(parameters)
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Append plugin classpath entries, keeping the first occurrence of each artifact.
    pub fn with_plugins<I>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = ClasspathEntry>,
    {
        let combined = std::mem::take(&mut self.plugins_classpath).into_iter().chain(entries);
        self.plugins_classpath = dedup_classpath(combined);
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_suppress_inherited_members(mut self, suppress: bool) -> Self {
        self.suppress_inherited_members = suppress;
        self
    }

    pub fn consuming(mut self, dependency: ModuleDependency) -> Self {
        self.consumes.push(dependency);
        self
    }

    /// Check per-module invariants: unique source set ids and valid specs.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let mut seen: HashSet<&SourceSetId> = HashSet::new();
        for spec in &self.source_sets {
            if !seen.insert(&spec.id) {
                return Err(ConfigurationError::DuplicateSourceSetId {
                    id: spec.id.clone(),
                    first: self.module_id.clone(),
                    second: self.module_id.clone(),
                });
            }
            spec.validate()?;
        }
        Ok(())
    }

    pub fn source_set(&self, id: &SourceSetId) -> Option<&SourceSetSpec> {
        self.source_sets.iter().find(|spec| &spec.id == id)
    }

    pub fn source_set_ids(&self) -> impl Iterator<Item = &SourceSetId> {
        self.source_sets.iter().map(|spec| &spec.id)
    }

    /// Everything this module needs at runtime: the union of its source sets'
    /// classpaths in declaration order.
    pub fn runtime_classpath(&self) -> Vec<ClasspathEntry> {
        dedup_classpath(
            self.source_sets
                .iter()
                .flat_map(|spec| spec.classpath.iter().cloned()),
        )
    }
}

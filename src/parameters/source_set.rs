//! Source set parameters
//!
//! A source set is built in two phases. [`SourceSetBuilder`] collects raw
//! declarations with every field optional; [`SourceSetBuilder::finalize`] fills the
//! gaps from a [`ConventionProvider`] and then from documented defaults, producing
//! an immutable [`SourceSetSpec`].

use crate::error::ConfigurationError;
use crate::parameters::classpath::{dedup_classpath, ClasspathEntry};
use crate::parameters::links::{ExternalDocumentationLink, SourceLink};
use crate::parameters::package_options::{EffectivePackageOptions, PackageMatcher, PackageOptions};
use crate::parameters::SourceSetId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Declaration visibility levels that can be documented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
    Internal,
    Private,
    /// Java package-private
    Package,
}

/// Platform used to set up analysis and samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisPlatform {
    Jvm,
    Js,
    Wasm,
    Native,
    Common,
    Android,
}

impl AnalysisPlatform {
    /// Guess the platform from a conventional source set name such as `jvmMain`.
    pub fn infer(source_set_name: &str) -> Option<Self> {
        let lower = source_set_name.to_ascii_lowercase();
        let platform = if lower.starts_with("common") {
            AnalysisPlatform::Common
        } else if lower.starts_with("jvm") || lower == "main" {
            AnalysisPlatform::Jvm
        } else if lower.starts_with("android") {
            AnalysisPlatform::Android
        } else if lower.starts_with("js") {
            AnalysisPlatform::Js
        } else if lower.starts_with("wasm") {
            AnalysisPlatform::Wasm
        } else if ["native", "linux", "macos", "mingw", "ios", "tvos", "watchos"]
            .iter()
            .any(|prefix| lower.starts_with(prefix))
        {
            AnalysisPlatform::Native
        } else {
            return None;
        };
        Some(platform)
    }
}

const DEFAULT_JDK_VERSION: u32 = 8;

fn default_true() -> bool {
    true
}

/// Fully resolved parameters for one documentable source set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSetSpec {
    pub id: SourceSetId,
    pub display_name: String,
    pub suppress: bool,
    pub source_roots: BTreeSet<PathBuf>,
    #[serde(default)]
    pub samples: BTreeSet<PathBuf>,
    #[serde(default)]
    pub includes: BTreeSet<PathBuf>,
    /// Order matters for symbol resolution.
    #[serde(default)]
    pub classpath: Vec<ClasspathEntry>,
    #[serde(default)]
    pub suppressed_files: BTreeSet<PathBuf>,
    /// When set, the module's generated-sources directory is among `suppressed_files`.
    #[serde(default = "default_true")]
    pub suppress_generated_files: bool,
    pub documented_visibilities: BTreeSet<Visibility>,
    #[serde(default)]
    pub per_package_options: Vec<PackageOptions>,
    #[serde(default)]
    pub external_documentation_links: BTreeSet<ExternalDocumentationLink>,
    #[serde(default)]
    pub source_links: BTreeSet<SourceLink>,
    #[serde(default)]
    pub dependent_source_sets: BTreeSet<SourceSetId>,
    pub analysis_platform: AnalysisPlatform,
    pub report_undocumented: bool,
    pub skip_empty_packages: bool,
    pub skip_deprecated: bool,
    pub jdk_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    pub no_stdlib_link: bool,
    pub no_jdk_link: bool,
    #[serde(default)]
    pub no_android_sdk_link: bool,
}

impl SourceSetSpec {
    /// Re-check the invariants `finalize` establishes.
    ///
    /// Used for specs that arrive from a module artifact rather than a builder.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let label = self.id.to_string();
        if self.display_name.trim().is_empty() {
            return Err(ConfigurationError::MissingRequiredField {
                source_set: label,
                field: "display_name",
            });
        }
        check_links(&label, self.external_documentation_links.iter())?;
        self.package_matcher().map(|_| ())
    }

    /// Source-set level options, before any per-package override applies.
    pub fn default_package_options(&self) -> EffectivePackageOptions {
        EffectivePackageOptions {
            suppress: self.suppress,
            documented_visibilities: self.documented_visibilities.clone(),
            skip_deprecated: self.skip_deprecated,
            report_undocumented: self.report_undocumented,
        }
    }

    pub fn package_matcher(&self) -> Result<PackageMatcher<'_>, ConfigurationError> {
        PackageMatcher::compile(
            &self.id.to_string(),
            &self.per_package_options,
            self.default_package_options(),
        )
    }

    /// Effective options for one package: first matching override, else the defaults.
    pub fn options_for_package(
        &self,
        package: &str,
    ) -> Result<EffectivePackageOptions, ConfigurationError> {
        Ok(self.package_matcher()?.options_for(package))
    }
}

fn check_links<'a, I>(source_set: &str, links: I) -> Result<(), ConfigurationError>
where
    I: IntoIterator<Item = &'a ExternalDocumentationLink>,
{
    for link in links {
        if !link.is_well_formed() {
            return Err(ConfigurationError::InvalidManifest(format!(
                "source set {}: external documentation link '{}' is not an absolute URL",
                source_set, link.url
            )));
        }
    }
    Ok(())
}

/// Values supplied by compiler tooling integration for a source set.
///
/// Any field left unset here falls through to the documented default, or to a
/// `MissingRequiredField` error for fields that have none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conventions {
    pub scope: Option<String>,
    pub display_name: Option<String>,
    pub analysis_platform: Option<AnalysisPlatform>,
    pub source_roots: Vec<PathBuf>,
    pub classpath: Vec<ClasspathEntry>,
    pub dependent_source_sets: Vec<SourceSetId>,
    pub jdk_version: Option<u32>,
    pub language_version: Option<String>,
    pub api_version: Option<String>,
    /// Directory holding generated sources, e.g. `{module}/build/generated`.
    pub generated_dir: Option<PathBuf>,
}

/// Source of convention values, looked up by source set name.
pub trait ConventionProvider {
    fn conventions(&self, source_set_name: &str) -> Conventions;
}

/// Provides nothing; every required field must be declared explicitly.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConventions;

impl ConventionProvider for NoConventions {
    fn conventions(&self, _source_set_name: &str) -> Conventions {
        Conventions::default()
    }
}

/// Conventions for the source sets of one module.
///
/// The scope defaults to the module path, the display name is derived from the
/// source set name (`jvmMain` becomes `jvm`), and the platform is inferred from the
/// name. Entries in the per-name table take precedence over the derived values.
#[derive(Debug, Clone, Default)]
pub struct ModuleConventions {
    scope: String,
    by_name: BTreeMap<String, Conventions>,
}

impl ModuleConventions {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            by_name: BTreeMap::new(),
        }
    }

    pub fn with_source_set(mut self, name: impl Into<String>, conventions: Conventions) -> Self {
        self.by_name.insert(name.into(), conventions);
        self
    }
}

impl ConventionProvider for ModuleConventions {
    fn conventions(&self, source_set_name: &str) -> Conventions {
        let mut conventions = self.by_name.get(source_set_name).cloned().unwrap_or_default();
        conventions.scope.get_or_insert_with(|| self.scope.clone());
        conventions
            .display_name
            .get_or_insert_with(|| derive_display_name(source_set_name));
        if conventions.analysis_platform.is_none() {
            conventions.analysis_platform = AnalysisPlatform::infer(source_set_name);
        }
        conventions
    }
}

fn derive_display_name(source_set_name: &str) -> String {
    match source_set_name.strip_suffix("Main") {
        Some(prefix) if !prefix.is_empty() => prefix.to_string(),
        _ => source_set_name.to_string(),
    }
}

/// Raw source set declarations; every field optional until [`finalize`](Self::finalize).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSetBuilder {
    pub name: String,
    pub scope: Option<String>,
    pub display_name: Option<String>,
    pub suppress: Option<bool>,
    pub source_roots: Vec<PathBuf>,
    pub samples: Vec<PathBuf>,
    pub includes: Vec<PathBuf>,
    pub classpath: Vec<ClasspathEntry>,
    pub suppressed_files: Vec<PathBuf>,
    pub suppress_generated_files: Option<bool>,
    pub documented_visibilities: Option<BTreeSet<Visibility>>,
    pub per_package_options: Vec<PackageOptions>,
    pub external_documentation_links: Vec<ExternalDocumentationLink>,
    pub source_links: Vec<SourceLink>,
    pub dependent_source_sets: Vec<SourceSetId>,
    pub analysis_platform: Option<AnalysisPlatform>,
    pub report_undocumented: Option<bool>,
    pub skip_empty_packages: Option<bool>,
    pub skip_deprecated: Option<bool>,
    pub jdk_version: Option<u32>,
    pub language_version: Option<String>,
    pub api_version: Option<String>,
    pub no_stdlib_link: Option<bool>,
    pub no_jdk_link: Option<bool>,
    pub no_android_sdk_link: Option<bool>,
}

impl SourceSetBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn analysis_platform(mut self, platform: AnalysisPlatform) -> Self {
        self.analysis_platform = Some(platform);
        self
    }

    pub fn suppress(mut self, suppress: bool) -> Self {
        self.suppress = Some(suppress);
        self
    }

    pub fn source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_roots.push(root.into());
        self
    }

    pub fn sample(mut self, sample: impl Into<PathBuf>) -> Self {
        self.samples.push(sample.into());
        self
    }

    pub fn include(mut self, include: impl Into<PathBuf>) -> Self {
        self.includes.push(include.into());
        self
    }

    pub fn classpath_entry(mut self, entry: ClasspathEntry) -> Self {
        self.classpath.push(entry);
        self
    }

    pub fn suppressed_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.suppressed_files.push(path.into());
        self
    }

    pub fn suppress_generated_files(mut self, suppress: bool) -> Self {
        self.suppress_generated_files = Some(suppress);
        self
    }

    pub fn documented_visibilities<I>(mut self, visibilities: I) -> Self
    where
        I: IntoIterator<Item = Visibility>,
    {
        self.documented_visibilities = Some(visibilities.into_iter().collect());
        self
    }

    pub fn package_options(mut self, options: PackageOptions) -> Self {
        self.per_package_options.push(options);
        self
    }

    pub fn external_documentation_link(mut self, link: ExternalDocumentationLink) -> Self {
        self.external_documentation_links.push(link);
        self
    }

    pub fn source_link(mut self, link: SourceLink) -> Self {
        self.source_links.push(link);
        self
    }

    pub fn depends_on(mut self, id: SourceSetId) -> Self {
        self.dependent_source_sets.push(id);
        self
    }

    pub fn skip_deprecated(mut self, skip: bool) -> Self {
        self.skip_deprecated = Some(skip);
        self
    }

    pub fn jdk_version(mut self, version: u32) -> Self {
        self.jdk_version = Some(version);
        self
    }

    /// Resolve every field and validate package patterns.
    ///
    /// Dependent source sets are recorded as given; whether they exist is checked
    /// during cross-module resolution.
    pub fn finalize(
        self,
        provider: &dyn ConventionProvider,
    ) -> Result<SourceSetSpec, ConfigurationError> {
        if self.name.trim().is_empty() {
            return Err(ConfigurationError::MissingRequiredField {
                source_set: "<unnamed>".to_string(),
                field: "name",
            });
        }
        let conventions = provider.conventions(&self.name);

        let scope = self
            .scope
            .or(conventions.scope)
            .filter(|scope| !scope.is_empty())
            .ok_or_else(|| ConfigurationError::MissingRequiredField {
                source_set: self.name.clone(),
                field: "scope",
            })?;
        let id = SourceSetId::new(scope, self.name);
        let label = id.to_string();

        let display_name = self
            .display_name
            .or(conventions.display_name)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| ConfigurationError::MissingRequiredField {
                source_set: label.clone(),
                field: "display_name",
            })?;
        let analysis_platform = self
            .analysis_platform
            .or(conventions.analysis_platform)
            .ok_or_else(|| ConfigurationError::MissingRequiredField {
                source_set: label.clone(),
                field: "analysis_platform",
            })?;

        let source_roots = or_convention(self.source_roots, conventions.source_roots);
        let classpath = or_convention(self.classpath, conventions.classpath);
        let dependent_source_sets =
            or_convention(self.dependent_source_sets, conventions.dependent_source_sets);

        check_links(&label, self.external_documentation_links.iter())?;

        let suppress_generated_files = self.suppress_generated_files.unwrap_or(true);
        let mut suppressed_files: BTreeSet<PathBuf> = self.suppressed_files.into_iter().collect();
        if suppress_generated_files {
            suppressed_files.extend(conventions.generated_dir);
        }

        let spec = SourceSetSpec {
            id,
            display_name,
            suppress: self.suppress.unwrap_or(false),
            source_roots: source_roots.into_iter().collect(),
            samples: self.samples.into_iter().collect(),
            includes: self.includes.into_iter().collect(),
            classpath: dedup_classpath(classpath),
            suppressed_files,
            suppress_generated_files,
            documented_visibilities: self
                .documented_visibilities
                .unwrap_or_else(|| [Visibility::Public].into_iter().collect()),
            per_package_options: self.per_package_options,
            external_documentation_links: self.external_documentation_links.into_iter().collect(),
            source_links: self.source_links.into_iter().collect(),
            dependent_source_sets: dependent_source_sets.into_iter().collect(),
            analysis_platform,
            report_undocumented: self.report_undocumented.unwrap_or(false),
            skip_empty_packages: self.skip_empty_packages.unwrap_or(true),
            skip_deprecated: self.skip_deprecated.unwrap_or(false),
            jdk_version: self
                .jdk_version
                .or(conventions.jdk_version)
                .unwrap_or(DEFAULT_JDK_VERSION),
            language_version: self.language_version.or(conventions.language_version),
            api_version: self.api_version.or(conventions.api_version),
            no_stdlib_link: self.no_stdlib_link.unwrap_or(false),
            no_jdk_link: self.no_jdk_link.unwrap_or(false),
            no_android_sdk_link: self.no_android_sdk_link.unwrap_or(false),
        };

        spec.package_matcher()?;
        Ok(spec)
    }
}

/// Explicit collections replace the convention; an empty declaration takes it.
fn or_convention<T>(declared: Vec<T>, convention: Vec<T>) -> Vec<T> {
    if declared.is_empty() {
        convention
    } else {
        declared
    }
}

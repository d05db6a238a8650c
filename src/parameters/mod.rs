//! Documentation parameters
//!
//! The model describing what to document: source set identities and specs,
//! per-package overrides, links, classpaths, and the per-module aggregate that is
//! exchanged between modules as an artifact.

pub mod artifact;
pub mod classpath;
pub mod id;
pub mod links;
pub mod module;
pub mod package_options;
pub mod source_set;

pub use artifact::{publish_artifact, read_artifact, ModuleArtifact, ARTIFACT_FORMAT_VERSION};
pub use classpath::{dedup_classpath, merge_classpath, ClasspathEntry};
pub use id::SourceSetId;
pub use links::{ExternalDocumentationLink, SourceLink};
pub use module::{FailurePolicy, ModuleDependency, ModuleParameters, OutputFormat};
pub use package_options::{EffectivePackageOptions, PackageMatcher, PackageOptions};
pub use source_set::{
    AnalysisPlatform, ConventionProvider, Conventions, ModuleConventions, NoConventions,
    SourceSetBuilder, SourceSetSpec, Visibility,
};

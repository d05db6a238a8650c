//! Loading `docweave.toml` from disk.

use crate::integration::test_utils::Workspace;
use docweave::error::{ApiError, ConfigurationError};
use docweave::manifest::WorkspaceManifest;
use docweave::parameters::{AnalysisPlatform, OutputFormat, SourceSetId, Visibility};

#[test]
fn test_paths_resolve_against_canonical_module_directory() {
    let workspace = Workspace::two_modules();
    let modules = WorkspaceManifest::load_workspace(workspace.root())
        .unwrap()
        .into_parameters()
        .unwrap();

    let root = dunce::canonicalize(workspace.root()).unwrap();
    let core = modules.iter().find(|m| m.module_id.as_str() == ":core").unwrap();
    let jvm = core.source_set(&SourceSetId::new(":core", "jvmMain")).unwrap();
    assert!(jvm.source_roots.contains(&root.join("core/src/jvmMain/kotlin")));
    assert_eq!(jvm.analysis_platform, AnalysisPlatform::Jvm);
    assert_eq!(jvm.display_name, "jvm");
}

#[test]
fn test_module_order_follows_the_manifest() {
    let workspace = Workspace::two_modules();
    let modules = workspace.docweave().load_modules().unwrap();
    let ids: Vec<&str> = modules.iter().map(|m| m.module_id.as_str()).collect();
    assert_eq!(ids, vec![":core", ":app"]);
}

#[test]
fn test_declared_values_override_conventions() {
    let workspace = Workspace::new(
        r#"
[[module]]
id = ":lib"
path = "lib"
output_format = "gfm"

[module.conventions.shared]
analysis_platform = "common"
display_name = "from-convention"
jdk_version = 11

[[module.source_set]]
name = "shared"
display_name = "Shared"
documented_visibilities = ["public", "protected"]
source_roots = ["src/shared"]
"#,
    );
    let modules = workspace.docweave().load_modules().unwrap();
    let lib = &modules[0];
    assert_eq!(lib.output_format, OutputFormat::Gfm);

    let shared = lib.source_set(&SourceSetId::new(":lib", "shared")).unwrap();
    assert_eq!(shared.display_name, "Shared");
    assert_eq!(shared.analysis_platform, AnalysisPlatform::Common);
    assert_eq!(shared.jdk_version, 11);
    assert_eq!(shared.source_roots.len(), 1);
    assert!(shared.source_roots.iter().all(|root| root.ends_with("lib/src/shared")));
    assert!(shared.documented_visibilities.contains(&Visibility::Protected));
}

#[test]
fn test_missing_manifest_is_reported() {
    let dir = tempfile::TempDir::new().unwrap();
    let err = WorkspaceManifest::load_workspace(dir.path()).unwrap_err();
    assert!(matches!(
        err,
        ConfigurationError::InvalidManifest(ref message) if message.contains("docweave.toml")
    ));
}

#[test]
fn test_invalid_package_pattern_fails_loading() {
    let workspace = Workspace::new(
        r#"
[[module]]
id = ":lib"

[[module.source_set]]
name = "jvmMain"

[[module.source_set.per_package_options]]
matching_regex = "com.example.(unclosed"
suppress = true
"#,
    );
    let err = workspace.docweave().load_modules().unwrap_err();
    assert!(matches!(
        err,
        ApiError::Configuration(ConfigurationError::InvalidPackagePattern { .. })
    ));
}

//! Workspace resolution: manifests on disk through `Docweave::resolve`, including
//! modules consumed from artifacts published by another workspace.

use crate::integration::test_utils::{FakeEngine, Workspace};
use docweave::aggregate::Aggregator;
use docweave::error::{ApiError, ConfigurationError};
use docweave::generation::CancelSignal;
use docweave::parameters::{read_artifact, SourceSetId};
use docweave::resolve::ProducerKind;
use docweave::types::ModuleId;
use std::path::{Path, PathBuf};

fn site_manifest(artifact: &Path) -> String {
    format!(
        r#"
[[module]]
id = ":site"
path = "site"
consumes = [{{ kind = "external", module = ":core", artifact = "{}" }}]

[[module.source_set]]
name = "jvmMain"
classpath = ["libs/site-only.jar"]
dependent_source_sets = [{{ scope = ":core", name = "jvmMain" }}]
"#,
        artifact.display().to_string().replace('\\', "\\\\")
    )
}

#[test]
fn test_consumer_sees_producer_classpath_first() {
    let workspace = Workspace::two_modules();
    let resolution = workspace.docweave().resolve().unwrap();

    let app = resolution.get(&ModuleId::new(":app")).unwrap();
    assert_eq!(app.producers, vec![ModuleId::new(":core")]);
    assert!(app
        .consumed_source_sets
        .contains(&SourceSetId::new(":core", "jvmMain")));
    let first = &app.parameters.source_sets[0].classpath[0];
    assert_eq!(first.coordinate.as_deref(), Some("org.example:annotations"));
    assert_eq!(first.path, PathBuf::from("/m2/annotations.jar"));
}

#[test]
fn test_published_artifacts_resolve_in_another_workspace() {
    let producer = Workspace::two_modules();
    let published = producer.root().join("published");
    let written = producer.docweave().publish(&published).unwrap();
    assert_eq!(written, vec![published.join("app.json"), published.join("core.json")]);

    let core = read_artifact(&published.join("core.json")).unwrap();
    assert_eq!(core.module_id, ModuleId::new(":core"));

    let consumer = Workspace::new(&site_manifest(&published.join("core.json")));
    consumer.write_source("site", "Site.kt", "class Site");
    let resolution = consumer.docweave().resolve().unwrap();

    let external = resolution.get(&ModuleId::new(":core")).unwrap();
    assert!(matches!(external.kind, ProducerKind::External { .. }));

    let site = resolution.get(&ModuleId::new(":site")).unwrap();
    let classpath: Vec<String> = site.parameters.source_sets[0]
        .classpath
        .iter()
        .map(|entry| entry.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(classpath, vec!["annotations.jar", "site-only.jar"]);

    let configuration = Aggregator::aggregate_unit(&resolution, &ModuleId::new(":site")).unwrap();
    assert_eq!(configuration.module_name, ":site");
    assert_eq!(configuration.modules, vec![ModuleId::new(":core"), ModuleId::new(":site")]);
}

#[tokio::test]
async fn test_external_modules_are_not_rendered() {
    let producer = Workspace::two_modules();
    let published = producer.root().join("published");
    producer.docweave().publish(&published).unwrap();

    let consumer = Workspace::new(&site_manifest(&published.join("core.json")));
    consumer.write_source("site", "Site.kt", "class Site");
    let engine = FakeEngine::new();
    let report = consumer
        .docweave()
        .generate_with(engine.clone(), CancelSignal::never())
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(engine.calls(), vec![ModuleId::new(":site")]);
    assert!(report.outcome(&ModuleId::new(":core")).is_none());
}

#[test]
fn test_missing_artifact_is_unresolved_dependency() {
    let dir = tempfile::TempDir::new().unwrap();
    let consumer = Workspace::new(&site_manifest(&dir.path().join("nowhere.json")));

    let err = consumer.docweave().resolve().unwrap_err();
    assert!(matches!(
        err,
        ApiError::Configuration(ConfigurationError::UnresolvedDependency { ref target, .. })
            if target.as_str() == ":core"
    ));
}

#[test]
fn test_undeclared_in_run_producer_is_rejected() {
    let workspace = Workspace::new(
        r#"
[[module]]
id = ":app"
consumes = [{ kind = "in_run", module = ":missing" }]
"#,
    );
    let err = workspace.docweave().resolve().unwrap_err();
    assert!(matches!(
        err,
        ApiError::Configuration(ConfigurationError::UnresolvedDependency { .. })
    ));
}

#[test]
fn test_cycle_between_modules_is_reported() {
    let workspace = Workspace::new(
        r#"
[[module]]
id = ":a"
consumes = [{ kind = "in_run", module = ":b" }]

[[module]]
id = ":b"
consumes = [{ kind = "in_run", module = ":a" }]
"#,
    );
    let err = workspace.docweave().resolve().unwrap_err();
    let ApiError::Configuration(ConfigurationError::CyclicModuleDependency { cycle }) = err else {
        panic!("expected a cycle, got {:?}", err);
    };
    assert!(cycle.contains(&ModuleId::new(":a")));
    assert!(cycle.contains(&ModuleId::new(":b")));
}

#[test]
fn test_dependent_source_set_outside_consumed_modules_is_rejected() {
    let workspace = Workspace::new(
        r#"
[[module]]
id = ":core"

[[module.source_set]]
name = "jvmMain"

[[module]]
id = ":app"

[[module.source_set]]
name = "jvmMain"
dependent_source_sets = [{ scope = ":core", name = "jvmMain" }]
"#,
    );
    let err = workspace.docweave().resolve().unwrap_err();
    assert!(matches!(
        err,
        ApiError::Configuration(ConfigurationError::UnresolvedSourceSet { ref target, .. })
            if *target == SourceSetId::new(":core", "jvmMain")
    ));
}

#[tokio::test]
async fn test_duplicate_source_set_in_one_unit_fails_before_rendering() {
    let workspace = Workspace::new(
        r#"
[[module]]
id = ":a"
scope = "shared"

[[module.source_set]]
name = "jvmMain"

[[module]]
id = ":b"
scope = "shared"
consumes = [{ kind = "in_run", module = ":a" }]

[[module.source_set]]
name = "jvmMain"
"#,
    );
    let engine = FakeEngine::new();
    let err = workspace
        .docweave()
        .generate_with(engine.clone(), CancelSignal::never())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ApiError::Configuration(ConfigurationError::DuplicateSourceSetId { .. })
    ));
    assert_eq!(engine.call_count(), 0);
}

//! Incremental bookkeeping against real workspaces: fingerprints, persisted
//! state and output relocation.

use crate::integration::test_utils::{FakeEngine, Workspace, TWO_MODULE_MANIFEST};
use docweave::generation::{CancelSignal, ModuleOutcome, ReportKind};
use docweave::incremental::{
    fingerprint_configuration, input_paths, Fingerprint, GenerateReason, IncrementalState,
    IncrementalStateStore, PlanDecision, SledStateStore,
};
use docweave::types::ModuleId;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_state_survives_reopening_the_store() {
    let dir = TempDir::new().unwrap();
    let module = ModuleId::new(":core");
    let fingerprint = Fingerprint::from_bytes([7; 32]);
    {
        let store = SledStateStore::open(dir.path().join("state")).unwrap();
        store
            .put(&module, &IncrementalState::new(fingerprint, "/out/core"))
            .unwrap();
    }

    let store = SledStateStore::open(dir.path().join("state")).unwrap();
    let state = store.get(&module).unwrap().unwrap();
    assert_eq!(state.fingerprint, fingerprint);
    assert_eq!(state.output_dir, std::path::PathBuf::from("/out/core"));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_consumer_unit_reads_producer_sources() {
    let workspace = Workspace::two_modules();
    let docweave = workspace.docweave();
    let resolution = docweave.resolve().unwrap();
    let plan = docweave.generation_plan(&resolution).unwrap();

    let app = plan.units().find(|unit| unit.module.as_str() == ":app").unwrap();
    let inputs = input_paths(&app.configuration);
    assert!(inputs.iter().any(|path| path.ends_with("core/src/jvmMain/kotlin")));
    assert!(inputs.iter().any(|path| path.ends_with("app/src/jvmMain/kotlin")));

    let core = plan.units().find(|unit| unit.module.as_str() == ":core").unwrap();
    assert!(!input_paths(&core.configuration)
        .iter()
        .any(|path| path.ends_with("app/src/jvmMain/kotlin")));
}

#[test]
fn test_fingerprint_is_stable_across_loads() {
    let workspace = Workspace::two_modules();
    let fingerprint = || {
        let docweave = workspace.docweave();
        let resolution = docweave.resolve().unwrap();
        let plan = docweave.generation_plan(&resolution).unwrap();
        plan.units()
            .map(|unit| fingerprint_configuration(&unit.configuration).unwrap())
            .collect::<Vec<_>>()
    };
    assert_eq!(fingerprint(), fingerprint());
}

#[tokio::test]
async fn test_manifest_setting_change_invalidates_the_module() {
    let workspace = Workspace::two_modules();
    let docweave = workspace.docweave();
    docweave
        .generate_with(FakeEngine::new(), CancelSignal::never())
        .await
        .unwrap();

    let edited = TWO_MODULE_MANIFEST.replace(
        "id = \":app\"\npath = \"app\"\n",
        "id = \":app\"\npath = \"app\"\noutput_format = \"gfm\"\n",
    );
    assert_ne!(edited, TWO_MODULE_MANIFEST);
    fs::write(workspace.root().join("docweave.toml"), edited).unwrap();

    let plans = docweave.plan().unwrap();
    assert_eq!(plans[0].decision, PlanDecision::UpToDate);
    assert_eq!(
        plans[1].decision,
        PlanDecision::Generate {
            reason: GenerateReason::InputsChanged
        }
    );
}

#[tokio::test]
async fn test_relocated_output_is_restored_from_cache() {
    let workspace = Workspace::two_modules();
    let engine = FakeEngine::new();
    workspace
        .docweave()
        .generate_with(engine.clone(), CancelSignal::never())
        .await
        .unwrap();

    let relocated = workspace.docweave_with(|config| config.storage.output_dir = "site".into());
    let report = relocated
        .generate_with(engine.clone(), CancelSignal::never())
        .await
        .unwrap();

    assert_eq!(engine.call_count(), 2);
    for module in [":core", ":app"] {
        let Some(ModuleOutcome::Succeeded(generated)) = report.outcome(&ModuleId::new(module))
        else {
            panic!("{} did not succeed", module);
        };
        assert_eq!(generated.kind, ReportKind::RestoredFromCache);
    }
    assert!(workspace.root().join("site/app/index.html").is_file());
}

//! Aggregated configurations do not depend on declaration order.

use crate::integration::test_utils::Workspace;
use docweave::aggregate::Aggregator;
use docweave::parameters::SourceSetId;
use docweave::types::ModuleId;

const FORWARD: &str = r#"
[[module]]
id = ":core"
path = "core"

[[module.source_set]]
name = "commonMain"

[[module.source_set]]
name = "jvmMain"
dependent_source_sets = [{ scope = ":core", name = "commonMain" }]

[[module]]
id = ":app"
path = "app"
consumes = [{ kind = "in_run", module = ":core" }]

[[module.source_set]]
name = "jvmMain"
dependent_source_sets = [{ scope = ":core", name = "jvmMain" }]
"#;

const REVERSED: &str = r#"
[[module]]
id = ":app"
path = "app"
consumes = [{ kind = "in_run", module = ":core" }]

[[module.source_set]]
name = "jvmMain"
dependent_source_sets = [{ scope = ":core", name = "jvmMain" }]

[[module]]
id = ":core"
path = "core"

[[module.source_set]]
name = "jvmMain"
dependent_source_sets = [{ scope = ":core", name = "commonMain" }]

[[module.source_set]]
name = "commonMain"
"#;

fn unit_json(manifest: &str, module: &str) -> Vec<u8> {
    // Same directory layout for both orders so absolute paths agree.
    let workspace = Workspace::new(manifest);
    let resolution = workspace.docweave().resolve().unwrap();
    let configuration = Aggregator::aggregate_unit(&resolution, &ModuleId::new(module)).unwrap();
    let text = String::from_utf8(configuration.to_json().unwrap()).unwrap();
    let root = dunce::canonicalize(workspace.root()).unwrap();
    text.replace(&root.display().to_string(), "<root>").into_bytes()
}

#[test]
fn test_declaration_order_does_not_change_configuration_bytes() {
    for module in [":core", ":app"] {
        assert_eq!(unit_json(FORWARD, module), unit_json(REVERSED, module));
    }
}

#[test]
fn test_unit_holds_every_transitively_consumed_source_set_in_id_order() {
    let workspace = Workspace::new(FORWARD);
    let resolution = workspace.docweave().resolve().unwrap();
    let configuration = Aggregator::aggregate_unit(&resolution, &ModuleId::new(":app")).unwrap();

    let ids: Vec<&SourceSetId> = configuration.source_sets.keys().collect();
    assert_eq!(
        ids,
        vec![
            &SourceSetId::new(":app", "jvmMain"),
            &SourceSetId::new(":core", "commonMain"),
            &SourceSetId::new(":core", "jvmMain"),
        ]
    );
    assert_eq!(configuration.module_name, ":app");
}

#[test]
fn test_whole_run_configuration_uses_smallest_module_for_settings() {
    let workspace = Workspace::new(FORWARD);
    let resolution = workspace.docweave().resolve().unwrap();
    let configuration = Aggregator::aggregate_all(&resolution).unwrap();

    assert_eq!(configuration.modules, vec![ModuleId::new(":app"), ModuleId::new(":core")]);
    assert_eq!(configuration.module_name, ":app");
    assert_eq!(configuration.source_sets.len(), 3);
}

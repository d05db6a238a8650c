//! Property-based tests for determinism guarantees

use docweave::aggregate::Aggregator;
use docweave::incremental::fingerprint_configuration;
use docweave::parameters::{AnalysisPlatform, ModuleParameters, NoConventions, SourceSetBuilder};
use docweave::resolve::CrossModuleResolver;
use docweave::types::ModuleId;
use proptest::prelude::*;
use proptest::test_runner::{Config, TestRunner};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const NAMES: &[&str] = &["commonMain", "jvmMain", "jsMain", "nativeMain"];

fn module(index: usize, names: &BTreeSet<&'static str>, root: Option<&Path>) -> ModuleParameters {
    let scope = format!(":m{}", index);
    let specs = names
        .iter()
        .map(|name| {
            let mut builder = SourceSetBuilder::new(*name)
                .scope(scope.clone())
                .display_name(*name)
                .analysis_platform(AnalysisPlatform::Jvm);
            if let Some(root) = root {
                builder = builder.source_root(root.join(&scope[1..]));
            }
            builder.finalize(&NoConventions).unwrap()
        })
        .collect();
    ModuleParameters::new(ModuleId::new(scope.clone()), specs).unwrap()
}

fn layouts() -> impl Strategy<Value = BTreeMap<usize, BTreeSet<&'static str>>> {
    prop::collection::btree_map(
        0usize..8,
        prop::collection::btree_set(prop::sample::select(NAMES), 0..4),
        1..6,
    )
}

/// Resolving and aggregating the same modules in any order gives identical bytes.
#[test]
fn test_aggregation_is_order_independent() {
    let mut runner = TestRunner::default();
    let strategy = layouts().prop_flat_map(|layout| {
        let modules: Vec<ModuleParameters> = layout
            .iter()
            .map(|(index, names)| module(*index, names, None))
            .collect();
        (Just(modules.clone()), Just(modules).prop_shuffle())
    });

    runner
        .run(&strategy, |(ordered, shuffled)| {
            let first = CrossModuleResolver::resolve(ordered).unwrap();
            let second = CrossModuleResolver::resolve(shuffled).unwrap();
            let first = Aggregator::aggregate_all(&first).unwrap();
            let second = Aggregator::aggregate_all(&second).unwrap();
            prop_assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
            Ok(())
        })
        .unwrap();
}

/// Fingerprints depend only on configuration and input contents.
#[test]
fn test_fingerprint_is_pure() {
    let mut runner = TestRunner::new(Config::with_cases(24));
    let strategy = (
        layouts(),
        prop::collection::vec(any::<Vec<u8>>(), 1..4),
    );

    runner
        .run(&strategy, |(layout, contents)| {
            let dir = TempDir::new().unwrap();
            let modules: Vec<ModuleParameters> = layout
                .iter()
                .map(|(index, names)| module(*index, names, Some(dir.path())))
                .collect();
            for index in layout.keys() {
                let root = dir.path().join(format!("m{}", index));
                fs::create_dir_all(&root).unwrap();
                for (file, bytes) in contents.iter().enumerate() {
                    fs::write(root.join(format!("F{}.kt", file)), bytes).unwrap();
                }
            }

            let resolution = CrossModuleResolver::resolve(modules).unwrap();
            let configuration = Aggregator::aggregate_all(&resolution).unwrap();
            let first = fingerprint_configuration(&configuration).unwrap();
            let second = fingerprint_configuration(&configuration).unwrap();
            prop_assert_eq!(first, second);

            // Only modules with at least one source set have a root on the input list.
            let Some((index, _)) = layout.iter().find(|(_, names)| !names.is_empty()) else {
                return Ok(());
            };
            let added = dir.path().join(format!("m{}", index)).join("Added.kt");
            fs::write(added, b"class Added").unwrap();
            prop_assert_ne!(first, fingerprint_configuration(&configuration).unwrap());
            Ok(())
        })
        .unwrap();
}

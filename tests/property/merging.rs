//! Property-based tests for classpath merging and package option overrides

use docweave::parameters::{
    merge_classpath, ClasspathEntry, EffectivePackageOptions, PackageMatcher, PackageOptions,
    Visibility,
};
use proptest::prelude::*;
use proptest::test_runner::TestRunner;
use std::collections::HashSet;

const PREFIXES: &[&str] = &["a", "a.b", "b", "c"];
const PACKAGES: &[&str] = &["a", "a.b", "a.b.c", "ab", "b.x", "c", "d"];
const JARS: &[&str] = &["x.jar", "y.jar", "z.jar", "w.jar"];
const COORDINATES: &[&str] = &["org:x", "org:y", "org:z"];

fn entry() -> impl Strategy<Value = ClasspathEntry> {
    (
        prop::sample::select(JARS),
        prop::option::of(prop::sample::select(COORDINATES)),
    )
        .prop_map(|(path, coordinate)| match coordinate {
            Some(coordinate) => ClasspathEntry::with_coordinate(path, coordinate),
            None => ClasspathEntry::new(path),
        })
}

fn identity(entry: &ClasspathEntry) -> String {
    match &entry.coordinate {
        Some(coordinate) => format!("coordinate {}", coordinate),
        None => format!("path {}", entry.path.display()),
    }
}

/// Producer entries lead, identities are unique, and nothing from either side is lost.
#[test]
fn test_classpath_merge_properties() {
    let mut runner = TestRunner::default();
    let strategy = (
        prop::collection::vec(entry(), 0..6),
        prop::collection::vec(entry(), 0..6),
    );

    runner
        .run(&strategy, |(producer, consumer)| {
            let merged = merge_classpath(&producer, &consumer);

            let identities: Vec<String> = merged.iter().map(identity).collect();
            let unique: HashSet<&String> = identities.iter().collect();
            prop_assert_eq!(unique.len(), identities.len());

            let mut seen = HashSet::new();
            let producer_firsts: Vec<&ClasspathEntry> =
                producer.iter().filter(|e| seen.insert(identity(e))).collect();
            prop_assert!(merged.len() >= producer_firsts.len());
            for (merged_entry, producer_entry) in merged.iter().zip(&producer_firsts) {
                prop_assert_eq!(merged_entry, *producer_entry);
            }

            for entry in producer.iter().chain(&consumer) {
                prop_assert!(identities.contains(&identity(entry)));
            }
            Ok(())
        })
        .unwrap();
}

fn defaults() -> EffectivePackageOptions {
    EffectivePackageOptions {
        suppress: false,
        documented_visibilities: [Visibility::Public].into_iter().collect(),
        skip_deprecated: false,
        report_undocumented: false,
    }
}

/// The first rule covering a package decides; later rules never do.
#[test]
fn test_first_matching_package_rule_wins() {
    let mut runner = TestRunner::default();
    let strategy = (
        prop::collection::vec((prop::sample::select(PREFIXES), any::<bool>()), 0..5),
        prop::sample::select(PACKAGES),
    );

    runner
        .run(&strategy, |(rules, package)| {
            let options: Vec<PackageOptions> = rules
                .iter()
                .map(|(prefix, suppress)| {
                    let pattern = format!("{}(\\..*)?", prefix.replace('.', "\\."));
                    PackageOptions::matching(pattern).suppress(*suppress)
                })
                .collect();
            let matcher = PackageMatcher::compile("main/jvm", &options, defaults()).unwrap();

            let expected = rules
                .iter()
                .find(|(prefix, _)| {
                    package == *prefix || package.starts_with(&format!("{}.", prefix))
                })
                .map_or(false, |(_, suppress)| *suppress);
            let effective = matcher.options_for(package);
            prop_assert_eq!(effective.suppress, expected);
            prop_assert_eq!(effective.documented_visibilities, defaults().documented_visibilities);
            Ok(())
        })
        .unwrap();
}

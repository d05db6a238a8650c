//! Classpath entries and coordinate-aware merging

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// One classpath element, optionally tagged with its artifact coordinate.
///
/// The coordinate is stored as `group:name` (any version suffix is dropped) and is
/// the identity used when two classpaths overlap. Entries without a coordinate are
/// identified by path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "ClasspathRepr")]
pub struct ClasspathEntry {
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinate: Option<String>,
}

/// Accepts either a bare path or a `{ path, coordinate }` table.
#[derive(Deserialize)]
#[serde(untagged)]
enum ClasspathRepr {
    Path(PathBuf),
    Entry {
        path: PathBuf,
        #[serde(default)]
        coordinate: Option<String>,
    },
}

impl From<ClasspathRepr> for ClasspathEntry {
    fn from(repr: ClasspathRepr) -> Self {
        match repr {
            ClasspathRepr::Path(path) => ClasspathEntry::new(path),
            ClasspathRepr::Entry { path, coordinate } => match coordinate {
                Some(coordinate) => ClasspathEntry::with_coordinate(path, &coordinate),
                None => ClasspathEntry::new(path),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum EntryKey<'a> {
    Coordinate(&'a str),
    Path(&'a Path),
}

impl ClasspathEntry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            coordinate: None,
        }
    }

    /// `coordinate` may be `group:name` or `group:name:version[:classifier]`.
    pub fn with_coordinate(path: impl Into<PathBuf>, coordinate: &str) -> Self {
        let unversioned: Vec<&str> = coordinate.split(':').take(2).collect();
        Self {
            path: path.into(),
            coordinate: Some(unversioned.join(":")),
        }
    }

    fn key(&self) -> EntryKey<'_> {
        match &self.coordinate {
            Some(coordinate) => EntryKey::Coordinate(coordinate),
            None => EntryKey::Path(&self.path),
        }
    }
}

/// Drop repeated entries, keeping the first occurrence of each identity.
pub fn dedup_classpath<I>(entries: I) -> Vec<ClasspathEntry>
where
    I: IntoIterator<Item = ClasspathEntry>,
{
    let mut out: Vec<ClasspathEntry> = Vec::new();
    for entry in entries {
        if !out.iter().any(|existing| existing.key() == entry.key()) {
            out.push(entry);
        }
    }
    out
}

/// Merge a producer classpath into a consumer classpath.
///
/// Producer entries come first. A consumer entry whose identity is already provided
/// by the producer is dropped, so the producer's artifact wins on overlap.
pub fn merge_classpath(
    producer: &[ClasspathEntry],
    consumer: &[ClasspathEntry],
) -> Vec<ClasspathEntry> {
    let mut merged = dedup_classpath(producer.iter().cloned());
    let seen: HashSet<EntryKey<'_>> = producer.iter().map(ClasspathEntry::key).collect();
    let consumer_only: Vec<ClasspathEntry> = consumer
        .iter()
        .filter(|entry| !seen.contains(&entry.key()))
        .cloned()
        .collect();
    merged.extend(dedup_classpath(consumer_only));
    merged
}

//! Aggregation
//!
//! Merges resolved modules into one [`GlobalConfiguration`]: the configuration the
//! renderer consumes. Source sets are keyed by id, so the serialized form depends
//! only on the set of inputs and never on the order modules were resolved in.

use crate::error::{ConfigurationError, StorageError};
use crate::parameters::{
    dedup_classpath, ClasspathEntry, FailurePolicy, OutputFormat, SourceSetId, SourceSetSpec,
};
use crate::resolve::{Resolution, ResolvedModule};
use crate::types::ModuleId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

pub const CONFIGURATION_FORMAT_VERSION: u32 = 1;

/// Material identifying the producer of a configuration, folded into fingerprints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheKey {
    pub format_version: u32,
    pub generator: String,
}

impl Default for CacheKey {
    fn default() -> Self {
        Self {
            format_version: CONFIGURATION_FORMAT_VERSION,
            generator: concat!("docweave ", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// The merged configuration for one generation unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfiguration {
    pub module_name: String,
    pub output_format: OutputFormat,
    #[serde(with = "source_set_map")]
    pub source_sets: BTreeMap<SourceSetId, SourceSetSpec>,
    pub plugins_classpath: Vec<ClasspathEntry>,
    pub failure_policy: FailurePolicy,
    pub suppress_inherited_members: bool,
    pub suppress_obvious_functions: bool,
    /// Modules merged into this configuration, sorted.
    pub modules: Vec<ModuleId>,
    pub cache_key: CacheKey,
}

impl GlobalConfiguration {
    /// Canonical serialized form; identical inputs give identical bytes.
    pub fn to_json(&self) -> Result<Vec<u8>, StorageError> {
        serde_json::to_vec_pretty(self).map_err(|e| StorageError::Serialization {
            what: format!("configuration for {}", self.module_name),
            message: e.to_string(),
        })
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, StorageError> {
        serde_json::from_slice(bytes).map_err(|e| StorageError::Serialization {
            what: "configuration".to_string(),
            message: e.to_string(),
        })
    }

    pub fn source_set(&self, id: &SourceSetId) -> Option<&SourceSetSpec> {
        self.source_sets.get(id)
    }

    /// Source sets that are not suppressed, in id order.
    pub fn documented_source_sets(&self) -> impl Iterator<Item = &SourceSetSpec> {
        self.source_sets.values().filter(|spec| !spec.suppress)
    }
}

/// Serializes the id-keyed map as a sequence of specs in id order; the id is
/// already part of each spec.
mod source_set_map {
    use super::{SourceSetId, SourceSetSpec};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S>(
        map: &BTreeMap<SourceSetId, SourceSetSpec>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(map.values())
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<BTreeMap<SourceSetId, SourceSetSpec>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let specs = Vec::<SourceSetSpec>::deserialize(deserializer)?;
        let mut map = BTreeMap::new();
        for spec in specs {
            if let Some(existing) = map.insert(spec.id.clone(), spec) {
                return Err(D::Error::custom(format!("duplicate source set {}", existing.id)));
            }
        }
        Ok(map)
    }
}

pub struct Aggregator;

impl Aggregator {
    /// Merge `modules` into one configuration.
    ///
    /// Global settings come from `root` when it is among the modules, otherwise
    /// from the module with the smallest id. Fails on the first source set id
    /// declared by two modules.
    pub fn aggregate<'a, I>(
        modules: I,
        root: Option<&ModuleId>,
    ) -> Result<GlobalConfiguration, ConfigurationError>
    where
        I: IntoIterator<Item = &'a ResolvedModule>,
    {
        let mut modules: Vec<&ResolvedModule> = modules.into_iter().collect();
        modules.sort_by(|a, b| a.id().cmp(b.id()));
        modules.dedup_by(|a, b| a.id() == b.id());

        let mut owners: BTreeMap<SourceSetId, ModuleId> = BTreeMap::new();
        let mut source_sets: BTreeMap<SourceSetId, SourceSetSpec> = BTreeMap::new();
        for module in &modules {
            for spec in &module.parameters.source_sets {
                if let Some(first) = owners.get(&spec.id) {
                    return Err(ConfigurationError::DuplicateSourceSetId {
                        id: spec.id.clone(),
                        first: first.clone(),
                        second: module.id().clone(),
                    });
                }
                owners.insert(spec.id.clone(), module.id().clone());
                source_sets.insert(spec.id.clone(), spec.clone());
            }
        }

        let plugins_classpath = dedup_classpath(
            modules
                .iter()
                .flat_map(|module| module.parameters.plugins_classpath.iter().cloned()),
        );

        let settings = root
            .and_then(|root| modules.iter().find(|module| module.id() == root))
            .or_else(|| modules.first())
            .map(|module| &module.parameters);

        let configuration = GlobalConfiguration {
            module_name: settings
                .map(|p| p.module_id.to_string())
                .unwrap_or_default(),
            output_format: settings.map(|p| p.output_format).unwrap_or_default(),
            source_sets,
            plugins_classpath,
            failure_policy: settings.map(|p| p.failure_policy).unwrap_or_default(),
            suppress_inherited_members: settings.is_some_and(|p| p.suppress_inherited_members),
            suppress_obvious_functions: settings.map_or(true, |p| p.suppress_obvious_functions),
            modules: modules.iter().map(|m| m.id().clone()).collect(),
            cache_key: CacheKey::default(),
        };

        debug!(
            module = %configuration.module_name,
            modules = configuration.modules.len(),
            source_sets = configuration.source_sets.len(),
            "Aggregated configuration"
        );
        Ok(configuration)
    }

    /// Configuration for `root` and every module it transitively consumes.
    pub fn aggregate_unit(
        resolution: &Resolution,
        root: &ModuleId,
    ) -> Result<GlobalConfiguration, ConfigurationError> {
        Self::aggregate(resolution.unit(root), Some(root))
    }

    /// Configuration covering every module of the run.
    pub fn aggregate_all(
        resolution: &Resolution,
    ) -> Result<GlobalConfiguration, ConfigurationError> {
        Self::aggregate(resolution.modules(), None)
    }
}

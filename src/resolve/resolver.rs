//! Cross-module resolution
//!
//! Turns the declared modules into fully connected parameters: consumption edges
//! are checked against the producer registry, cycles are rejected, classpaths of
//! producers are merged into their consumers in topological order, and every
//! dependent source set reference is checked against the ids the module can see.

use crate::error::ConfigurationError;
use crate::parameters::{
    dedup_classpath, merge_classpath, ModuleDependency, ModuleParameters, SourceSetId,
};
use crate::resolve::graph::ModuleGraph;
use crate::resolve::registry::{ProducerKind, ProducerRegistry};
use crate::types::ModuleId;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// A module after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    /// Own source sets, with producer classpaths merged in.
    pub parameters: ModuleParameters,
    /// Direct producers in declaration order.
    pub producers: Vec<ModuleId>,
    /// Ids of every source set this module can see but does not own.
    pub consumed_source_sets: BTreeSet<SourceSetId>,
    pub kind: ProducerKind,
}

impl ResolvedModule {
    pub fn id(&self) -> &ModuleId {
        &self.parameters.module_id
    }

    pub fn is_external(&self) -> bool {
        matches!(self.kind, ProducerKind::External { .. })
    }
}

/// Output of [`CrossModuleResolver::resolve`].
#[derive(Debug, Clone)]
pub struct Resolution {
    modules: BTreeMap<ModuleId, ResolvedModule>,
    graph: ModuleGraph,
}

impl Resolution {
    pub fn get(&self, module: &ModuleId) -> Option<&ResolvedModule> {
        self.modules.get(module)
    }

    /// All modules, sorted by id.
    pub fn modules(&self) -> impl Iterator<Item = &ResolvedModule> {
        self.modules.values()
    }

    /// Modules configured in this run, sorted by id.
    pub fn in_run_modules(&self) -> impl Iterator<Item = &ResolvedModule> {
        self.modules.values().filter(|module| !module.is_external())
    }

    pub fn graph(&self) -> &ModuleGraph {
        &self.graph
    }

    /// `root` and everything it transitively consumes, sorted by id.
    pub fn unit(&self, root: &ModuleId) -> Vec<&ResolvedModule> {
        self.graph
            .reachable_from(root)
            .iter()
            .filter_map(|module| self.modules.get(module))
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct CrossModuleResolver {
    registry: ProducerRegistry,
}

impl CrossModuleResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a whole run. Modules are processed in the order given, which is the
    /// discovery order used to report the first cycle.
    pub fn resolve(modules: Vec<ModuleParameters>) -> Result<Resolution, ConfigurationError> {
        let mut resolver = Self::new();
        let order: Vec<ModuleId> = modules.iter().map(|m| m.module_id.clone()).collect();
        for module in modules {
            module.validate()?;
            resolver.registry.register(module)?;
        }
        resolver.connect(&order)
    }

    fn connect(mut self, discovery_order: &[ModuleId]) -> Result<Resolution, ConfigurationError> {
        let mut graph = ModuleGraph::new();
        for consumer in discovery_order {
            graph.add_module(consumer);
            let dependencies = self
                .registry
                .get(consumer)
                .map(|module| module.consumes.clone())
                .unwrap_or_default();
            for dependency in &dependencies {
                match dependency {
                    ModuleDependency::InRun { module } => {
                        if !self.registry.is_in_run(module) {
                            return Err(ConfigurationError::UnresolvedDependency {
                                consumer: consumer.clone(),
                                target: module.clone(),
                                reason: "no module with this id is part of the run".to_string(),
                            });
                        }
                    }
                    ModuleDependency::External { module, artifact } => {
                        self.registry.load_external(consumer, module, artifact)?;
                    }
                }
                graph.add_edge(consumer, dependency.module());
            }
        }

        let order = graph.topological_order()?;
        let mut parts = self.registry.into_parts();
        let mut resolved: BTreeMap<ModuleId, ResolvedModule> = BTreeMap::new();

        for module_id in &order {
            let Some((kind, parameters)) = parts.remove(module_id) else {
                continue;
            };
            let module = match kind {
                // Published parameters already carry their producers' classpaths.
                ProducerKind::External { .. } => ResolvedModule {
                    parameters,
                    producers: Vec::new(),
                    consumed_source_sets: BTreeSet::new(),
                    kind,
                },
                ProducerKind::InRun => {
                    resolve_in_run(parameters, graph.producers(module_id), &resolved)?
                }
            };
            resolved.insert(module_id.clone(), module);
        }

        info!(
            modules = resolved.len(),
            external = resolved.values().filter(|m| m.is_external()).count(),
            "Resolved module graph"
        );
        Ok(Resolution {
            modules: resolved,
            graph,
        })
    }
}

fn resolve_in_run(
    mut parameters: ModuleParameters,
    producers: &[ModuleId],
    resolved: &BTreeMap<ModuleId, ResolvedModule>,
) -> Result<ResolvedModule, ConfigurationError> {
    let mut producer_classpath = Vec::new();
    let mut consumed_source_sets = BTreeSet::new();
    for producer in producers {
        // Topological order guarantees producers are resolved first.
        let Some(producer) = resolved.get(producer) else {
            continue;
        };
        producer_classpath.extend(producer.parameters.runtime_classpath());
        consumed_source_sets.extend(producer.parameters.source_set_ids().cloned());
        consumed_source_sets.extend(producer.consumed_source_sets.iter().cloned());
    }
    let producer_classpath = dedup_classpath(producer_classpath);

    let own: BTreeSet<SourceSetId> = parameters.source_set_ids().cloned().collect();
    for spec in &mut parameters.source_sets {
        for target in &spec.dependent_source_sets {
            if !own.contains(target) && !consumed_source_sets.contains(target) {
                return Err(ConfigurationError::UnresolvedSourceSet {
                    module: parameters.module_id.clone(),
                    source_set: spec.id.clone(),
                    target: target.clone(),
                });
            }
        }
        if !producer_classpath.is_empty() {
            spec.classpath = merge_classpath(&producer_classpath, &spec.classpath);
        }
    }

    debug!(
        module = %parameters.module_id,
        producers = producers.len(),
        consumed_source_sets = consumed_source_sets.len(),
        "Resolved module"
    );
    Ok(ResolvedModule {
        parameters,
        producers: producers.to_vec(),
        consumed_source_sets,
        kind: ProducerKind::InRun,
    })
}

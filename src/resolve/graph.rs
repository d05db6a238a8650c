//! Module consumption graph
//!
//! Nodes are modules, edges point from a consumer to the producers it consumes.
//! The graph is built once per run and discarded afterwards.

use crate::error::ConfigurationError;
use crate::types::ModuleId;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    /// Discovery order
    order: Vec<ModuleId>,
    producers: HashMap<ModuleId, Vec<ModuleId>>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node; adding an existing module is a no-op.
    pub fn add_module(&mut self, module: &ModuleId) {
        if !self.producers.contains_key(module) {
            self.order.push(module.clone());
            self.producers.insert(module.clone(), Vec::new());
        }
    }

    /// Record that `consumer` consumes `producer`. Both nodes are added if absent.
    pub fn add_edge(&mut self, consumer: &ModuleId, producer: &ModuleId) {
        self.add_module(consumer);
        self.add_module(producer);
        if let Some(edges) = self.producers.get_mut(consumer) {
            if !edges.contains(producer) {
                edges.push(producer.clone());
            }
        }
    }

    pub fn contains(&self, module: &ModuleId) -> bool {
        self.producers.contains_key(module)
    }

    pub fn modules(&self) -> &[ModuleId] {
        &self.order
    }

    pub fn producers(&self, module: &ModuleId) -> &[ModuleId] {
        self.producers.get(module).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Depth-first search with a visiting set; the first cycle found is reported
    /// with the modules along it, starting and ending at the same module.
    pub fn check_acyclic(&self) -> Result<(), ConfigurationError> {
        self.topological_order().map(|_| ())
    }

    /// Producers before consumers; ties follow discovery order.
    pub fn topological_order(&self) -> Result<Vec<ModuleId>, ConfigurationError> {
        let mut done: HashSet<&ModuleId> = HashSet::new();
        let mut visiting: Vec<&ModuleId> = Vec::new();
        let mut order = Vec::with_capacity(self.order.len());
        for module in &self.order {
            self.visit(module, &mut visiting, &mut done, &mut order)?;
        }
        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        module: &'a ModuleId,
        visiting: &mut Vec<&'a ModuleId>,
        done: &mut HashSet<&'a ModuleId>,
        order: &mut Vec<ModuleId>,
    ) -> Result<(), ConfigurationError> {
        if done.contains(module) {
            return Ok(());
        }
        if let Some(start) = visiting.iter().position(|m| *m == module) {
            let mut cycle: Vec<ModuleId> = visiting[start..].iter().map(|m| (*m).clone()).collect();
            cycle.push(module.clone());
            return Err(ConfigurationError::CyclicModuleDependency { cycle });
        }

        visiting.push(module);
        for producer in self.producers(module) {
            self.visit(producer, visiting, done, order)?;
        }
        visiting.pop();

        done.insert(module);
        order.push(module.clone());
        Ok(())
    }

    /// Group modules into levels: every producer sits in a lower level than each of
    /// its consumers, so a level's modules can run concurrently.
    pub fn levels(&self) -> Result<Vec<Vec<ModuleId>>, ConfigurationError> {
        let order = self.topological_order()?;
        let mut depth: HashMap<&ModuleId, usize> = HashMap::new();
        let mut levels: BTreeMap<usize, Vec<ModuleId>> = BTreeMap::new();
        for module in &order {
            let level = self
                .producers(module)
                .iter()
                .filter_map(|producer| depth.get(producer))
                .map(|d| d + 1)
                .max()
                .unwrap_or(0);
            depth.insert(module, level);
            levels.entry(level).or_default().push(module.clone());
        }
        Ok(levels.into_values().collect())
    }

    /// `root` plus every module it transitively consumes.
    pub fn reachable_from(&self, root: &ModuleId) -> BTreeSet<ModuleId> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![root.clone()];
        while let Some(module) = stack.pop() {
            if seen.insert(module.clone()) {
                stack.extend(self.producers(&module).iter().cloned());
            }
        }
        seen
    }
}

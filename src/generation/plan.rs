use crate::aggregate::Aggregator;
use crate::error::ApiError;
use crate::generation::driver::GenerationUnit;
use crate::resolve::Resolution;
use crate::types::ModuleId;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Generation units grouped by level. Every unit's producers sit in an earlier
/// level; units within a level are independent.
#[derive(Debug, Clone)]
pub struct GenerationPlan {
    pub levels: Vec<Vec<GenerationUnit>>,
    pub total_units: usize,
}

impl GenerationPlan {
    /// One unit per module configured in this run, output at
    /// `{output_root}/{module}`. Published modules are inputs only.
    pub fn build(resolution: &Resolution, output_root: &Path) -> Result<Self, ApiError> {
        let mut levels = Vec::new();
        for level in resolution.graph().levels()? {
            let mut units = Vec::new();
            for module in level {
                let Some(resolved) = resolution.get(&module) else {
                    continue;
                };
                if resolved.is_external() {
                    continue;
                }
                units.push(GenerationUnit {
                    configuration: Aggregator::aggregate_unit(resolution, &module)?,
                    output_dir: output_root.join(module.file_stem()),
                    module,
                });
            }
            if !units.is_empty() {
                units.sort_by(|a, b| a.module.cmp(&b.module));
                levels.push(units);
            }
        }
        let total_units = levels.iter().map(Vec::len).sum();
        let plan = Self { levels, total_units };
        plan.validate()?;
        Ok(plan)
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.levels.iter().any(|level| level.is_empty()) {
            return Err(ApiError::ConfigError(
                "Generation plan contains an empty level".to_string(),
            ));
        }
        let computed_units: usize = self.levels.iter().map(Vec::len).sum();
        if self.total_units != computed_units {
            return Err(ApiError::ConfigError(format!(
                "Generation plan total_units mismatch: expected {}, got {}",
                computed_units, self.total_units
            )));
        }
        let mut seen = HashSet::new();
        let mut outputs: HashMap<&Path, &ModuleId> = HashMap::new();
        for unit in self.levels.iter().flatten() {
            if !seen.insert(&unit.module) {
                return Err(ApiError::ConfigError(format!(
                    "Generation plan lists module {} twice",
                    unit.module
                )));
            }
            if let Some(other) = outputs.insert(&unit.output_dir, &unit.module) {
                return Err(ApiError::ConfigError(format!(
                    "Modules {} and {} share output directory {}",
                    other,
                    unit.module,
                    unit.output_dir.display()
                )));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.total_units == 0
    }

    pub fn units(&self) -> impl Iterator<Item = &GenerationUnit> {
        self.levels.iter().flatten()
    }
}

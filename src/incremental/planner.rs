//! Per-module generation decisions

use crate::aggregate::GlobalConfiguration;
use crate::error::StorageError;
use crate::incremental::cache::BuildCache;
use crate::incremental::fingerprint::{fingerprint_configuration, Fingerprint};
use crate::incremental::state::{IncrementalState, IncrementalStateStore};
use crate::types::ModuleId;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum PlanDecision {
    /// Stored fingerprint matches and the output is still in place.
    UpToDate,
    /// The build cache holds output for this fingerprint.
    RestoreFromCache,
    Generate { reason: GenerateReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerateReason {
    NoPreviousState,
    InputsChanged,
    OutputMissing,
    OutputRelocated,
}

impl fmt::Display for GenerateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            GenerateReason::NoPreviousState => "no previous state",
            GenerateReason::InputsChanged => "inputs changed",
            GenerateReason::OutputMissing => "output missing",
            GenerateReason::OutputRelocated => "output directory changed",
        };
        f.write_str(reason)
    }
}

impl fmt::Display for PlanDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanDecision::UpToDate => f.write_str("up-to-date"),
            PlanDecision::RestoreFromCache => f.write_str("restore from cache"),
            PlanDecision::Generate { reason } => write!(f, "generate ({})", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncrementalPlan {
    pub module: ModuleId,
    pub fingerprint: Fingerprint,
    #[serde(flatten)]
    pub decision: PlanDecision,
}

impl IncrementalPlan {
    pub fn needs_engine(&self) -> bool {
        matches!(self.decision, PlanDecision::Generate { .. })
    }
}

pub struct Planner<'a, S: IncrementalStateStore> {
    store: &'a S,
    cache: &'a BuildCache,
}

impl<'a, S: IncrementalStateStore> Planner<'a, S> {
    pub fn new(store: &'a S, cache: &'a BuildCache) -> Self {
        Self { store, cache }
    }

    /// Decide what `module` needs given its configuration and target output directory.
    pub fn plan(
        &self,
        module: &ModuleId,
        configuration: &GlobalConfiguration,
        output_dir: &Path,
    ) -> Result<IncrementalPlan, StorageError> {
        let fingerprint = fingerprint_configuration(configuration)?;
        let previous = self.store.get(module)?;

        let reason = match &previous {
            None => GenerateReason::NoPreviousState,
            Some(state) if state.fingerprint != fingerprint => GenerateReason::InputsChanged,
            Some(state) if state.output_dir != output_dir => GenerateReason::OutputRelocated,
            Some(_) if !output_dir.is_dir() => GenerateReason::OutputMissing,
            Some(_) => {
                debug!(module = %module, fingerprint = %fingerprint, "Module is up to date");
                return Ok(IncrementalPlan {
                    module: module.clone(),
                    fingerprint,
                    decision: PlanDecision::UpToDate,
                });
            }
        };

        let decision = if self.cache.contains(&fingerprint) {
            PlanDecision::RestoreFromCache
        } else {
            PlanDecision::Generate { reason }
        };
        debug!(
            module = %module,
            fingerprint = %fingerprint,
            decision = %decision,
            "Planned module"
        );

        Ok(IncrementalPlan {
            module: module.clone(),
            fingerprint,
            decision,
        })
    }

    /// Persist the fingerprint of a promoted output.
    pub fn record_success(
        &self,
        plan: &IncrementalPlan,
        output_dir: &Path,
    ) -> Result<(), StorageError> {
        self.store
            .put(&plan.module, &IncrementalState::new(plan.fingerprint, output_dir))
    }
}

//! Generation executor: runs a generation plan level by level through a driver.
//! Units within a level render concurrently; a level starts once the previous one has drained.

use crate::error::{ApiError, GenerationError};
use crate::generation::driver::{GenerationDriver, GenerationReport, GenerationUnit};
use crate::generation::engine::{CancelSignal, Engine};
use crate::generation::plan::GenerationPlan;
use crate::incremental::IncrementalStateStore;
use crate::types::ModuleId;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ModuleOutcome {
    Succeeded(GenerationReport),
    /// `fatal` is false when the module's failure policy disables failOnError.
    Failed { error: String, fatal: bool },
    NotRun,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub outcomes: BTreeMap<ModuleId, ModuleOutcome>,
}

impl RunReport {
    /// No fatal failure and nothing skipped.
    pub fn is_success(&self) -> bool {
        self.outcomes.values().all(|outcome| match outcome {
            ModuleOutcome::Succeeded(_) => true,
            ModuleOutcome::Failed { fatal, .. } => !fatal,
            ModuleOutcome::NotRun => false,
        })
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &GenerationReport> {
        self.outcomes.values().filter_map(|outcome| match outcome {
            ModuleOutcome::Succeeded(report) => Some(report),
            _ => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = (&ModuleId, &str)> {
        self.outcomes.iter().filter_map(|(module, outcome)| match outcome {
            ModuleOutcome::Failed { error, .. } => Some((module, error.as_str())),
            _ => None,
        })
    }

    pub fn not_run(&self) -> impl Iterator<Item = &ModuleId> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, ModuleOutcome::NotRun))
            .map(|(module, _)| module)
    }

    pub fn outcome(&self, module: &ModuleId) -> Option<&ModuleOutcome> {
        self.outcomes.get(module)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GenerationExecutor {
    fail_fast: bool,
}

impl GenerationExecutor {
    pub fn new(fail_fast: bool) -> Self {
        Self { fail_fast }
    }

    pub async fn execute<E, S>(
        &self,
        driver: &GenerationDriver<E, S>,
        plan: &GenerationPlan,
        cancel: CancelSignal,
    ) -> Result<RunReport, ApiError>
    where
        E: Engine,
        S: IncrementalStateStore,
    {
        plan.validate()?;
        let mut report = RunReport::default();
        let mut stopped = false;

        info!(levels = plan.levels.len(), units = plan.total_units, "Generation started");

        for (level_index, units) in plan.levels.iter().enumerate() {
            if stopped || cancel.is_cancelled() {
                for unit in units {
                    report.outcomes.insert(unit.module.clone(), ModuleOutcome::NotRun);
                }
                continue;
            }

            let mut futures = FuturesUnordered::new();
            for unit in units {
                let signal = cancel.clone();
                futures.push(async move { (unit, driver.generate(unit, signal).await) });
            }

            let mut failed_count = 0usize;
            while let Some((unit, result)) = futures.next().await {
                let outcome = match result {
                    Ok(generated) => ModuleOutcome::Succeeded(generated),
                    Err(err) => {
                        failed_count += 1;
                        let fatal = is_fatal(unit, &err);
                        if fatal {
                            error!(module = %unit.module, error = %err, "Generation failed");
                            stopped |= self.fail_fast;
                        } else {
                            warn!(
                                module = %unit.module,
                                error = %err,
                                "Generation failed (failOnError disabled)"
                            );
                        }
                        ModuleOutcome::Failed {
                            error: err.to_string(),
                            fatal,
                        }
                    }
                };
                report.outcomes.insert(unit.module.clone(), outcome);
            }

            info!(
                level = level_index,
                total = units.len(),
                failed = failed_count,
                "Level completed"
            );
        }

        let not_run = report.not_run().count();
        if not_run > 0 {
            warn!(not_run, "Generation stopped before every module ran");
        }
        Ok(report)
    }
}

fn is_fatal(unit: &GenerationUnit, err: &GenerationError) -> bool {
    match err {
        GenerationError::Cancelled { .. } | GenerationError::Storage { .. } => true,
        _ => unit.configuration.failure_policy.fail_on_error,
    }
}

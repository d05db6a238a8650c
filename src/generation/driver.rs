//! Generation driver
//!
//! Runs one generation unit end to end: plan, render into a staging directory,
//! classify the result, then promote the staging output over the previous output.
//! A failed or cancelled unit leaves the previous output and the recorded
//! fingerprint exactly as they were.

use crate::aggregate::GlobalConfiguration;
use crate::error::{GenerationError, StorageError};
use crate::generation::engine::{
    CancelSignal, Diagnostics, Engine, EngineReport, EngineRequest, ExitState,
};
use crate::incremental::{
    BuildCache, Fingerprint, IncrementalPlan, IncrementalStateStore, PlanDecision, Planner,
};
use crate::types::ModuleId;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const CONFIGURATION_FILE: &str = "configuration.json";
pub const ENGINE_LOG_FILE: &str = "engine.log";

/// One renderer invocation: a module, the configuration aggregated for it, and
/// where its output goes.
#[derive(Debug, Clone)]
pub struct GenerationUnit {
    pub module: ModuleId,
    pub configuration: GlobalConfiguration,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportKind {
    UpToDate,
    RestoredFromCache,
    Rendered { diagnostics: Diagnostics },
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub module: ModuleId,
    pub fingerprint: Fingerprint,
    #[serde(flatten)]
    pub kind: ReportKind,
    pub log_path: Option<PathBuf>,
}

pub struct GenerationDriver<E: Engine, S: IncrementalStateStore> {
    engine: E,
    store: S,
    cache: BuildCache,
    work_dir: PathBuf,
}

impl<E: Engine, S: IncrementalStateStore> GenerationDriver<E, S> {
    pub fn new(engine: E, store: S, cache: BuildCache, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            store,
            cache,
            work_dir: work_dir.into(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &BuildCache {
        &self.cache
    }

    /// `{work}/{module}`
    pub fn module_work_dir(&self, module: &ModuleId) -> PathBuf {
        self.work_dir.join(module.file_stem())
    }

    pub fn plan(&self, unit: &GenerationUnit) -> Result<IncrementalPlan, GenerationError> {
        Planner::new(&self.store, &self.cache)
            .plan(&unit.module, &unit.configuration, &unit.output_dir)
            .map_err(|source| storage(&unit.module, source))
    }

    pub async fn generate(
        &self,
        unit: &GenerationUnit,
        cancel: CancelSignal,
    ) -> Result<GenerationReport, GenerationError> {
        let module = &unit.module;
        let plan = self.plan(unit)?;
        let planner = Planner::new(&self.store, &self.cache);

        match &plan.decision {
            PlanDecision::UpToDate => {
                return Ok(GenerationReport {
                    module: module.clone(),
                    fingerprint: plan.fingerprint,
                    kind: ReportKind::UpToDate,
                    log_path: None,
                });
            }
            PlanDecision::RestoreFromCache => {
                let staging = sibling(&unit.output_dir, "staging");
                let restored = clear_dir(&staging)
                    .and_then(|()| self.cache.restore(&plan.fingerprint, &staging))
                    .and_then(|restored| {
                        if restored {
                            promote(&staging, &unit.output_dir)?;
                        }
                        Ok(restored)
                    });
                match restored {
                    Ok(true) => {
                        planner
                            .record_success(&plan, &unit.output_dir)
                            .map_err(|source| storage(module, source))?;
                        info!(
                            module = %module,
                            fingerprint = %plan.fingerprint,
                            "Restored output from cache"
                        );
                        return Ok(GenerationReport {
                            module: module.clone(),
                            fingerprint: plan.fingerprint,
                            kind: ReportKind::RestoredFromCache,
                            log_path: None,
                        });
                    }
                    Ok(false) => debug!(module = %module, "Cache entry vanished, rendering"),
                    Err(e) => {
                        let _ = fs::remove_dir_all(&staging);
                        warn!(module = %module, error = %e, "Cache restore failed, rendering");
                    }
                }
            }
            PlanDecision::Generate { reason } => {
                debug!(module = %module, reason = %reason, "Rendering module");
            }
        }

        let (request, staging) = self
            .prepare(unit)
            .map_err(|source| storage(module, source))?;

        let report = match self.engine.render(&request, cancel).await {
            Ok(report) => report,
            Err(err) => {
                discard(&staging);
                return Err(err);
            }
        };

        if let Err(err) = classify(module, &unit.configuration, &report) {
            discard(&staging);
            return Err(err);
        }

        promote(&staging, &unit.output_dir).map_err(|source| {
            discard(&staging);
            storage(module, source)
        })?;
        if let Err(e) = self.cache.store(&plan.fingerprint, &unit.output_dir) {
            warn!(module = %module, error = %e, "Failed to store output in build cache");
        }
        planner
            .record_success(&plan, &unit.output_dir)
            .map_err(|source| storage(module, source))?;

        info!(
            module = %module,
            fingerprint = %plan.fingerprint,
            warnings = report.diagnostics.warnings,
            output = %unit.output_dir.display(),
            "Generated documentation"
        );
        Ok(GenerationReport {
            module: module.clone(),
            fingerprint: plan.fingerprint,
            kind: ReportKind::Rendered {
                diagnostics: report.diagnostics,
            },
            log_path: Some(request.log_path),
        })
    }

    /// Write the configuration file and create an empty staging directory.
    fn prepare(&self, unit: &GenerationUnit) -> Result<(EngineRequest, PathBuf), StorageError> {
        let work = self.module_work_dir(&unit.module);
        fs::create_dir_all(&work)?;
        let configuration_path = work.join(CONFIGURATION_FILE);
        fs::write(&configuration_path, unit.configuration.to_json()?)?;

        let staging = sibling(&unit.output_dir, "staging");
        clear_dir(&staging)?;
        fs::create_dir_all(&staging)?;

        Ok((
            EngineRequest {
                module: unit.module.clone(),
                configuration_path,
                output_dir: staging.clone(),
                log_path: work.join(ENGINE_LOG_FILE),
            },
            staging,
        ))
    }
}

/// Map a finished render onto success or the matching per-module error.
pub fn classify(
    module: &ModuleId,
    configuration: &GlobalConfiguration,
    report: &EngineReport,
) -> Result<(), GenerationError> {
    match &report.exit {
        ExitState::Cancelled => Err(GenerationError::Cancelled { module: module.clone() }),
        ExitState::Failed { status } => Err(GenerationError::EngineFailed {
            module: module.clone(),
            status: status.clone(),
        }),
        ExitState::Success if report.diagnostics.errors > 0 => Err(GenerationError::EngineErrors {
            module: module.clone(),
            count: report.diagnostics.errors,
        }),
        ExitState::Success
            if configuration.failure_policy.fail_on_warning && report.diagnostics.warnings > 0 =>
        {
            Err(GenerationError::WarningsAsErrors {
                module: module.clone(),
                count: report.diagnostics.warnings,
            })
        }
        ExitState::Success => Ok(()),
    }
}

/// Replace `output` with `staging`. The previous output is renamed aside first and
/// put back if the second rename fails.
///
/// A `.previous` directory left by a failed rollback is only removed once `output`
/// exists again, so it is never the last copy.
pub fn promote(staging: &Path, output: &Path) -> Result<(), StorageError> {
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    let previous = sibling(output, "previous");
    if previous.exists() && !output.exists() {
        warn!(path = %previous.display(), "Restoring output left aside by an earlier promotion");
        fs::rename(&previous, output)?;
    }
    clear_dir(&previous)?;

    let had_output = output.exists();
    if had_output {
        fs::rename(output, &previous)?;
    }
    if let Err(e) = fs::rename(staging, output) {
        if had_output {
            if let Err(rollback) = fs::rename(&previous, output) {
                warn!(
                    path = %previous.display(),
                    error = %rollback,
                    "Failed to put previous output back"
                );
            }
        }
        return Err(e.into());
    }
    if had_output {
        if let Err(e) = fs::remove_dir_all(&previous) {
            warn!(path = %previous.display(), error = %e, "Failed to remove previous output");
        }
    }
    Ok(())
}

/// `{path}.{suffix}` next to `path`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

fn clear_dir(path: &Path) -> Result<(), StorageError> {
    if path.exists() {
        fs::remove_dir_all(path)?;
    }
    Ok(())
}

fn discard(staging: &Path) {
    if let Err(e) = clear_dir(staging) {
        warn!(path = %staging.display(), error = %e, "Failed to remove staging output");
    }
}

fn storage(module: &ModuleId, source: StorageError) -> GenerationError {
    GenerationError::Storage {
        module: module.clone(),
        source,
    }
}

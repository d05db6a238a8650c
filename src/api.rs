//! Workspace API
//!
//! Entry points used by the CLI: load a workspace, resolve its modules, report
//! incremental decisions, publish module artifacts and run generation.

use crate::config::{ConfigLoader, DocweaveConfig, StorageConfig};
use crate::error::ApiError;
use crate::generation::{
    CancelSignal, Engine, GenerationDriver, GenerationExecutor, GenerationPlan, ProcessEngine,
    RunReport,
};
use crate::incremental::{BuildCache, IncrementalPlan, Planner, SledStateStore};
use crate::manifest::WorkspaceManifest;
use crate::parameters::{publish_artifact, ModuleParameters};
use crate::resolve::{CrossModuleResolver, Resolution};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub struct Docweave {
    workspace_root: PathBuf,
    config: DocweaveConfig,
    storage: StorageConfig,
}

impl Docweave {
    pub fn new(
        workspace_root: impl Into<PathBuf>,
        config: DocweaveConfig,
    ) -> Result<Self, ApiError> {
        config.ensure_valid()?;
        let workspace_root = workspace_root.into();
        let storage = config.storage.resolve(&workspace_root);
        Ok(Self {
            workspace_root,
            config,
            storage,
        })
    }

    /// Load the layered configuration for `workspace_root`.
    pub fn open(workspace_root: &Path, explicit_config: Option<&Path>) -> Result<Self, ApiError> {
        let config = ConfigLoader::load_with(workspace_root, explicit_config)?;
        Self::new(workspace_root, config)
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn config(&self) -> &DocweaveConfig {
        &self.config
    }

    /// Storage locations resolved against the workspace root.
    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    pub fn load_modules(&self) -> Result<Vec<ModuleParameters>, ApiError> {
        Ok(WorkspaceManifest::load_workspace(&self.workspace_root)?.into_parameters()?)
    }

    pub fn resolve(&self) -> Result<Resolution, ApiError> {
        Ok(CrossModuleResolver::resolve(self.load_modules()?)?)
    }

    pub fn generation_plan(&self, resolution: &Resolution) -> Result<GenerationPlan, ApiError> {
        GenerationPlan::build(resolution, &self.storage.output_dir)
    }

    /// What each module would do on the next run, in level order.
    pub fn plan(&self) -> Result<Vec<IncrementalPlan>, ApiError> {
        let resolution = self.resolve()?;
        let plan = self.generation_plan(&resolution)?;
        let store = SledStateStore::open(&self.storage.state_path)?;
        let cache = BuildCache::new(&self.storage.cache_path)?;
        let planner = Planner::new(&store, &cache);
        let mut decisions = Vec::with_capacity(plan.total_units);
        for unit in plan.units() {
            decisions.push(planner.plan(&unit.module, &unit.configuration, &unit.output_dir)?);
        }
        Ok(decisions)
    }

    /// Write `{dest}/{module}.json` for every module of the run, with producer
    /// classpaths already merged in. Returns the written paths.
    pub fn publish(&self, dest: &Path) -> Result<Vec<PathBuf>, ApiError> {
        let resolution = self.resolve()?;
        fs::create_dir_all(dest).map_err(crate::error::StorageError::from)?;
        let mut written = Vec::new();
        for module in resolution.in_run_modules() {
            let path = dest.join(format!("{}.json", module.id().file_stem()));
            publish_artifact(&module.parameters, &path)?;
            info!(module = %module.id(), path = %path.display(), "Published module artifact");
            written.push(path);
        }
        Ok(written)
    }

    /// Renderer configured under `[engine]`.
    pub fn process_engine(&self) -> Result<ProcessEngine, ApiError> {
        let program = self.config.engine.program.clone().ok_or_else(|| {
            ApiError::ConfigError("No renderer configured (set engine.program)".to_string())
        })?;
        Ok(ProcessEngine::new(program)
            .with_args(self.config.engine.args.iter().cloned())
            .with_env(self.config.engine.env.clone()))
    }

    pub async fn generate(&self, cancel: CancelSignal) -> Result<RunReport, ApiError> {
        let engine = self.process_engine()?;
        self.generate_with(engine, cancel).await
    }

    /// Resolve, plan and run every module with `engine`.
    pub async fn generate_with<E: Engine>(
        &self,
        engine: E,
        cancel: CancelSignal,
    ) -> Result<RunReport, ApiError> {
        let resolution = self.resolve()?;
        let plan = self.generation_plan(&resolution)?;
        let store = SledStateStore::open(&self.storage.state_path)?;
        let cache = BuildCache::new(&self.storage.cache_path)?;
        let driver = GenerationDriver::new(engine, store, cache, &self.storage.work_dir);
        GenerationExecutor::new(self.config.fail_fast)
            .execute(&driver, &plan, cancel)
            .await
    }
}

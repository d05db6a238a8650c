//! Producer registry
//!
//! Holds the parameters of every module a consumer may depend on, keyed by module
//! id: in-run modules as soon as their configuration phase completes, external
//! modules once their published artifact has been read.

use crate::error::ConfigurationError;
use crate::parameters::{read_artifact, ModuleParameters};
use crate::types::ModuleId;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProducerKind {
    InRun,
    External { artifact: PathBuf },
}

#[derive(Debug, Default)]
pub struct ProducerRegistry {
    producers: BTreeMap<ModuleId, (ProducerKind, ModuleParameters)>,
}

impl ProducerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module configured in this run.
    pub fn register(&mut self, parameters: ModuleParameters) -> Result<(), ConfigurationError> {
        if self.producers.contains_key(&parameters.module_id) {
            return Err(ConfigurationError::InvalidManifest(format!(
                "module {} is declared more than once",
                parameters.module_id
            )));
        }
        self.producers
            .insert(parameters.module_id.clone(), (ProducerKind::InRun, parameters));
        Ok(())
    }

    /// Resolve an external producer from its artifact, loading it at most once.
    pub fn load_external(
        &mut self,
        consumer: &ModuleId,
        module: &ModuleId,
        artifact: &Path,
    ) -> Result<&ModuleParameters, ConfigurationError> {
        if let Some((kind, _)) = self.producers.get(module) {
            match kind {
                ProducerKind::External { artifact: loaded } if loaded != artifact => {
                    warn!(
                        consumer = %consumer,
                        module = %module,
                        requested = %artifact.display(),
                        loaded = %loaded.display(),
                        "External module already loaded from a different artifact; keeping the first"
                    );
                }
                ProducerKind::InRun => {
                    return Err(ConfigurationError::UnresolvedDependency {
                        consumer: consumer.clone(),
                        target: module.clone(),
                        reason: "declared as external but the module is also part of this run"
                            .to_string(),
                    });
                }
                _ => {}
            }
        } else {
            let parameters =
                read_artifact(artifact).map_err(|e| ConfigurationError::UnresolvedDependency {
                    consumer: consumer.clone(),
                    target: module.clone(),
                    reason: e.to_string(),
                })?;
            if &parameters.module_id != module {
                return Err(ConfigurationError::UnresolvedDependency {
                    consumer: consumer.clone(),
                    target: module.clone(),
                    reason: format!(
                        "artifact {} describes module {}",
                        artifact.display(),
                        parameters.module_id
                    ),
                });
            }
            debug!(module = %module, artifact = %artifact.display(), "Loaded external producer");
            self.producers.insert(
                module.clone(),
                (
                    ProducerKind::External {
                        artifact: artifact.to_path_buf(),
                    },
                    parameters,
                ),
            );
        }
        Ok(&self.producers[module].1)
    }

    pub fn get(&self, module: &ModuleId) -> Option<&ModuleParameters> {
        self.producers.get(module).map(|(_, parameters)| parameters)
    }

    pub fn kind(&self, module: &ModuleId) -> Option<&ProducerKind> {
        self.producers.get(module).map(|(kind, _)| kind)
    }

    pub fn is_in_run(&self, module: &ModuleId) -> bool {
        matches!(self.kind(module), Some(ProducerKind::InRun))
    }

    pub(crate) fn into_parts(self) -> BTreeMap<ModuleId, (ProducerKind, ModuleParameters)> {
        self.producers
    }
}

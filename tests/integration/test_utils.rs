//! Shared test utilities for integration tests
//!
//! Workspace fixtures on disk, a scripted in-process renderer, and isolation of
//! the XDG environment for tests that load the global configuration.

use docweave::api::Docweave;
use docweave::config::DocweaveConfig;
use docweave::error::GenerationError;
use docweave::generation::{
    CancelSignal, Diagnostics, Engine, EngineReport, EngineRequest, ExitState,
};
use docweave::types::ModuleId;
use parking_lot::Mutex as PlMutex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use tempfile::TempDir;

/// Two in-run modules: `:app` consumes `:core` and depends on its `jvmMain`.
pub const TWO_MODULE_MANIFEST: &str = r#"
[[module]]
id = ":core"
path = "core"

[[module.source_set]]
name = "jvmMain"
classpath = [{ path = "/m2/annotations.jar", coordinate = "org.example:annotations:1.0" }]

[[module]]
id = ":app"
path = "app"
consumes = [{ kind = "in_run", module = ":core" }]

[[module.source_set]]
name = "jvmMain"
dependent_source_sets = [{ scope = ":core", name = "jvmMain" }]
"#;

/// A workspace rooted in a temp dir with sources under `{module}/src/jvmMain/kotlin`.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new(manifest: &str) -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("docweave.toml"), manifest).unwrap();
        Self { dir }
    }

    pub fn two_modules() -> Self {
        let workspace = Self::new(TWO_MODULE_MANIFEST);
        workspace.write_source("core", "Core.kt", "class Core");
        workspace.write_source("app", "App.kt", "class App");
        workspace
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_source(&self, module_dir: &str, file: &str, contents: &str) {
        let dir = self.root().join(module_dir).join("src/jvmMain/kotlin");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(file), contents).unwrap();
    }

    pub fn docweave(&self) -> Docweave {
        Docweave::new(self.root(), DocweaveConfig::default()).unwrap()
    }

    pub fn docweave_with(&self, configure: impl FnOnce(&mut DocweaveConfig)) -> Docweave {
        let mut config = DocweaveConfig::default();
        configure(&mut config);
        Docweave::new(self.root(), config).unwrap()
    }

    pub fn output_dir(&self, stem: &str) -> PathBuf {
        self.root().join("build/docs").join(stem)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Render,
    Warn(usize),
    Errors(usize),
    /// Writes a partial page, then exits non-zero.
    Fail,
    /// Writes a partial page, then runs until the run is cancelled.
    Hang,
}

/// In-process renderer: writes `index.html` holding the module name and the
/// configuration it was given, and records every invocation.
#[derive(Clone, Default)]
pub struct FakeEngine {
    scripts: Arc<HashMap<ModuleId, Script>>,
    calls: Arc<PlMutex<Vec<ModuleId>>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted<I>(scripts: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, Script)>,
    {
        Self {
            scripts: Arc::new(
                scripts
                    .into_iter()
                    .map(|(module, script)| (ModuleId::new(module), script))
                    .collect(),
            ),
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<ModuleId> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Wait until `module` has been handed to the renderer.
    pub async fn started(&self, module: &str) {
        let module = ModuleId::new(module);
        while !self.calls.lock().contains(&module) {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    }
}

impl Engine for FakeEngine {
    async fn render(
        &self,
        request: &EngineRequest,
        mut cancel: CancelSignal,
    ) -> Result<EngineReport, GenerationError> {
        self.calls.lock().push(request.module.clone());
        let script = self.scripts.get(&request.module).copied().unwrap_or(Script::Render);

        let configuration = fs::read_to_string(&request.configuration_path).unwrap();
        fs::write(request.log_path.as_path(), format!("rendering {}\n", request.module)).unwrap();

        if script == Script::Hang {
            fs::write(request.output_dir.join("partial.html"), "partial").unwrap();
            cancel.cancelled().await;
            return Ok(EngineReport::cancelled());
        }

        if script == Script::Fail {
            fs::write(request.output_dir.join("partial.html"), "partial").unwrap();
            return Ok(EngineReport {
                exit: ExitState::Failed {
                    status: "exit status: 1".to_string(),
                },
                diagnostics: Diagnostics::default(),
            });
        }

        fs::write(
            request.output_dir.join("index.html"),
            format!("<h1>{}</h1>\n{}", request.module, configuration),
        )
        .unwrap();

        let diagnostics = match script {
            Script::Warn(warnings) => Diagnostics { warnings, errors: 0 },
            Script::Errors(errors) => Diagnostics { warnings: 0, errors },
            _ => Diagnostics::default(),
        };
        Ok(EngineReport {
            exit: ExitState::Success,
            diagnostics,
        })
    }
}

/// Global mutex to serialize XDG environment variable access across all tests
static XDG_ENV_MUTEX: Mutex<()> = Mutex::new(());

const ISOLATED_VARS: &[&str] = &[
    "HOME",
    "XDG_CONFIG_HOME",
    "XDG_DATA_HOME",
    "DOCWEAVE_ENV",
    "DOCWEAVE__FAIL_FAST",
    "DOCWEAVE__STORAGE__OUTPUT_DIR",
];

/// Environment variable state to restore after test
struct EnvState(Vec<(&'static str, Option<String>)>);

impl EnvState {
    fn capture() -> Self {
        Self(
            ISOLATED_VARS
                .iter()
                .map(|name| (*name, std::env::var(name).ok()))
                .collect(),
        )
    }

    fn restore(self) {
        for (name, value) in self.0 {
            match value {
                Some(value) => std::env::set_var(name, value),
                None => std::env::remove_var(name),
            }
        }
    }
}

/// Run `f` with HOME and XDG_CONFIG_HOME pointing into `test_dir`, and the
/// docweave environment variables cleared. Restores the environment afterwards.
pub fn with_xdg_env<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = XDG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let env_state = EnvState::capture();

    let test_home = test_dir.path().join("home");
    fs::create_dir_all(&test_home).unwrap();
    std::env::set_var("HOME", &test_home);
    std::env::set_var("XDG_CONFIG_HOME", test_dir.path().join("config"));
    std::env::set_var("XDG_DATA_HOME", test_dir.path().join("data"));
    for name in &ISOLATED_VARS[3..] {
        std::env::remove_var(name);
    }

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));
    env_state.restore();
    match result {
        Ok(value) => value,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

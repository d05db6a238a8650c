//! Renderer boundary
//!
//! The renderer is an external program: it receives the serialized configuration
//! path as its last argument and the staging directory in `DOCWEAVE_OUTPUT_DIR`,
//! and reports diagnostics on stdout/stderr. Both streams are written to a log
//! file and scanned for `WARN`/`w:` and `ERROR`/`e:` lines.

use crate::error::GenerationError;
use crate::types::ModuleId;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, warn};

pub const OUTPUT_DIR_ENV: &str = "DOCWEAVE_OUTPUT_DIR";
pub const MODULE_ENV: &str = "DOCWEAVE_MODULE";

#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub module: ModuleId,
    pub configuration_path: PathBuf,
    pub output_dir: PathBuf,
    pub log_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// Classify one line of renderer output.
pub fn classify_line(line: &str) -> Option<Severity> {
    let line = line.trim_start();
    if line.starts_with("ERROR") || line.starts_with("e:") {
        Some(Severity::Error)
    } else if line.starts_with("WARN") || line.starts_with("w:") {
        Some(Severity::Warning)
    } else {
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub warnings: usize,
    pub errors: usize,
}

impl Diagnostics {
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Warning => self.warnings += 1,
            Severity::Error => self.errors += 1,
        }
    }

    pub fn scan<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut diagnostics = Self::default();
        for severity in lines.into_iter().filter_map(classify_line) {
            diagnostics.record(severity);
        }
        diagnostics
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitState {
    Success,
    Failed { status: String },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineReport {
    pub exit: ExitState,
    pub diagnostics: Diagnostics,
}

impl EngineReport {
    pub fn cancelled() -> Self {
        Self {
            exit: ExitState::Cancelled,
            diagnostics: Diagnostics::default(),
        }
    }
}

/// Renders one configuration into a directory.
#[allow(async_fn_in_trait)]
pub trait Engine: Send + Sync {
    async fn render(
        &self,
        request: &EngineRequest,
        cancel: CancelSignal,
    ) -> Result<EngineReport, GenerationError>;
}

/// Owner side of a run-wide cancellation flag.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal { rx: self.tx.subscribe() }
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested. Pends forever if the handle is gone.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    fn label(self) -> &'static str {
        match self {
            Stream::Stdout => "stdout",
            Stream::Stderr => "stderr",
        }
    }
}

/// Durable renderer log shared by the stdout and stderr readers.
struct LogSink {
    writer: BufWriter<File>,
    diagnostics: Diagnostics,
}

impl LogSink {
    fn create(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
            diagnostics: Diagnostics::default(),
        })
    }

    fn record(&mut self, stream: Stream, line: &str) -> std::io::Result<()> {
        if let Some(severity) = classify_line(line) {
            self.diagnostics.record(severity);
        }
        writeln!(self.writer, "[{}] {}", stream.label(), line)
    }
}

async fn pump<R>(reader: R, stream: Stream, sink: Arc<Mutex<LogSink>>) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        sink.lock().record(stream, &line)?;
    }
    Ok(())
}

/// Runs the renderer as a child process.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    program: PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
}

impl ProcessEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Engine for ProcessEngine {
    async fn render(
        &self,
        request: &EngineRequest,
        mut cancel: CancelSignal,
    ) -> Result<EngineReport, GenerationError> {
        if cancel.is_cancelled() {
            return Ok(EngineReport::cancelled());
        }
        let module = request.module.clone();
        let sink = LogSink::create(&request.log_path).map_err(|e| GenerationError::Storage {
            module: module.clone(),
            source: e.into(),
        })?;
        let sink = Arc::new(Mutex::new(sink));

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(&request.configuration_path)
            .envs(&self.env)
            .env(OUTPUT_DIR_ENV, &request.output_dir)
            .env(MODULE_ENV, request.module.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| GenerationError::EngineUnavailable {
                module: module.clone(),
                reason: format!("{}: {}", self.program.display(), e),
            })?;
        debug!(module = %module, program = %self.program.display(), "Renderer started");

        let mut pumps = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            pumps.push(tokio::spawn(pump(stdout, Stream::Stdout, Arc::clone(&sink))));
        }
        if let Some(stderr) = child.stderr.take() {
            pumps.push(tokio::spawn(pump(stderr, Stream::Stderr, Arc::clone(&sink))));
        }

        let status = tokio::select! {
            status = child.wait() => Some(status),
            _ = cancel.cancelled() => None,
        };

        let status = match status {
            Some(status) => status,
            None => {
                warn!(module = %module, "Cancelling renderer");
                let _ = child.start_kill();
                let _ = child.wait().await;
                for handle in pumps {
                    handle.abort();
                }
                return Ok(EngineReport::cancelled());
            }
        };

        for handle in pumps {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(module = %module, error = %e, "Renderer log stream failed"),
                Err(e) => warn!(module = %module, error = %e, "Renderer log reader panicked"),
            }
        }

        let diagnostics = {
            let mut sink = sink.lock();
            if let Err(e) = sink.writer.flush() {
                warn!(module = %module, error = %e, "Failed to flush renderer log");
            }
            sink.diagnostics.clone()
        };

        let status = status.map_err(|e| GenerationError::EngineFailed {
            module: module.clone(),
            status: e.to_string(),
        })?;
        let exit = if status.success() {
            ExitState::Success
        } else {
            ExitState::Failed {
                status: status.to_string(),
            }
        };
        Ok(EngineReport { exit, diagnostics })
    }
}

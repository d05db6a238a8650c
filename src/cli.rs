//! CLI: clap types and command execution for the `docweave` binary.

use crate::api::Docweave;
use crate::error::ApiError;
use crate::generation::{CancelSignal, ModuleOutcome, ReportKind, RunReport};
use crate::incremental::IncrementalPlan;
use crate::logging::{LogFormat, LogOutput, LoggingConfig};
use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Write as _;
use std::path::PathBuf;

/// Docweave CLI - multi-module API documentation generation
#[derive(Parser)]
#[command(name = "docweave")]
#[command(about = "Aggregate multi-module documentation configuration and render it incrementally")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (contains docweave.toml)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file layered above the workspace configuration
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render documentation for every module that needs it
    Generate {
        /// Stop after the first failing level
        #[arg(long)]
        fail_fast: bool,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Show what the next generation would do for each module
    Plan {
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Write module artifacts for consumption by other builds
    Publish {
        /// Destination directory
        #[arg(long, default_value = "build/docweave-artifacts")]
        dest: PathBuf,
    },
}

/// Result of a command: text for stdout and whether the run succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub text: String,
    pub success: bool,
}

/// Apply CLI overrides on top of the configured logging settings.
pub fn apply_logging_overrides(
    cli: &Cli,
    mut config: LoggingConfig,
) -> Result<LoggingConfig, ApiError> {
    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(level) = &cli.log_level {
        config.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.format = format.parse::<LogFormat>()?;
    }
    if let Some(output) = &cli.log_output {
        config.output = output.parse::<LogOutput>()?;
    }
    Ok(config)
}

pub struct RunContext {
    docweave: Docweave,
}

impl RunContext {
    pub fn new(docweave: Docweave) -> Self {
        Self { docweave }
    }

    pub fn docweave(&self) -> &Docweave {
        &self.docweave
    }

    pub async fn execute(
        &mut self,
        command: &Commands,
        cancel: CancelSignal,
    ) -> Result<CommandOutput, ApiError> {
        match command {
            Commands::Generate { fail_fast, format } => {
                if *fail_fast {
                    let mut config = self.docweave.config().clone();
                    config.fail_fast = true;
                    self.docweave =
                        Docweave::new(self.docweave.workspace_root().to_path_buf(), config)?;
                }
                let report = self.docweave.generate(cancel).await?;
                Ok(CommandOutput {
                    text: render_run_report(&report, *format)?,
                    success: report.is_success(),
                })
            }
            Commands::Plan { format } => {
                let plans = self.docweave.plan()?;
                Ok(CommandOutput {
                    text: render_plans(&plans, *format)?,
                    success: true,
                })
            }
            Commands::Publish { dest } => {
                let dest = if dest.is_absolute() {
                    dest.clone()
                } else {
                    self.docweave.workspace_root().join(dest)
                };
                let written = self.docweave.publish(&dest)?;
                let mut text = format!("Published {} module artifact(s)", written.len());
                for path in &written {
                    let _ = write!(text, "\n  {}", path.display());
                }
                Ok(CommandOutput { text, success: true })
            }
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::ConfigError(format!("Failed to render output: {}", e)))
}

pub fn render_plans(plans: &[IncrementalPlan], format: OutputFormat) -> Result<String, ApiError> {
    if format == OutputFormat::Json {
        return to_json(&plans);
    }
    let width = plans.iter().map(|p| p.module.as_str().len()).max().unwrap_or(0);
    let mut text = String::new();
    for plan in plans {
        let _ = writeln!(
            text,
            "{:width$}  {}  {}",
            plan.module.as_str(),
            &plan.fingerprint.to_hex()[..12],
            plan.decision,
            width = width
        );
    }
    Ok(text.trim_end().to_string())
}

pub fn render_run_report(report: &RunReport, format: OutputFormat) -> Result<String, ApiError> {
    if format == OutputFormat::Json {
        return to_json(report);
    }
    let width = report.outcomes.keys().map(|m| m.as_str().len()).max().unwrap_or(0);
    let mut text = String::new();
    for (module, outcome) in &report.outcomes {
        let status = match outcome {
            ModuleOutcome::Succeeded(generated) => match &generated.kind {
                ReportKind::UpToDate => "up-to-date".to_string(),
                ReportKind::RestoredFromCache => "restored from cache".to_string(),
                ReportKind::Rendered { diagnostics } if diagnostics.warnings > 0 => {
                    format!("rendered ({} warning(s))", diagnostics.warnings)
                }
                ReportKind::Rendered { .. } => "rendered".to_string(),
            },
            ModuleOutcome::Failed { error, fatal: true } => format!("FAILED: {}", error),
            ModuleOutcome::Failed { error, fatal: false } => format!("failed (ignored): {}", error),
            ModuleOutcome::NotRun => "not run".to_string(),
        };
        let _ = writeln!(text, "{:width$}  {}", module.as_str(), status, width = width);
    }
    Ok(text.trim_end().to_string())
}

//! Docweave CLI Binary

use anyhow::Context;
use clap::Parser;
use docweave::api::Docweave;
use docweave::cli::{apply_logging_overrides, Cli, RunContext};
use docweave::generation::CancelHandle;
use docweave::logging::init_logging;
use std::process::ExitCode;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let docweave = Docweave::open(&cli.workspace, cli.config.as_deref())
        .with_context(|| format!("Failed to load workspace {}", cli.workspace.display()))?;

    let logging = apply_logging_overrides(&cli, docweave.config().logging.clone())?;
    init_logging(&logging).context("Failed to initialize logging")?;
    info!(workspace = %cli.workspace.display(), "Docweave starting");

    let cancel = CancelHandle::new();
    let signal = cancel.signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling running renderers");
            cancel.cancel();
        }
    });

    let mut context = RunContext::new(docweave);
    let output = context.execute(&cli.command, signal).await?;
    if !output.text.is_empty() {
        println!("{}", output.text);
    }
    Ok(output.success)
}

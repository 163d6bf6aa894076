//! `export-button`: exports the environment of a notebook kernel.
//!
//! Launched by `button_script.sh` with the kernel's environment prefix.

mod cli;

use std::path::Path;

use anyhow::Context;
use clap::Parser;
use export_button_conda::{CommandRunner, CondaExporter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands, CondaExportArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::CondaExport(args) => conda_export(&args).await,
    }
}

/// Logs go to stderr so stdout stays a clean environment file.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .init();
}

async fn conda_export(args: &CondaExportArgs) -> anyhow::Result<()> {
    let exporter = CondaExporter::new(args.options());
    write_environment(&exporter, args.output.as_deref()).await
}

/// Export the environment and write it to `output`, or stdout when unset.
/// Nothing is written if the export fails.
async fn write_environment<R: CommandRunner>(
    exporter: &CondaExporter<R>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let env = exporter
        .export()
        .await
        .context("Failed to export conda environment")?;
    let yaml = env.to_yaml().context("Failed to render environment file")?;

    match output {
        Some(path) => {
            tokio::fs::write(path, yaml)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "Environment written");
        }
        None => print!("{yaml}"),
    }
    Ok(())
}

mod aggregate;
mod cli;
mod config;
mod error;
mod ledger;
mod orchestrator;
mod preflight;
mod sequence;
mod slicer;
mod stage;
mod state_machine;
mod ui;
mod workspace;

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use aggregate::AggregateState;
use cli::{Cli, Command, RunArgs};
use config::{RunSettings, TootConfig};
use orchestrator::{Pipeline, SUMMARY_FILE};
use stage::ProcessExecutor;
use ui::RunProgress;

/// Exit status for a run interrupted with Ctrl-C.
const EXIT_CANCELLED: i32 = 130;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Run(args) => {
            let config = TootConfig::load(cli.config.as_deref())?;
            let code = run(&args, &config).await?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Command::Split { fasta, size, out } => {
            let pieces = slicer::split_fasta(&fasta, &out, size)
                .with_context(|| format!("failed to split {}", fasta.display()))?;
            println!("{pieces}");
        }
        Command::Extract {
            fasta,
            ids,
            results,
            out,
        } => {
            let wanted: HashSet<String> = match (ids, results) {
                (Some(ids), _) => slicer::read_id_list(&ids)?,
                (None, Some(results)) => aggregate::result_ids(&results)?.into_iter().collect(),
                (None, None) => unreachable!("clap requires --ids or --results"),
            };
            let written = slicer::extract_records(&fasta, &wanted, &out)
                .with_context(|| format!("failed to extract from {}", fasta.display()))?;
            println!("{written} of {} requested records written to {}", wanted.len(), out.display());
        }
        Command::Summarize { results, out } => {
            let out = out.unwrap_or_else(|| sibling(&results, SUMMARY_FILE));
            let state = AggregateState::from_results(&results)
                .with_context(|| format!("failed to read {}", results.display()))?;
            state.write_summary(&out)?;
            ui::print_summary(&state);
        }
    }

    Ok(())
}

/// Runs the pipeline, returning the process exit status.
async fn run(args: &RunArgs, config: &TootConfig) -> Result<i32> {
    let settings = preflight::check(&RunSettings::resolve(args, config))?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling run");
            on_signal.cancel();
        }
    });

    let pipeline = Pipeline::new(settings, ProcessExecutor);
    let progress = RunProgress::start();
    let output = pipeline
        .run(&progress, &cancel)
        .await
        .context("pipeline aborted")?;

    progress.complete(&output.report, &output.state);
    println!("  Results: {}", pipeline.results_path().display());
    println!("  Summary: {}", pipeline.summary_path().display());
    println!("  Report:  {}", pipeline.report_path().display());

    Ok(if output.report.cancelled { EXIT_CANCELLED } else { 0 })
}

fn sibling(path: &Path, name: &str) -> std::path::PathBuf {
    path.parent().unwrap_or(Path::new(".")).join(name)
}

//! Compile game series into the position index.
//!
//! Usage: compile-positions <input_dir> <output.json> [--mode rebuild|refresh-titles]
//!        [--anchor-offset SECS] [--titles titles.json] [--subject name,...] [--workers N]

use anyhow::Context;
use clap::Parser;
use position_index::{run, CancelToken, Cli, PipelineConfig};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = PipelineConfig::from(Cli::parse());

    match compile(&config) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}

fn compile(config: &PipelineConfig) -> anyhow::Result<u8> {
    tracing::info!(
        mode = ?config.mode,
        input = %config.input_dir.display(),
        output = %config.output.display(),
        workers = config.workers,
        "Starting run"
    );

    let outcome = run(config, &CancelToken::new())
        .with_context(|| format!("run against {} failed", config.output.display()))?;

    for line in outcome.report.summary_lines() {
        println!("{}", line);
    }
    println!("Report: {}", config.report.display());

    Ok(outcome.status.exit_code())
}

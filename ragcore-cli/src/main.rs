//! ABOUTME: Entry point for the `ragcore` binary: parses arguments, sets up
//! ABOUTME: tracing, loads configuration, and dispatches to the `ask`/`eval`
//! ABOUTME: subcommands.

mod cli;
mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, TraceLevel};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.trace);

    let runtime_config = config::load_runtime_config(cli.config_path()).await?;

    commands::execute_command(cli.command, runtime_config).await?;

    Ok(())
}

/// Priority: `RUST_LOG` env var > `--trace` flag > default (warn). Tracing
/// output goes to stderr so stdout stays clean for program output.
fn setup_tracing(trace_level: TraceLevel) {
    use std::io;
    use tracing_subscriber::EnvFilter;

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(io::stderr)
            .with_target(false)
            .init();
    } else {
        let level: tracing::Level = trace_level.into();
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(io::stderr)
            .with_target(false)
            .init();
    }
}

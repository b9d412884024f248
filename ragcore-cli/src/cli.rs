//! ABOUTME: Command-line argument parsing: global flags plus subcommand
//! ABOUTME: shape (`--config`, `--trace`, then one subcommand per operation).

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Trace verbosity, mapped onto `tracing::Level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TraceLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<TraceLevel> for tracing::Level {
    fn from(level: TraceLevel) -> Self {
        match level {
            TraceLevel::Off | TraceLevel::Error => Self::ERROR,
            TraceLevel::Warn => Self::WARN,
            TraceLevel::Info => Self::INFO,
            TraceLevel::Debug => Self::DEBUG,
            TraceLevel::Trace => Self::TRACE,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "ragcore")]
#[command(version)]
#[command(about = "Query pipeline and evaluation harness driver")]
pub struct Cli {
    /// Path to a RuntimeConfig TOML file; falls back to defaults plus
    /// `RAGCORE_*` environment overrides when omitted.
    #[arg(long, global = true, env = "RAGCORE_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, global = true, default_value = "warn")]
    pub trace: TraceLevel,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    #[must_use]
    pub fn config_path(&self) -> Option<&std::path::Path> {
        self.config.as_deref()
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ask one question against a knowledge base and print the answer.
    Ask {
        #[arg(long)]
        kb_id: String,
        question: String,
    },
    /// Run an evaluation question set (one question per line) and stream
    /// progress to stderr, printing final averages to stdout.
    Eval {
        #[arg(long)]
        kb_id: String,
        #[arg(long)]
        questions: PathBuf,
    },
}

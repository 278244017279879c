//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for the rendered PRD
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Markdown document
    Markdown,
    /// JSON payload
    Json,
}

/// CLI arguments for prdgen
#[derive(Parser, Debug)]
#[command(name = "prdgen")]
#[command(author, version, about = "Interview-driven PRD generator backed by AI CLIs")]
#[command(long_about = r#"
prdgen interviews you about a feature through an AI CLI (claude, codex, or
gemini) and writes a structured Product Requirements Document.

The interview moves through three phases:
1. Exploring: the assistant thinks through the problem space
2. Questioning: focused questions, one at a time
3. Generating: the assistant produces the PRD

Progress is checkpointed after every turn; if the session dies, run with
--resume to pick up exactly where you left off.

Configuration files are loaded from (in priority order):
1. --config <path>     Explicit config file
2. ./prdgen.toml       Project-level config
3. ~/.config/prdgen/config.toml   Global config

Example:
  prdgen "add user authentication"
  prdgen --provider gemini --first-principles "realtime collaboration"
  prdgen --resume
"#)]
pub struct Cli {
    /// The feature to interview about (not required with --resume)
    pub feature: Option<String>,

    /// Resume the interview persisted in .prdgen/
    #[arg(short, long)]
    pub resume: bool,

    /// AI CLI to drive the interview (claude, codex, gemini)
    #[arg(short, long, value_name = "PROVIDER")]
    pub provider: Option<String>,

    /// Interview from first principles (question the framing itself)
    #[arg(long)]
    pub first_principles: bool,

    /// Reference documents to inject into the interview (repeatable)
    #[arg(short, long, value_name = "PATH")]
    pub context: Vec<PathBuf>,

    /// Where to write the rendered PRD
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "markdown")]
    pub format: OutputFormat,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

//! Presentation layer for prdgen
//!
//! This crate contains the clap CLI definition, the interactive interview
//! REPL, the console event presenter, and PRD document rendering.

pub mod cli;
pub mod interview;
pub mod output;

// Re-export commonly used types
pub use cli::commands::{Cli, OutputFormat};
pub use interview::presenter::InterviewPresenter;
pub use interview::repl::{InterviewRepl, ReplOutcome};
pub use output::markdown::MarkdownFormatter;

//! Provider CLI adapters
//!
//! One [`CliProvider`] implementation drives every supported AI CLI; the
//! per-CLI differences (binary name, session-mode flags) live in
//! [`ProviderCommand`] profiles.

pub mod cli;
pub mod command;

pub use cli::CliProvider;
pub use command::ProviderCommand;

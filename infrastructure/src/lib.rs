//! Infrastructure layer for prdgen
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: provider CLI adapters, the JSON state store, the
//! configuration file loader, the reference-document loader, and the JSONL
//! transcript logger.

pub mod config;
pub mod context;
pub mod logging;
pub mod providers;
pub mod state;

// Re-export commonly used types
pub use config::{ConfigLoader, FileConfig};
pub use context::LocalContextLoader;
pub use logging::JsonlTranscriptLogger;
pub use providers::{CliProvider, ProviderCommand};
pub use state::JsonStateStore;

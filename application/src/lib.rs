//! Application layer for prdgen
//!
//! This crate contains the Interview Orchestrator use case, the ports it
//! drives (provider, state store, context loader, event sinks, transcript
//! logging), and the error-recovery layer. It depends only on the domain
//! layer.

pub mod config;
pub mod ports;
pub mod recovery;
pub mod use_cases;

// Re-export commonly used types
pub use config::OrchestratorConfig;
pub use ports::{
    context_loader::{combine_context, ContextLoaderPort, LoadedContextFile},
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    events::{InterviewEvent, InterviewEventSink, NoEventSink},
    provider::{AiProvider, ProviderError, ProviderReply},
    state_store::{StateStore, StateStoreError},
};
pub use recovery::{
    safe_execute, try_save_state, with_error_recovery, with_retry, RetryOptions,
};
pub use use_cases::run_interview::{
    InterviewCompletion, InterviewOrchestrator, TurnResult,
};

//! CLI entrypoint for prdgen
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{bail, Context, Result};
use clap::Parser;
use prdgen_application::ports::context_loader::{combine_context, ContextLoaderPort};
use prdgen_application::{InterviewOrchestrator, OrchestratorConfig, StateStore};
use prdgen_domain::{Feature, ProviderKind};
use prdgen_infrastructure::{
    CliProvider, ConfigLoader, JsonStateStore, JsonlTranscriptLogger, LocalContextLoader,
};
use prdgen_presentation::{Cli, InterviewPresenter, InterviewRepl, MarkdownFormatter, OutputFormat, ReplOutcome};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if cli.show_config {
        ConfigLoader::print_config_sources();
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).map_err(|e| anyhow::anyhow!(e))?
    };

    let store = Arc::new(JsonStateStore::new());
    let context_loader = LocalContextLoader::new(
        config.context.allowed_extensions.clone(),
        config.context.max_file_bytes,
    );
    let cancel = CancellationToken::new();

    // === Dependency injection ===
    let orchestrator = if cli.resume {
        let state = store
            .load()
            .context("could not load the saved interview (delete .prdgen/interview.json to start over)")?
            .context("no interview to resume; start one with: prdgen \"<feature>\"")?;

        let provider = build_provider(state.provider, &config, &cancel)?;
        let context_content = combine_context(&context_loader.load_files(&state.context_files));

        info!(
            "resuming interview for '{}' at {}",
            state.feature, state.phase
        );
        InterviewOrchestrator::from_state(state, provider, store.clone())?
            .with_context_content(context_content)
            .with_retry_options(config.retry_options())
            .with_cancellation_token(cancel.clone())
    } else {
        let feature_text = match &cli.feature {
            Some(f) => f.clone(),
            None => bail!("a feature description is required (or --resume)"),
        };
        let feature = Feature::try_new(feature_text)
            .context("the feature description cannot be empty")?;

        if store.exists() {
            bail!(
                "an interview is already in progress; continue it with --resume \
                 or delete .prdgen/interview.json to start over"
            );
        }

        let kind = match &cli.provider {
            Some(name) => name.parse().map_err(|e: String| anyhow::anyhow!(e))?,
            None => config.provider_kind().map_err(|e| anyhow::anyhow!(e))?,
        };
        let provider = build_provider(kind, &config, &cancel)?;
        let context_content = combine_context(&context_loader.load_files(&cli.context));

        let orchestrator_config = OrchestratorConfig::new(feature, kind)
            .with_first_principles(cli.first_principles)
            .with_context(cli.context.clone(), context_content)
            .with_retry(config.retry_options())
            .with_receive_timeout(config.receive_timeout());

        InterviewOrchestrator::new(orchestrator_config, provider, store.clone())
            .with_cancellation_token(cancel.clone())
    };

    let orchestrator = match JsonlTranscriptLogger::new() {
        Some(logger) => orchestrator.with_conversation_logger(Arc::new(logger)),
        None => orchestrator,
    };

    let feature = orchestrator.state().feature.clone();
    let provider_kind = orchestrator.state().provider;

    if !cli.quiet {
        println!();
        println!("prdgen - {} interview via {}", feature, provider_kind);
        println!("Checkpointed after every answer; Ctrl-C to pause, --resume to continue.");
    }

    let presenter = Arc::new(InterviewPresenter::new(cli.quiet));
    let repl = InterviewRepl::new(orchestrator, presenter, cli.resume);

    match repl.run().await? {
        ReplOutcome::Completed(completion) => {
            let path = cli
                .output
                .unwrap_or_else(|| PathBuf::from(&config.output.path));
            let document = match cli.format {
                OutputFormat::Markdown => MarkdownFormatter::format(&feature, &completion.prd),
                OutputFormat::Json => MarkdownFormatter::format_json(&feature, &completion.prd),
            };
            std::fs::write(&path, document)
                .with_context(|| format!("could not write {}", path.display()))?;

            if !cli.quiet {
                println!(
                    "PRD written to {} after {} answered questions.",
                    path.display(),
                    completion.turns
                );
            }
            Ok(())
        }
        ReplOutcome::Cancelled => {
            if !cli.quiet {
                println!("Interview paused. Continue any time with: prdgen --resume");
            }
            Ok(())
        }
        ReplOutcome::Failed => {
            bail!("the interview could not continue; details are in the log")
        }
    }
}

fn build_provider(
    kind: ProviderKind,
    config: &prdgen_infrastructure::FileConfig,
    cancel: &CancellationToken,
) -> Result<Box<CliProvider>> {
    let provider =
        CliProvider::new(kind, config.receive_timeout()).with_cancellation(cancel.clone());
    if !prdgen_application::AiProvider::is_available(&provider) {
        bail!(
            "the '{}' CLI was not found on PATH; install it or pick another provider",
            kind
        );
    }
    Ok(Box::new(provider))
}

//! Console presenter for interview events
//!
//! Implements [`InterviewEventSink`]: phase changes, recorded answers, and
//! errors are rendered as they happen, in-line with the turn. A spinner
//! (driven by the REPL, not by events) covers the wait for each provider
//! reply.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use prdgen_application::ports::events::{InterviewEvent, InterviewEventSink};
use std::sync::Mutex;
use std::time::Duration;

/// Renders interview progress to the console.
pub struct InterviewPresenter {
    quiet: bool,
    spinner: Mutex<Option<ProgressBar>>,
}

impl InterviewPresenter {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            spinner: Mutex::new(None),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap()
    }

    /// Show a spinner while the provider thinks.
    pub fn begin_waiting(&self, message: &str) {
        if self.quiet {
            return;
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(Self::spinner_style());
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(120));
        *self.spinner.lock().unwrap() = Some(pb);
    }

    /// Clear the spinner once the reply arrived.
    pub fn end_waiting(&self) {
        if let Some(pb) = self.spinner.lock().unwrap().take() {
            pb.finish_and_clear();
        }
    }
}

impl InterviewEventSink for InterviewPresenter {
    fn on_event(&self, event: &InterviewEvent) {
        if self.quiet {
            return;
        }
        match event {
            InterviewEvent::PhaseChanged { from, to } => {
                println!(
                    "{} {} {} {}",
                    "->".cyan(),
                    from.display_name().dimmed(),
                    "=>".dimmed(),
                    to.display_name().bold()
                );
            }
            InterviewEvent::AnswerRecorded { answer, .. } => {
                println!("  {} {}", "v".green(), answer.dimmed());
            }
            InterviewEvent::PrdReady => {
                println!();
                println!("{}", "PRD ready.".green().bold());
            }
            InterviewEvent::Error { message, .. } => {
                // The spinner would otherwise swallow the line.
                self.end_waiting();
                eprintln!("{} {}", "x".red(), message.red());
            }
            InterviewEvent::QuestionReceived(_) => {
                // Questions are rendered by the REPL together with the
                // input prompt.
            }
        }
    }
}

//! Interactive answer loop for an interview session
//!
//! Drives the orchestrator turn by turn: render the pending question, read
//! and locally validate the answer, send it, repeat until the PRD is ready.
//! Ctrl-C (at the prompt or while a turn is in flight) cancels the
//! session (progress stays checkpointed for `--resume`).

use crate::interview::presenter::InterviewPresenter;
use colored::Colorize;
use prdgen_application::{InterviewCompletion, InterviewOrchestrator, TurnResult};
use prdgen_domain::{InterviewError, StructuredQuestion};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::Arc;

/// How an interactive session ended.
#[derive(Debug)]
pub enum ReplOutcome {
    /// The PRD was produced and validated.
    Completed(InterviewCompletion),
    /// The user cancelled; state remains on disk for resume.
    Cancelled,
    /// A non-recoverable error ended the session after checkpointing.
    Failed,
}

enum Step {
    Turn(Result<TurnResult, InterviewError>),
    Interrupt,
}

/// Interactive interview REPL
pub struct InterviewRepl {
    orchestrator: InterviewOrchestrator,
    presenter: Arc<InterviewPresenter>,
    resume: bool,
}

impl InterviewRepl {
    pub fn new(
        mut orchestrator: InterviewOrchestrator,
        presenter: Arc<InterviewPresenter>,
        resume: bool,
    ) -> Self {
        orchestrator.subscribe(presenter.clone());
        Self {
            orchestrator,
            presenter,
            resume,
        }
    }

    /// Run the interview to completion, cancellation, or failure.
    pub async fn run(mut self) -> rustyline::Result<ReplOutcome> {
        let mut rl = DefaultEditor::new()?;

        self.presenter.begin_waiting("Starting the interview...");
        let first = if self.resume {
            self.orchestrator.resume().await
        } else {
            self.orchestrator.start().await
        };
        self.presenter.end_waiting();

        let mut result = match first {
            Ok(r) => r,
            Err(_) => {
                // The presenter already rendered the user-facing message.
                return Ok(self.finish_failed().await);
            }
        };

        loop {
            if let Some(completion) = result.completion.take() {
                return Ok(ReplOutcome::Completed(completion));
            }

            if let Some(question) = &result.question {
                Self::render_question(question);
            } else {
                println!();
                println!("{}", "Share anything that moves the interview along:".dimmed());
            }

            let line = match rl.readline(">>> ") {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    return Ok(self.cancel().await);
                }
                Err(err) => {
                    eprintln!("input error: {err:?}");
                    return Ok(self.cancel().await);
                }
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if line.starts_with('/') {
                if self.handle_command(line) {
                    return Ok(self.cancel().await);
                }
                continue;
            }

            let answer = match self.validate_answer(line) {
                Some(answer) => answer,
                None => continue,
            };
            let _ = rl.add_history_entry(line);

            self.presenter.begin_waiting("Waiting for the assistant...");
            let step = tokio::select! {
                turn = self.orchestrator.answer(&answer) => Step::Turn(turn),
                _ = tokio::signal::ctrl_c() => Step::Interrupt,
            };
            self.presenter.end_waiting();

            match step {
                Step::Interrupt => return Ok(self.cancel().await),
                Step::Turn(Ok(turn)) => result = turn,
                Step::Turn(Err(err)) => {
                    if self.orchestrator.status().is_terminal() {
                        return Ok(self.finish_failed().await);
                    }
                    // Recoverable and already retried; the question is still
                    // pending, so loop back and let the user try again.
                    tracing::debug!("turn failed, re-prompting: {}", err);
                    result = TurnResult {
                        state: self.orchestrator.state().clone(),
                        question: self.orchestrator.pending_question().cloned(),
                        completion: None,
                    };
                }
            }
        }
    }

    fn render_question(question: &StructuredQuestion) {
        println!();
        println!("{}", question.prompt.bold());
        for (i, choice) in question.choices.iter().enumerate() {
            println!("  {}. {}", i + 1, choice);
        }
        if question.multi_select {
            println!("{}", "(choose one or more, comma-separated)".dimmed());
        } else if !question.choices.is_empty() {
            println!("{}", "(choose one, by number or name)".dimmed());
        }
    }

    /// Validate the raw input against the pending question, reporting
    /// problems locally instead of wasting a provider turn.
    fn validate_answer(&self, line: &str) -> Option<String> {
        match self.orchestrator.pending_question() {
            Some(question) => match question.check_answer(line) {
                Ok(normalized) => Some(normalized),
                Err(e) => {
                    println!("{} {}", "!".yellow(), e);
                    None
                }
            },
            None => Some(line.to_string()),
        }
    }

    /// Handle slash commands. Returns true if the session should end.
    fn handle_command(&self, cmd: &str) -> bool {
        match cmd {
            "/quit" | "/exit" | "/q" => true,
            "/help" | "/h" | "/?" => {
                println!();
                println!("Commands:");
                println!("  /help, /h, /?    - Show this help");
                println!("  /status          - Show interview progress");
                println!("  /quit, /exit, /q - Cancel and exit (resume later with --resume)");
                println!();
                false
            }
            "/status" => {
                let state = self.orchestrator.state();
                println!();
                println!("Feature:  {}", state.feature);
                println!("Provider: {}", state.provider);
                println!("Phase:    {}", state.phase);
                println!("Answers:  {}", state.history.len());
                println!();
                false
            }
            _ => {
                println!("Unknown command: {}", cmd);
                println!("Type /help for available commands");
                false
            }
        }
    }

    async fn cancel(&mut self) -> ReplOutcome {
        self.orchestrator.cancel().await;
        ReplOutcome::Cancelled
    }

    async fn finish_failed(&mut self) -> ReplOutcome {
        if self.orchestrator.status() == prdgen_domain::SessionStatus::Cancelled {
            ReplOutcome::Cancelled
        } else {
            ReplOutcome::Failed
        }
    }
}

//! Prompt templates for the interview flow
//!
//! All rendering here is deterministic: the same inputs produce the same
//! text, so a resumed session reproduces its priming prompt exactly
//! without re-reading mutable sources. Context file content is passed in
//! pre-loaded for the same reason.

use crate::core::feature::Feature;
use crate::interview::state::InterviewState;

/// Templates for generating prompts at each stage of the interview
pub struct InterviewPromptTemplate;

impl InterviewPromptTemplate {
    /// The marker-convention contract included in every system prompt.
    fn marker_instructions() -> &'static str {
        r#"Structured output protocol (follow it exactly):
- To ask the user a question, emit a fenced block:
  ```prdgen
  {"kind": "question", "question": {"prompt": "...", "choices": ["..."], "multi_select": false}}
  ```
  Omit "choices" (or leave it empty) for free-text questions. Ask exactly
  one question per reply.
- When you have learned enough to write the requirements document, emit:
  ```prdgen
  {"kind": "complete"}
  ```
- When asked for the final document, emit:
  ```prdgen
  {"kind": "prd", "prd": {"overview": "...", "user_stories": [{"title": "...", "description": "...", "acceptance_criteria": ["..."]}], "technical_notes": "..."}}
  ```
- Never emit more than one structured block of the same kind in a reply.
- Everything outside the fenced blocks is free-form commentary."#
    }

    /// System prompt priming a new interview.
    pub fn system_prompt(feature: &Feature, first_principles: bool, context: &str) -> String {
        let mut prompt = format!(
            r#"You are a product requirements interviewer. Your job is to interview
the user about the following feature and then produce a structured
Product Requirements Document (PRD).

Feature: {}

Conduct the interview in stages: first explore the problem space in free
form, then ask focused questions one at a time, then generate the PRD.
Keep questions short and concrete. Prefer enumerated choices when the
answer space is small."#,
            feature
        );

        if first_principles {
            prompt.push_str(
                r#"

Work from first principles: question the framing of the feature itself,
probe the underlying user problem before accepting the proposed solution,
and surface unstated assumptions as explicit questions."#,
            );
        }

        if !context.trim().is_empty() {
            prompt.push_str("\n\nReference material provided by the user:\n\n");
            prompt.push_str(context.trim());
        }

        prompt.push_str("\n\n");
        prompt.push_str(Self::marker_instructions());
        prompt
    }

    /// Opening message for the first turn of a new interview.
    pub fn opening_message(feature: &Feature) -> String {
        format!(
            "I want to build: {}. Start the interview: explore briefly, then ask your first question.",
            feature
        )
    }

    /// Relay a user answer back to the assistant.
    pub fn answer_message(question: Option<&str>, answer: &str) -> String {
        match question {
            Some(q) => format!("Q: {}\nA: {}", q, answer),
            None => answer.to_string(),
        }
    }

    /// Ask for the final document once exploration is complete.
    pub fn generate_prd_message() -> &'static str {
        "Generate the final PRD now, as a structured prd block."
    }

    /// Re-priming message for a resumed session.
    ///
    /// The provider CLIs keep no cross-process memory, so the condensed
    /// interview record is replayed before the next genuine turn.
    pub fn resume_message(state: &InterviewState) -> String {
        let mut msg = format!(
            r#"We are resuming an interview in progress about this feature: {}.

Summary of what has been established so far:
"#,
            state.feature
        );

        if state.ai_context.trim().is_empty() {
            msg.push_str("(no notes recorded yet)\n");
        } else {
            msg.push_str(state.ai_context.trim());
            msg.push('\n');
        }

        if !state.history.is_empty() {
            msg.push_str("\nQuestions already answered:\n");
            for entry in &state.history {
                if let Some(q) = &entry.question {
                    msg.push_str(&format!("- Q: {}\n  A: {}\n", q, entry.answer));
                }
            }
        }

        msg.push_str(
            "\nDo not repeat any answered question. Continue the interview from here.",
        );
        msg
    }
}

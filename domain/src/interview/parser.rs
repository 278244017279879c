//! Structured-response parsing
//!
//! Extracts typed payloads from free-form assistant text using the
//! **marker syntax v1** convention: a fenced code block opened by a line
//! containing exactly ` ```prdgen ` and closed by ` ``` `, whose body is a
//! JSON object with a `kind` discriminator:
//!
//! ````text
//! ```prdgen
//! {"kind": "question", "question": {"prompt": "...", "choices": [], "multi_select": false}}
//! ```
//! ````
//!
//! | `kind` | Payload | Honored while |
//! |--------|---------|---------------|
//! | `question` | a [`StructuredQuestion`] (or a `questions` list, first entry taken) | exploring, questioning |
//! | `complete` | none; signals exploration is over | questioning |
//! | `prd` | a [`PrdDraft`] | generating (or after a `complete` marker in the same response) |
//!
//! Parsing never fails: anything that cannot be honored (malformed JSON,
//! a kind that does not match the current phase, extra markers beyond the
//! first valid one) degrades to free-form content and is recorded as a
//! [`ParseWarning`] for the caller to log or act on. The tie-break rule is
//! fixed: the first valid marker for the current phase wins, everything
//! else is an anomaly.

use crate::interview::phase::InterviewPhase;
use crate::interview::prd::PrdDraft;
use crate::interview::question::StructuredQuestion;

/// Opening fence line for a structured marker (marker syntax v1).
pub const MARKER_OPEN: &str = "```prdgen";
/// Closing fence line for a structured marker.
pub const MARKER_CLOSE: &str = "```";

/// A non-fatal anomaly recorded while scanning a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    /// A marker's JSON payload failed to parse or lacked required fields.
    MalformedPayload { detail: String },
    /// A marker's kind is not valid for the current phase.
    KindMismatch { found: String, phase: InterviewPhase },
    /// A well-formed marker beyond the first honored one.
    ExtraMarker { kind: String },
    /// A marker with an unrecognized kind discriminator.
    UnknownKind { found: String },
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseWarning::MalformedPayload { detail } => {
                write!(f, "malformed marker payload: {}", detail)
            }
            ParseWarning::KindMismatch { found, phase } => {
                write!(f, "'{}' marker ignored during {} phase", found, phase)
            }
            ParseWarning::ExtraMarker { kind } => {
                write!(f, "extra '{}' marker ignored", kind)
            }
            ParseWarning::UnknownKind { found } => {
                write!(f, "unknown marker kind '{}'", found)
            }
        }
    }
}

/// The typed view of one assistant response.
///
/// At most one of `question` / `prd` is populated.
#[derive(Debug, Clone, Default)]
pub struct ParsedResponse {
    /// Free-form prose with marker blocks stripped.
    pub content: String,
    pub question: Option<StructuredQuestion>,
    pub prd: Option<PrdDraft>,
    /// Whether the assistant signalled that exploration is complete.
    pub is_complete: bool,
    pub warnings: Vec<ParseWarning>,
}

impl ParsedResponse {
    fn free_form(content: String) -> Self {
        Self {
            content,
            ..Self::default()
        }
    }
}

/// Scan a raw assistant response for structured markers.
///
/// `phase` is the interview phase the response was received in; it decides
/// which marker kinds are honored. A `complete` marker upgrades the
/// effective phase to generating for the remainder of the same response,
/// so a completion signal and a PRD payload may arrive together.
pub fn parse_response(raw: &str, phase: InterviewPhase) -> ParsedResponse {
    let mut parsed = ParsedResponse::free_form(String::new());
    let mut effective_phase = phase;

    let mut content = String::new();
    let mut in_block = false;
    let mut block = String::new();

    for line in raw.lines() {
        if !in_block && line.trim() == MARKER_OPEN {
            in_block = true;
            block.clear();
        } else if in_block && line.trim() == MARKER_CLOSE {
            in_block = false;
            apply_block(&block, &mut parsed, &mut effective_phase);
        } else if in_block {
            block.push_str(line);
            block.push('\n');
        } else {
            content.push_str(line);
            content.push('\n');
        }
    }

    // Unterminated marker: the fence never closed, so the text is prose.
    if in_block {
        content.push_str(MARKER_OPEN);
        content.push('\n');
        content.push_str(&block);
        parsed.warnings.push(ParseWarning::MalformedPayload {
            detail: "unterminated marker fence".to_string(),
        });
    }

    parsed.content = content.trim().to_string();
    parsed
}

/// Interpret one fenced block, honoring it or recording a warning.
fn apply_block(body: &str, parsed: &mut ParsedResponse, effective_phase: &mut InterviewPhase) {
    let json: serde_json::Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            parsed.warnings.push(ParseWarning::MalformedPayload {
                detail: e.to_string(),
            });
            return;
        }
    };

    let kind = match json.get("kind").and_then(|k| k.as_str()) {
        Some(k) => k,
        None => {
            parsed.warnings.push(ParseWarning::MalformedPayload {
                detail: "missing 'kind' discriminator".to_string(),
            });
            return;
        }
    };

    match kind {
        "complete" => {
            if parsed.is_complete {
                parsed.warnings.push(ParseWarning::ExtraMarker {
                    kind: kind.to_string(),
                });
                return;
            }
            parsed.is_complete = true;
            *effective_phase = InterviewPhase::Generating;
        }
        "question" => {
            if *effective_phase == InterviewPhase::Generating {
                parsed.warnings.push(ParseWarning::KindMismatch {
                    found: kind.to_string(),
                    phase: *effective_phase,
                });
                return;
            }
            if parsed.question.is_some() {
                parsed.warnings.push(ParseWarning::ExtraMarker {
                    kind: kind.to_string(),
                });
                return;
            }
            match extract_question(&json) {
                Some(q) => parsed.question = Some(q),
                None => parsed.warnings.push(ParseWarning::MalformedPayload {
                    detail: "question payload missing 'prompt'".to_string(),
                }),
            }
        }
        "prd" => {
            if *effective_phase != InterviewPhase::Generating {
                parsed.warnings.push(ParseWarning::KindMismatch {
                    found: kind.to_string(),
                    phase: *effective_phase,
                });
                return;
            }
            if parsed.prd.is_some() || parsed.question.is_some() {
                parsed.warnings.push(ParseWarning::ExtraMarker {
                    kind: kind.to_string(),
                });
                return;
            }
            let payload = json.get("prd").unwrap_or(&json);
            match PrdDraft::from_json(payload) {
                Some(prd) => parsed.prd = Some(prd),
                None => parsed.warnings.push(ParseWarning::MalformedPayload {
                    detail: "prd payload missing 'overview'".to_string(),
                }),
            }
        }
        other => {
            parsed.warnings.push(ParseWarning::UnknownKind {
                found: other.to_string(),
            });
        }
    }
}

/// Pull a [`StructuredQuestion`] from a `question` payload.
///
/// Accepts either a single `question` object or a `questions` list (first
/// entry taken; the assistant is prompted to ask one question per turn).
fn extract_question(json: &serde_json::Value) -> Option<StructuredQuestion> {
    let obj = json.get("question").or_else(|| {
        json.get("questions")
            .and_then(|v| v.as_array())
            .and_then(|arr| arr.first())
    })?;

    let prompt = obj.get("prompt").and_then(|p| p.as_str())?;
    if prompt.trim().is_empty() {
        return None;
    }

    let choices = obj
        .get("choices")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|c| c.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let multi_select = obj
        .get("multi_select")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    Some(StructuredQuestion {
        prompt: prompt.to_string(),
        choices,
        multi_select,
    })
}

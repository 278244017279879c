//! Structured questions posed by the assistant

use serde::{Deserialize, Serialize};

/// A question the assistant wants answered, optionally with an enumerated
/// choice set.
///
/// Three shapes: free text (no choices), single-select, multi-select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredQuestion {
    /// The question text shown to the user.
    pub prompt: String,
    /// Enumerated choices; empty means free-text.
    #[serde(default)]
    pub choices: Vec<String>,
    /// Whether multiple choices may be selected.
    #[serde(default)]
    pub multi_select: bool,
}

impl StructuredQuestion {
    pub fn free_text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            choices: Vec::new(),
            multi_select: false,
        }
    }

    pub fn single_select(prompt: impl Into<String>, choices: Vec<String>) -> Self {
        Self {
            prompt: prompt.into(),
            choices,
            multi_select: false,
        }
    }

    pub fn multi_select(prompt: impl Into<String>, choices: Vec<String>) -> Self {
        Self {
            prompt: prompt.into(),
            choices,
            multi_select: true,
        }
    }

    pub fn is_free_text(&self) -> bool {
        self.choices.is_empty()
    }

    /// Validate a user answer against this question's shape.
    ///
    /// For choice questions the answer is one choice (or, multi-select, a
    /// comma-separated list) given either as 1-based index or verbatim
    /// choice text. Returns the normalized answer.
    pub fn check_answer(&self, answer: &str) -> Result<String, AnswerError> {
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(AnswerError::Empty);
        }

        if self.is_free_text() {
            return Ok(answer.to_string());
        }

        let parts: Vec<&str> = if self.multi_select {
            answer.split(',').map(str::trim).filter(|s| !s.is_empty()).collect()
        } else {
            vec![answer]
        };

        if !self.multi_select && parts.len() != 1 {
            return Err(AnswerError::MultipleNotAllowed);
        }

        let mut selected = Vec::with_capacity(parts.len());
        for part in parts {
            let choice = self.resolve_choice(part).ok_or_else(|| AnswerError::UnknownChoice {
                given: part.to_string(),
            })?;
            if !selected.contains(&choice) {
                selected.push(choice);
            }
        }

        Ok(selected.join(", "))
    }

    fn resolve_choice(&self, part: &str) -> Option<String> {
        if let Ok(index) = part.parse::<usize>()
            && index >= 1
            && index <= self.choices.len()
        {
            return Some(self.choices[index - 1].clone());
        }
        self.choices
            .iter()
            .find(|c| c.eq_ignore_ascii_case(part))
            .cloned()
    }
}

/// Why a user answer was rejected locally (before reaching the provider).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnswerError {
    #[error("answer cannot be empty")]
    Empty,
    #[error("this question takes a single choice")]
    MultipleNotAllowed,
    #[error("'{given}' is not one of the offered choices")]
    UnknownChoice { given: String },
}

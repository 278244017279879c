//! PRD rendering from already-validated data
//!
//! The orchestrator only completes with a PRD that passed validation, so
//! rendering here is pure formatting with no error paths.

use prdgen_domain::{Feature, PrdDraft};

/// Renders a validated [`PrdDraft`] to markdown or JSON.
pub struct MarkdownFormatter;

impl MarkdownFormatter {
    /// Render the PRD as a markdown document.
    pub fn format(feature: &Feature, prd: &PrdDraft) -> String {
        let mut out = String::new();

        out.push_str(&format!("# PRD: {}\n\n", feature));

        out.push_str("## Overview\n\n");
        out.push_str(prd.overview.trim());
        out.push_str("\n\n");

        out.push_str("## User Stories\n\n");
        for (i, story) in prd.user_stories.iter().enumerate() {
            out.push_str(&format!("### {}. {}\n\n", i + 1, story.title));
            if !story.description.trim().is_empty() {
                out.push_str(story.description.trim());
                out.push_str("\n\n");
            }
            if !story.acceptance_criteria.is_empty() {
                out.push_str("Acceptance criteria:\n\n");
                for criterion in &story.acceptance_criteria {
                    out.push_str(&format!("- [ ] {}\n", criterion));
                }
                out.push('\n');
            }
        }

        if !prd.technical_notes.trim().is_empty() {
            out.push_str("## Technical Notes\n\n");
            out.push_str(prd.technical_notes.trim());
            out.push('\n');
        }

        out
    }

    /// Render the PRD as pretty JSON (for machine consumption).
    pub fn format_json(feature: &Feature, prd: &PrdDraft) -> String {
        serde_json::to_string_pretty(&serde_json::json!({
            "feature": feature.description(),
            "prd": prd,
        }))
        .unwrap_or_else(|_| "{}".to_string())
    }
}

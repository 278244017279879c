//! PRD draft entity and payload extraction
//!
//! The PRD is the interview's end product. The assistant delivers it as a
//! JSON payload inside a structured marker; [`PrdDraft::from_json`] applies
//! the same defensive field handling the rest of the parser uses, and
//! [`PrdDraft::validate`] reports one issue per malformed field.

use serde::{Deserialize, Serialize};

/// A user story within the PRD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStory {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
}

/// The structured requirements document produced at session completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrdDraft {
    pub overview: String,
    #[serde(default)]
    pub user_stories: Vec<UserStory>,
    #[serde(default)]
    pub technical_notes: String,
}

impl PrdDraft {
    /// Parse a PRD from a JSON payload.
    ///
    /// Expected schema:
    /// ```json
    /// {
    ///   "overview": "string",
    ///   "user_stories": [
    ///     {"title": "...", "description": "...", "acceptance_criteria": ["..."]}
    ///   ],
    ///   "technical_notes": "string"
    /// }
    /// ```
    ///
    /// Returns `None` if `overview` is missing; everything else degrades
    /// to empty defaults and is caught by [`validate`](Self::validate).
    pub fn from_json(json: &serde_json::Value) -> Option<Self> {
        let overview = json.get("overview")?.as_str()?.to_string();

        let user_stories = json
            .get("user_stories")
            .and_then(|v| v.as_array())
            .map(|stories| {
                stories
                    .iter()
                    .filter_map(|s| {
                        let title = s.get("title")?.as_str()?.to_string();
                        let description = s
                            .get("description")
                            .and_then(|v| v.as_str())
                            .unwrap_or("")
                            .to_string();
                        let acceptance_criteria = s
                            .get("acceptance_criteria")
                            .and_then(|v| v.as_array())
                            .map(|arr| {
                                arr.iter()
                                    .filter_map(|c| c.as_str())
                                    .map(str::to_string)
                                    .collect()
                            })
                            .unwrap_or_default();
                        Some(UserStory {
                            title,
                            description,
                            acceptance_criteria,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let technical_notes = json
            .get("technical_notes")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        Some(Self {
            overview,
            user_stories,
            technical_notes,
        })
    }

    /// Validate the draft, returning one message per problem found.
    /// An empty result means the PRD is acceptable for rendering.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.overview.trim().is_empty() {
            issues.push("overview is empty".to_string());
        }
        if self.user_stories.is_empty() {
            issues.push("no user stories".to_string());
        }
        for (i, story) in self.user_stories.iter().enumerate() {
            if story.title.trim().is_empty() {
                issues.push(format!("user story {} has an empty title", i + 1));
            }
            if story.acceptance_criteria.is_empty() {
                issues.push(format!(
                    "user story {} ('{}') has no acceptance criteria",
                    i + 1,
                    story.title
                ));
            }
        }

        issues
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> serde_json::Value {
        serde_json::json!({
            "overview": "Let users sign in with email and password.",
            "user_stories": [
                {
                    "title": "Sign in",
                    "description": "As a user I can sign in",
                    "acceptance_criteria": ["Valid credentials grant a session"]
                }
            ],
            "technical_notes": "Argon2 for hashing."
        })
    }

    #[test]
    fn parses_well_formed_payload() {
        let prd = PrdDraft::from_json(&sample_json()).unwrap();
        assert_eq!(prd.user_stories.len(), 1);
        assert_eq!(prd.user_stories[0].acceptance_criteria.len(), 1);
        assert!(prd.is_valid());
    }

    #[test]
    fn missing_overview_returns_none() {
        let json = serde_json::json!({"user_stories": []});
        assert!(PrdDraft::from_json(&json).is_none());
    }

    #[test]
    fn validation_reports_one_issue_per_field() {
        let prd = PrdDraft {
            overview: "  ".to_string(),
            user_stories: vec![UserStory {
                title: String::new(),
                description: "d".to_string(),
                acceptance_criteria: vec![],
            }],
            technical_notes: String::new(),
        };
        let issues = prd.validate();
        assert_eq!(issues.len(), 3);
    }

    #[test]
    fn story_without_criteria_degrades_but_fails_validation() {
        let json = serde_json::json!({
            "overview": "Something",
            "user_stories": [{"title": "Story", "description": "d"}]
        });
        let prd = PrdDraft::from_json(&json).unwrap();
        assert!(!prd.is_valid());
    }
}

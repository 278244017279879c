//! Feature value object

use serde::{Deserialize, Serialize};

/// The feature under discussion (Value Object)
///
/// Represents the one-line feature description the whole interview
/// revolves around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Feature {
    description: String,
}

impl Feature {
    /// Create a new feature description
    ///
    /// # Panics
    /// Panics if the description is empty or only whitespace
    pub fn new(description: impl Into<String>) -> Self {
        let description = description.into();
        assert!(
            !description.trim().is_empty(),
            "Feature description cannot be empty"
        );
        Self { description }
    }

    /// Try to create a feature description, returning None if invalid
    pub fn try_new(description: impl Into<String>) -> Option<Self> {
        let description = description.into();
        if description.trim().is_empty() {
            None
        } else {
            Some(Self { description })
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn into_description(self) -> String {
        self.description
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description)
    }
}

impl From<&str> for Feature {
    fn from(s: &str) -> Self {
        Feature::new(s)
    }
}

impl From<String> for Feature {
    fn from(s: String) -> Self {
        Feature::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_creation() {
        let f = Feature::new("add user authentication");
        assert_eq!(f.description(), "add user authentication");
    }

    #[test]
    #[should_panic]
    fn test_empty_feature_panics() {
        Feature::new("   ");
    }

    #[test]
    fn test_try_new() {
        assert!(Feature::try_new("").is_none());
        assert!(Feature::try_new("  ").is_none());
        assert!(Feature::try_new("dark mode").is_some());
    }

    #[test]
    fn test_serde_transparent() {
        let f = Feature::new("export to CSV");
        let json = serde_json::to_string(&f).unwrap();
        assert_eq!(json, "\"export to CSV\"");
        let back: Feature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, f);
    }
}

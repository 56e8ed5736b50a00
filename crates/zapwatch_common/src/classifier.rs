//! Error classifier
//!
//! Maps a raw error message to a human readable cause. Rules are checked in
//! order against the lowercased message and the first substring hit wins, so
//! rule order is part of the contract.

use serde::{Deserialize, Serialize};

/// Returned when no rule matches
pub const FALLBACK_EXPLANATION: &str = "No specific explanation available";

/// One substring pattern and the explanation it maps to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierRule {
    pub pattern: String,
    pub explanation: String,
}

impl ClassifierRule {
    pub fn new(pattern: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            explanation: explanation.into(),
        }
    }
}

/// Built-in rule table, in match order
pub fn default_rules() -> Vec<ClassifierRule> {
    vec![
        ClassifierRule::new("not found", "Resource was renamed or deleted"),
        ClassifierRule::new("missing required field", "Check if field names changed"),
        ClassifierRule::new("auth expired", "Reauthorization needed"),
        ClassifierRule::new("rate limit", "API rate limit reached"),
        ClassifierRule::new("invalid data type", "Check field mappings"),
    ]
}

/// Immutable, ordered substring classifier
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<ClassifierRule>,
}

impl Classifier {
    /// Build a classifier over `rules`. Patterns are lowercased once here.
    pub fn new(rules: Vec<ClassifierRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|r| ClassifierRule {
                pattern: r.pattern.to_lowercase(),
                explanation: r.explanation,
            })
            .collect();
        Self { rules }
    }

    pub fn rules(&self) -> &[ClassifierRule] {
        &self.rules
    }

    pub fn explain(&self, error_message: &str) -> &str {
        let lowered = error_message.to_lowercase();
        self.rules
            .iter()
            .find(|rule| lowered.contains(rule.pattern.as_str()))
            .map(|rule| rule.explanation.as_str())
            .unwrap_or(FALLBACK_EXPLANATION)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

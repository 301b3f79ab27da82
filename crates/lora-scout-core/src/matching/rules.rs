//! Tunable word lists used by the name matcher.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A literal substring substitution applied after lowercasing.
///
/// Used to split known words that filenames tend to glue together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionRule {
    pub pattern: String,
    pub replacement: String,
}

impl SubstitutionRule {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }

    fn apply(&self, input: &str) -> String {
        if self.pattern.is_empty() {
            return input.to_string();
        }
        input.replace(&self.pattern, &self.replacement)
    }
}

/// Word lists driving normalization and keyword extraction.
///
/// `MatchRules::default()` reproduces the stock behavior. Rules are applied
/// in list order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRules {
    /// Ordered literal substitutions for concatenated words.
    pub substitutions: Vec<SubstitutionRule>,
    /// Tokens never used as search keywords.
    pub stopwords: BTreeSet<String>,
    /// Shortest token accepted as a keyword.
    pub min_keyword_len: usize,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            substitutions: vec![SubstitutionRule::new("breastin", "breast in")],
            stopwords: ["lora", "model", "sd", "xl", "v1", "v2", "the", "and", "or", "of"]
                .into_iter()
                .map(String::from)
                .collect(),
            min_keyword_len: 3,
        }
    }
}

impl MatchRules {
    /// Append a substitution rule. Later rules see the output of earlier ones.
    pub fn with_substitution(
        mut self,
        pattern: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        self.substitutions
            .push(SubstitutionRule::new(pattern, replacement));
        self
    }

    /// Add a stopword. Stored lowercase.
    pub fn with_stopword(mut self, word: &str) -> Self {
        self.stopwords.insert(word.to_lowercase());
        self
    }

    pub(crate) fn apply_substitutions(&self, input: &str) -> String {
        self.substitutions
            .iter()
            .fold(input.to_string(), |acc, rule| rule.apply(&acc))
    }

    pub(crate) fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(&token.to_lowercase())
    }
}

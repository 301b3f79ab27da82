//! Best-candidate selection over pooled catalog results.

use super::rules::MatchRules;
use super::similarity::similarity_with;
use crate::catalog::{CatalogId, CatalogModel};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What a winning score was computed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MatchSource {
    /// The catalog model's display name.
    DisplayName,
    /// One of the model's version file names.
    FileName(String),
}

/// Outcome of candidate selection.
///
/// The core only scores; whether a score is good enough is decided by the
/// caller through an [`AcceptancePolicy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub candidate: Option<CatalogModel>,
    pub score: f64,
    pub matched_on: Option<MatchSource>,
}

impl MatchResult {
    /// The empty result: no candidate, score `0.0`.
    pub fn none() -> Self {
        Self {
            candidate: None,
            score: 0.0,
            matched_on: None,
        }
    }

    /// Whether a candidate exists and meets the policy threshold.
    pub fn is_confident(&self, policy: AcceptancePolicy) -> bool {
        self.candidate.is_some() && policy.accepts(self.score)
    }
}

/// Minimum score a caller requires before acting on a match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcceptancePolicy {
    pub min_score: f64,
}

impl AcceptancePolicy {
    /// Threshold used by the multi-strategy search path.
    pub const ENHANCED: Self = Self { min_score: 0.2 };

    /// Stricter threshold used by the single-query path.
    pub const LEGACY: Self = Self { min_score: 0.3 };

    pub fn new(min_score: f64) -> Self {
        Self {
            min_score: min_score.clamp(0.0, 1.0),
        }
    }

    pub fn accepts(&self, score: f64) -> bool {
        score >= self.min_score
    }
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self::ENHANCED
    }
}

/// Deduplicate candidates by id, keeping the first occurrence.
///
/// Records without an id share a single slot.
pub fn dedup_candidates(candidates: &[CatalogModel]) -> Vec<&CatalogModel> {
    let mut seen: HashSet<Option<&CatalogId>> = HashSet::new();
    candidates
        .iter()
        .filter(|c| seen.insert(c.id.as_ref()))
        .collect()
}

/// Pick the candidate whose display name or file names best match `raw`.
///
/// A file-name match credits the owning model. Only a strictly higher score
/// replaces the current best, so the first candidate wins ties and
/// candidates scoring `0.0` are never selected.
pub fn select_best_with(rules: &MatchRules, raw: &str, candidates: &[CatalogModel]) -> MatchResult {
    let mut best: Option<&CatalogModel> = None;
    let mut best_score = 0.0;
    let mut matched_on = None;

    for candidate in dedup_candidates(candidates) {
        let score = similarity_with(rules, raw, candidate.display_name());
        if score > best_score {
            best_score = score;
            best = Some(candidate);
            matched_on = Some(MatchSource::DisplayName);
        }

        for file_name in candidate.file_names() {
            let score = similarity_with(rules, raw, file_name);
            if score > best_score {
                best_score = score;
                best = Some(candidate);
                matched_on = Some(MatchSource::FileName(file_name.to_string()));
            }
        }
    }

    MatchResult {
        candidate: best.cloned(),
        score: best_score,
        matched_on,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogFile, ModelVersion};

    fn model(id: i64, name: &str, files: &[&str]) -> CatalogModel {
        CatalogModel {
            id: Some(CatalogId::Int(id)),
            name: name.to_string(),
            model_versions: vec![ModelVersion {
                files: files
                    .iter()
                    .map(|f| CatalogFile {
                        name: f.to_string(),
                        ..CatalogFile::default()
                    })
                    .collect(),
                ..ModelVersion::default()
            }],
            ..CatalogModel::default()
        }
    }

    fn select(raw: &str, candidates: &[CatalogModel]) -> MatchResult {
        select_best_with(&MatchRules::default(), raw, candidates)
    }

    #[test]
    fn test_empty_pool() {
        let result = select("addams", &[]);
        assert_eq!(result, MatchResult::none());
    }

    #[test]
    fn test_dedup_by_id_preserves_first_seen() {
        let pool = vec![
            model(1, "Foo", &[]),
            model(1, "Foo", &[]),
            model(2, "Bar", &[]),
        ];
        let unique = dedup_candidates(&pool);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].name, "Foo");
        assert_eq!(unique[1].name, "Bar");

        let reordered = vec![model(2, "Bar", &[]), model(1, "Foo", &[]), model(1, "Foo", &[])];
        assert_eq!(dedup_candidates(&reordered).len(), 2);
    }

    #[test]
    fn test_missing_ids_share_a_slot() {
        let mut a = model(0, "Foo", &[]);
        a.id = None;
        let mut b = model(0, "Bar", &[]);
        b.id = None;
        let pool = vec![a, b];
        let unique = dedup_candidates(&pool);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].name, "Foo");
    }

    #[test]
    fn test_display_name_match() {
        let pool = vec![
            model(1, "Chinese Girl Portrait", &[]),
            model(2, "Addams Family Style", &[]),
        ];
        let result = select("Addams", &pool);
        assert_eq!(result.candidate.unwrap().name, "Addams Family Style");
        assert_eq!(result.score, 0.8);
        assert_eq!(result.matched_on, Some(MatchSource::DisplayName));
    }

    #[test]
    fn test_file_name_match_credits_model() {
        let pool = vec![
            model(1, "Hands Pack", &["goodhands_beta2.safetensors"]),
            model(2, "Good Hands Collection", &[]),
        ];
        let result = select("GoodHands-beta2", &pool);
        let candidate = result.candidate.unwrap();
        assert_eq!(candidate.id, Some(CatalogId::Int(1)));
        assert_eq!(result.score, 1.0);
        assert_eq!(
            result.matched_on,
            Some(MatchSource::FileName("goodhands_beta2.safetensors".into()))
        );
    }

    #[test]
    fn test_ties_keep_first_candidate() {
        let pool = vec![model(1, "Addams", &[]), model(2, "addams", &[])];
        let result = select("addams", &pool);
        assert_eq!(result.candidate.unwrap().id, Some(CatalogId::Int(1)));
    }

    #[test]
    fn test_zero_scores_select_nothing() {
        let pool = vec![model(1, "xyz", &[])];
        let result = select("abc", &pool);
        assert!(result.candidate.is_none());
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_acceptance_policy() {
        let pool = vec![model(1, "Good Hands", &[])];
        // Scores 0.2 exactly.
        let result = select("GoodHands-beta2", &pool);
        assert!(result.is_confident(AcceptancePolicy::ENHANCED));
        assert!(!result.is_confident(AcceptancePolicy::LEGACY));
        assert!(!MatchResult::none().is_confident(AcceptancePolicy::new(0.0)));
        assert_eq!(AcceptancePolicy::new(4.0).min_score, 1.0);
    }
}

//! Bounded name similarity.
//!
//! Blends character edit distance with word-set overlap after both inputs
//! have been normalized the same way.

use super::normalize::normalize_with;
use super::rules::MatchRules;
use std::collections::HashSet;

/// Score returned when the normalized names are identical.
pub const EXACT_SCORE: f64 = 1.0;

/// Score returned when one normalized name contains the other.
pub const CONTAINMENT_SCORE: f64 = 0.8;

/// Weight of the edit-distance component in the blended score.
const LEVENSHTEIN_WEIGHT: f64 = 0.4;

/// Weight of the word-overlap component in the blended score.
const WORD_OVERLAP_WEIGHT: f64 = 0.6;

/// Compute a similarity in `[0.0, 1.0]` between two raw names.
///
/// The first matching rule wins:
/// 1. Equal after normalization: `1.0`
/// 2. One normalized form contains the other: `0.8` (an empty form is
///    contained in everything)
/// 3. `0.4 * levenshtein_similarity + 0.6 * jaccard_word_similarity`
pub fn similarity_with(rules: &MatchRules, a: &str, b: &str) -> f64 {
    let norm_a = normalize_with(rules, a).to_lowercase();
    let norm_b = normalize_with(rules, b).to_lowercase();

    if norm_a == norm_b {
        return EXACT_SCORE;
    }

    if norm_a.contains(&norm_b) || norm_b.contains(&norm_a) {
        return CONTAINMENT_SCORE;
    }

    let max_len = norm_a.chars().count().max(norm_b.chars().count());
    if max_len == 0 {
        return 0.0;
    }
    let distance = strsim::levenshtein(&norm_a, &norm_b);
    let lev_similarity = 1.0 - (distance as f64 / max_len as f64);

    let words_a: HashSet<&str> = norm_a.split_whitespace().collect();
    let words_b: HashSet<&str> = norm_b.split_whitespace().collect();
    if words_a.is_empty() && words_b.is_empty() {
        return 1.0;
    }
    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let word_similarity = jaccard(&words_a, &words_b);

    let combined = lev_similarity * LEVENSHTEIN_WEIGHT + word_similarity * WORD_OVERLAP_WEIGHT;
    combined.max(0.0)
}

fn jaccard(a: &HashSet<&str>, b: &HashSet<&str>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

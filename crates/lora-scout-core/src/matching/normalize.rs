//! Search-friendly name normalization and keyword extraction.
//!
//! Turns a local filename stem such as `breastinClass_v16.safetensors` into a
//! lowercase, space-separated phrase suitable for catalog queries.

use super::rules::MatchRules;
use regex::Regex;
use std::sync::LazyLock;

/// Trailing model-file extension.
static EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(safetensors|ckpt|pt)$").expect("valid regex"));

/// Lowercase letter followed by uppercase letter.
static CAMEL_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z])([A-Z])").expect("valid regex"));

static LETTER_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z])(\d)").expect("valid regex"));

static DIGIT_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d)([a-z])").expect("valid regex"));

/// Runs of underscores/hyphens.
static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[_-]+").expect("valid regex"));

/// `v1`, `v16`, `v1.5` as whole words.
static VERSION_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bv\d+(\.\d+)?\b").expect("valid regex"));

/// `sd`, `sd15`, `sd1.5`, `xl` as whole words.
static BASE_MODEL_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(sd|xl)\d*(\.\d+)?\b").expect("valid regex"));

/// `lora`, `loras`, `model`, `models` as whole words.
static NOISE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(lora|model)s?\b").expect("valid regex"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Normalize a raw LoRA name for searching and comparison.
///
/// # Rules Applied
/// 1. Strip a trailing `.safetensors` / `.ckpt` / `.pt` (any case)
/// 2. Lowercase
/// 3. Apply the substitution rules in order
/// 4. Split camel-case boundaries (only reachable when a substitution
///    reintroduces upper case, since step 2 already lowercased)
/// 5. Split letter/digit and digit/letter boundaries
/// 6. Underscore/hyphen runs become a single space
/// 7. Drop version tokens (`v1`, `v1.5`)
/// 8. Drop base-model tokens (`sd1.5`, `xl`)
/// 9. Drop `lora(s)` / `model(s)`
/// 10. Collapse whitespace and trim
///
/// Step 5 runs before step 7, so `v16` has already become `v 16` by the
/// time version tokens are removed and survives as two tokens.
///
/// # Examples
///
/// ```
/// use lora_scout_core::matching::normalize_with;
/// use lora_scout_core::matching::MatchRules;
///
/// let rules = MatchRules::default();
/// assert_eq!(normalize_with(&rules, "Addams_LoRA.safetensors"), "addams");
/// assert_eq!(normalize_with(&rules, "GoodHands-beta2"), "goodhands beta 2");
/// ```
pub fn normalize_with(rules: &MatchRules, raw: &str) -> String {
    let name = EXTENSION.replace(raw, "");
    let name = name.to_lowercase();
    let name = rules.apply_substitutions(&name);
    let name = CAMEL_BOUNDARY.replace_all(&name, "${1} ${2}");
    let name = LETTER_DIGIT.replace_all(&name, "${1} ${2}");
    let name = DIGIT_LETTER.replace_all(&name, "${1} ${2}");
    let name = SEPARATORS.replace_all(&name, " ");
    let name = VERSION_TOKEN.replace_all(&name, "");
    let name = BASE_MODEL_TOKEN.replace_all(&name, "");
    let name = NOISE_WORD.replace_all(&name, "");
    WHITESPACE.replace_all(&name, " ").trim().to_string()
}

/// Extract search keywords from a raw LoRA name.
///
/// Keeps tokens of the normalized name that are at least
/// `rules.min_keyword_len` characters long and not stopwords, in order of
/// appearance. Duplicates are kept.
pub fn extract_keywords_with(rules: &MatchRules, raw: &str) -> Vec<String> {
    normalize_with(rules, raw)
        .split_whitespace()
        .filter(|word| word.chars().count() >= rules.min_keyword_len && !rules.is_stopword(word))
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(raw: &str) -> String {
        normalize_with(&MatchRules::default(), raw)
    }

    fn keywords(raw: &str) -> Vec<String> {
        extract_keywords_with(&MatchRules::default(), raw)
    }

    #[test]
    fn test_normalize_strips_extension_case_insensitive() {
        assert_eq!(norm("Addams.SAFETENSORS"), "addams");
        assert_eq!(norm("addams.ckpt"), "addams");
        assert_eq!(norm("addams.pt"), "addams");
        // Only a trailing extension is removed.
        assert_eq!(norm("addams.pth"), "addams.pth");
    }

    #[test]
    fn test_normalize_concatenation_fix() {
        assert_eq!(norm("breastin"), "breast in");
        assert_eq!(
            norm("breastinClass_v16.safetensors"),
            "breast inclass v 16"
        );
    }

    #[test]
    fn test_normalize_digit_boundaries() {
        assert_eq!(norm("GoodHands-beta2"), "goodhands beta 2");
        assert_eq!(norm("zyd232sChineseGirl_v16"), "zyd 232 schinesegirl v 16");
    }

    #[test]
    fn test_normalize_drops_noise_words() {
        assert_eq!(norm("example_lora_v1.safetensors"), "example v 1");
        assert_eq!(norm("Example LoRA Model"), "example");
        assert_eq!(norm("my_loras_models"), "my");
        assert_eq!(norm("lora"), "");
    }

    #[test]
    fn test_normalize_drops_base_model_tokens() {
        assert_eq!(norm("Example Model LoRA - SD1.5"), "example 1.5");
        assert_eq!(norm("style xl"), "style");
        // Not a whole word.
        assert_eq!(norm("SDXL-1.0-Base"), "sdxl 1.0 base");
    }

    #[test]
    fn test_version_token_split_before_removal() {
        assert_eq!(norm("anime v2 style"), "anime v 2 style");
        assert_eq!(norm("anime V1.5 style"), "anime v 1.5 style");

        // An upper-case marker produced by a substitution skips the digit split.
        let rules = MatchRules::default().with_substitution("beta", "V2");
        assert_eq!(normalize_with(&rules, "anime beta"), "anime");
    }

    #[test]
    fn test_camel_case_only_reachable_through_substitution() {
        // Lowercasing happens first, so plain camel-case input is not split.
        assert_eq!(norm("TestLoRA-StyleTransfer"), "testlora styletransfer");

        let rules = MatchRules::default().with_substitution("goodhands", "goodHands");
        assert_eq!(normalize_with(&rules, "GoodHands"), "good Hands");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(norm(""), "");
        assert_eq!(norm("   "), "");
        assert_eq!(norm("__--__"), "");
    }

    #[test]
    fn test_keywords() {
        assert_eq!(keywords("breastinClass_v16.safetensors"), vec!["breast", "inclass"]);
        assert_eq!(keywords("test_model_v2.1.ckpt"), vec!["test", "2.1"]);
        assert_eq!(
            keywords("zyd232sChineseGirl_v16"),
            vec!["zyd", "232", "schinesegirl"]
        );
        assert_eq!(keywords("Addams Family Style"), vec!["addams", "family", "style"]);
    }

    #[test]
    fn test_keywords_filter_short_and_stopwords() {
        assert_eq!(keywords("the art of ink"), vec!["art", "ink"]);
        assert!(keywords("").is_empty());
        assert!(keywords("lora").is_empty());
    }

    #[test]
    fn test_keywords_keep_duplicates() {
        assert_eq!(keywords("v1.5 sd1.5"), vec!["1.5", "1.5"]);
        assert_eq!(keywords("ink_ink"), vec!["ink", "ink"]);
    }

    #[test]
    fn test_custom_min_keyword_len() {
        let rules = MatchRules {
            min_keyword_len: 6,
            ..MatchRules::default()
        };
        assert_eq!(extract_keywords_with(&rules, "addams family"), vec!["addams", "family"]);
        assert_eq!(extract_keywords_with(&rules, "ink style"), Vec::<String>::new());
    }
}

//! Multi-strategy catalog search.
//!
//! A single local name is turned into up to four queries. Each query is sent
//! independently and all returned records are pooled for scoring.

use super::types::CatalogModel;
use crate::config::CatalogConfig;
use crate::error::{Result, ScoutError};
use crate::matching::NameMatcher;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// A searchable model catalog.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Search LoRA models matching `query`, returning at most `limit` records.
    ///
    /// A non-success HTTP status should be reported as
    /// [`ScoutError::CatalogStatus`] so it can be logged as such.
    async fn search_models(&self, query: &str, limit: u32) -> Result<Vec<CatalogModel>>;
}

/// Query-construction approach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Original,
    Normalized,
    Keywords,
    FirstKeyword,
}

impl StrategyKind {
    pub fn label(&self) -> &'static str {
        match self {
            StrategyKind::Original => "original",
            StrategyKind::Normalized => "normalized",
            StrategyKind::Keywords => "keywords",
            StrategyKind::FirstKeyword => "first_keyword",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A labelled query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStrategy {
    pub kind: StrategyKind,
    pub query: String,
}

/// Build the search strategies for a raw name, in declaration order.
///
/// - `original`: the raw name verbatim
/// - `normalized`: only if it differs from the raw name and is not blank
/// - `keywords`: the first three keywords, if any
/// - `first_keyword`: the first keyword alone, if at least five chars long
pub fn build_strategies(raw: &str, matcher: &NameMatcher) -> Vec<SearchStrategy> {
    let mut strategies = vec![SearchStrategy {
        kind: StrategyKind::Original,
        query: raw.to_string(),
    }];

    let normalized = matcher.normalize(raw);
    if normalized != raw && !normalized.trim().is_empty() {
        strategies.push(SearchStrategy {
            kind: StrategyKind::Normalized,
            query: normalized,
        });
    }

    let keywords = matcher.extract_keywords(raw);
    if let Some(first) = keywords.first() {
        let joined = keywords
            .iter()
            .take(CatalogConfig::KEYWORD_QUERY_TERMS)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        strategies.push(SearchStrategy {
            kind: StrategyKind::Keywords,
            query: joined,
        });

        if first.chars().count() >= CatalogConfig::FIRST_KEYWORD_MIN_LEN {
            strategies.push(SearchStrategy {
                kind: StrategyKind::FirstKeyword,
                query: first.clone(),
            });
        }
    }

    strategies
}

/// How one strategy's request ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StrategyOutcome {
    Results(usize),
    HttpStatus(u16),
    Error(String),
}

/// One line of the strategy log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyLogEntry {
    pub strategy: SearchStrategy,
    pub outcome: StrategyOutcome,
}

impl fmt::Display for StrategyLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: '{}' ", self.strategy.kind, self.strategy.query)?;
        match &self.outcome {
            StrategyOutcome::Results(n) => write!(f, "({} results)", n),
            StrategyOutcome::HttpStatus(code) => write!(f, "(HTTP {})", code),
            StrategyOutcome::Error(msg) => write!(f, "(Error: {})", msg),
        }
    }
}

/// Pooled candidates plus the per-strategy log.
///
/// Candidates are not deduplicated here; selection does that.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PooledSearch {
    pub candidates: Vec<CatalogModel>,
    pub log: Vec<StrategyLogEntry>,
}

impl PooledSearch {
    /// Log entries rendered as display strings.
    pub fn log_lines(&self) -> Vec<String> {
        self.log.iter().map(ToString::to_string).collect()
    }
}

/// Run every strategy serially against `source` and pool the results.
///
/// Never fails: a failed strategy is logged and the next one is tried.
pub async fn search_with_strategies(
    source: &dyn CatalogSource,
    raw: &str,
    matcher: &NameMatcher,
) -> PooledSearch {
    let mut pooled = PooledSearch::default();

    for strategy in build_strategies(raw, matcher) {
        if strategy.query.trim().is_empty() {
            continue;
        }

        let outcome = match source
            .search_models(&strategy.query, CatalogConfig::RESULTS_PER_QUERY)
            .await
        {
            Ok(models) => {
                let count = models.len();
                pooled.candidates.extend(models);
                StrategyOutcome::Results(count)
            }
            Err(ScoutError::CatalogStatus { status, .. }) => StrategyOutcome::HttpStatus(status),
            Err(e) => {
                warn!("Catalog search failed for {} strategy: {}", strategy.kind, e);
                StrategyOutcome::Error(e.to_string())
            }
        };

        let entry = StrategyLogEntry { strategy, outcome };
        debug!("{}", entry);
        pooled.log.push(entry);
    }

    pooled
}

use crate::error::{Result, SearchError};
use expertmatch_protocol::{ParsedQuery, QueryIntent, SearchSource, SourceWeights};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Keyword weight when the query names technologies.
const TECH_QUERY_KEYWORD_WEIGHT: f64 = 0.8;
/// Graph weight for team formation queries.
const TEAM_FORMATION_GRAPH_WEIGHT: f64 = 1.0;

/// Engine-wide retrieval tuning, typically loaded from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub source_weights: SourceWeights,
    pub adaptive_weights: bool,
    /// Rank offset in `weight / (rrf_k + rank + 1)`.
    pub rrf_k: f64,
    pub vector_min_similarity: f32,
    pub candidate_multiplier: usize,
    pub source_timeout_ms: u64,
    pub max_refined_queries: usize,
    pub expansion_concurrency: usize,
    pub placeholder_score: f64,
    pub missing_score: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            source_weights: SourceWeights::standard(),
            adaptive_weights: true,
            rrf_k: 0.0,
            vector_min_similarity: 0.7,
            candidate_multiplier: 1,
            source_timeout_ms: 5_000,
            max_refined_queries: 3,
            expansion_concurrency: 4,
            placeholder_score: 0.8,
            missing_score: 0.5,
        }
    }
}

impl RetrievalConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|e| SearchError::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SearchError::Config(format!("failed to read {}: {e}", path.display())))?;
        log::debug!("Loaded retrieval config from {}", path.display());
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some((source, weight)) = self.source_weights.invalid_entry() {
            return Err(SearchError::Config(format!(
                "weight for '{source}' must be a finite non-negative number (got {weight})"
            )));
        }
        if !self.rrf_k.is_finite() || self.rrf_k < 0.0 {
            return Err(SearchError::Config(format!("rrf_k must be >= 0 (got {})", self.rrf_k)));
        }
        if !(0.0..=1.0).contains(&self.vector_min_similarity) {
            return Err(SearchError::Config(format!(
                "vector_min_similarity must be within 0..=1 (got {})",
                self.vector_min_similarity
            )));
        }
        for (name, value) in [
            ("candidate_multiplier", self.candidate_multiplier),
            ("expansion_concurrency", self.expansion_concurrency),
        ] {
            if value == 0 {
                return Err(SearchError::Config(format!("{name} must be positive")));
            }
        }
        if self.source_timeout_ms == 0 {
            return Err(SearchError::Config("source_timeout_ms must be positive".to_string()));
        }
        for (name, value) in [
            ("placeholder_score", self.placeholder_score),
            ("missing_score", self.missing_score),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SearchError::Config(format!(
                    "{name} must be within 0..=1 (got {value})"
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }

    /// Fusion weights for `parsed`, with the adaptive adjustments applied when enabled.
    #[must_use]
    pub fn weights_for(&self, parsed: &ParsedQuery) -> SourceWeights {
        let mut weights = self.source_weights.clone();
        if !self.adaptive_weights {
            return weights;
        }
        if !parsed.technologies.is_empty() {
            weights.set(SearchSource::Keyword.as_str(), TECH_QUERY_KEYWORD_WEIGHT);
        }
        if parsed.intent == QueryIntent::TeamFormation {
            weights.set(SearchSource::Graph.as_str(), TEAM_FORMATION_GRAPH_WEIGHT);
        }
        weights
    }
}

use crate::query::{SearchFilters, SearchSource};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub const MAX_RESULTS_LIMIT: usize = 100;

const fn default_max_results() -> usize {
    10
}

/// Per-request knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f64>,
    #[serde(default)]
    pub rerank: bool,
    #[serde(default)]
    pub deep_research: bool,
    #[serde(default)]
    pub include_execution_trace: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            min_confidence: None,
            rerank: false,
            deep_research: false,
            include_execution_trace: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalRequest {
    pub query: String,
    #[serde(default)]
    pub options: QueryOptions,
    #[serde(default = "all_sources")]
    pub enabled_sources: Vec<SearchSource>,
    #[serde(default)]
    pub filters: SearchFilters,
}

fn all_sources() -> Vec<SearchSource> {
    SearchSource::ALL.to_vec()
}

impl RetrievalRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            options: QueryOptions::default(),
            enabled_sources: all_sources(),
            filters: SearchFilters::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_sources(mut self, sources: Vec<SearchSource>) -> Self {
        self.enabled_sources = sources;
        self
    }

    #[must_use]
    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Sub-request for a refined query: same options and sources, but never
    /// expanded again.
    #[must_use]
    pub fn with_expansion_disabled(&self, query: impl Into<String>) -> Self {
        let mut options = self.options.clone();
        options.deep_research = false;
        Self {
            query: query.into(),
            options,
            enabled_sources: self.enabled_sources.clone(),
            filters: self.filters.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            bail!("query must not be blank");
        }
        let max = self.options.max_results;
        if max == 0 || max > MAX_RESULTS_LIMIT {
            bail!("max_results must be within 1..={MAX_RESULTS_LIMIT} (got {max})");
        }
        if self.enabled_sources.is_empty() {
            bail!("at least one search source must be enabled");
        }
        if let Some(min) = self.options.min_confidence {
            if !(0.0..=1.0).contains(&min) {
                bail!("min_confidence must be within 0..=1 (got {min})");
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn source_enabled(&self, source: SearchSource) -> bool {
        self.enabled_sources.contains(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_blank_query_and_bad_limits() {
        assert!(RetrievalRequest::new("   ").validate().is_err());

        let zero = RetrievalRequest::new("java").with_options(QueryOptions {
            max_results: 0,
            ..QueryOptions::default()
        });
        assert!(zero.validate().is_err());

        let too_many = RetrievalRequest::new("java").with_options(QueryOptions {
            max_results: MAX_RESULTS_LIMIT + 1,
            ..QueryOptions::default()
        });
        assert!(too_many.validate().is_err());

        let bad_conf = RetrievalRequest::new("java").with_options(QueryOptions {
            min_confidence: Some(1.5),
            ..QueryOptions::default()
        });
        assert!(bad_conf.validate().is_err());

        assert!(RetrievalRequest::new("java")
            .with_sources(Vec::new())
            .validate()
            .is_err());

        assert!(RetrievalRequest::new("java").validate().is_ok());
    }

    #[test]
    fn expansion_disabled_sub_request_keeps_everything_else() {
        let parent = RetrievalRequest::new("kafka experts")
            .with_options(QueryOptions {
                max_results: 7,
                deep_research: true,
                rerank: true,
                ..QueryOptions::default()
            })
            .with_sources(vec![SearchSource::Vector]);

        let child = parent.with_expansion_disabled("kafka streaming");
        assert_eq!(child.query, "kafka streaming");
        assert!(!child.options.deep_research);
        assert!(child.options.rerank);
        assert_eq!(child.options.max_results, 7);
        assert_eq!(child.enabled_sources, vec![SearchSource::Vector]);
    }

    #[test]
    fn deserializes_with_defaults() {
        let req: RetrievalRequest = serde_json::from_str(r#"{"query":"rust"}"#).unwrap();
        assert_eq!(req.options.max_results, 10);
        assert_eq!(req.enabled_sources.len(), 3);
    }
}

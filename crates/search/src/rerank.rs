use crate::config::RetrievalConfig;
use crate::enrichment::ProfileStore;
use crate::error::{Result, SearchError};
use crate::llm::{parse_json_value, CompletionClient};
use crate::prompts::rerank_prompt;
use crate::trace::{RequestContext, StepStatus, StepTimer};
use expertmatch_protocol::{CandidateProfile, RerankEntry};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

const STAGE: &str = "rerank";

/// Candidates in final order with their scores.
#[derive(Debug, Clone, PartialEq)]
pub struct RerankOutcome {
    pub ranked: Vec<(String, f64)>,
    /// The model was unavailable or unusable; input order and placeholder
    /// scores were returned instead.
    pub fell_back: bool,
}

/// Reorders candidates with a language model, falling back to input order on
/// any runtime failure.
#[derive(Clone)]
pub struct SemanticReranker {
    client: Option<Arc<dyn CompletionClient>>,
    profiles: Option<Arc<dyn ProfileStore>>,
    placeholder_score: f64,
    missing_score: f64,
}

impl SemanticReranker {
    pub fn new(client: Option<Arc<dyn CompletionClient>>) -> Self {
        let defaults = RetrievalConfig::default();
        Self {
            client,
            profiles: None,
            placeholder_score: defaults.placeholder_score,
            missing_score: defaults.missing_score,
        }
    }

    #[must_use]
    pub fn with_profile_store(mut self, profiles: Arc<dyn ProfileStore>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: &RetrievalConfig) -> Self {
        self.placeholder_score = config.placeholder_score;
        self.missing_score = config.missing_score;
        self
    }

    #[must_use]
    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    /// Candidate ids reordered by model relevance, truncated to `max_results`.
    pub async fn rerank(
        &self,
        query: &str,
        candidate_ids: &[String],
        max_results: usize,
        ctx: &RequestContext,
    ) -> Result<Vec<String>> {
        if max_results == 0 {
            return Err(SearchError::invalid("max_results must be positive"));
        }
        let outcome = self.rerank_with_scores(query, candidate_ids, ctx).await?;
        Ok(outcome
            .ranked
            .into_iter()
            .take(max_results)
            .map(|(id, _)| id)
            .collect())
    }

    /// Model relevance per candidate. Candidates the model skipped get the
    /// missing score; a fallback gives every candidate the placeholder score.
    pub async fn calculate_relevance_scores(
        &self,
        query: &str,
        candidate_ids: &[String],
        ctx: &RequestContext,
    ) -> Result<BTreeMap<String, f64>> {
        let outcome = self.rerank_with_scores(query, candidate_ids, ctx).await?;
        Ok(outcome.ranked.into_iter().collect())
    }

    /// Order and scores from a single completion call.
    pub async fn rerank_with_scores(
        &self,
        query: &str,
        candidate_ids: &[String],
        ctx: &RequestContext,
    ) -> Result<RerankOutcome> {
        if query.trim().is_empty() {
            return Err(SearchError::invalid("query must not be blank"));
        }
        let ids = dedup_ids(candidate_ids);
        if ids.is_empty() {
            return Ok(RerankOutcome {
                ranked: Vec::new(),
                fell_back: false,
            });
        }

        let timer = StepTimer::start(ctx.trace(), "Semantic Reranking", "SemanticReranker", "rerank")
            .with_input(format!("{} candidates", ids.len()));

        match self.model_ranking(query, &ids).await {
            Ok(ranked) => {
                log::debug!("Reranked {} candidates", ranked.len());
                timer.finish(
                    StepStatus::Success,
                    Some(format!("top: {}", ranked.first().map_or("-", |(id, _)| id.as_str()))),
                );
                Ok(RerankOutcome {
                    ranked,
                    fell_back: false,
                })
            }
            Err(reason) => {
                log::warn!("Reranking fell back to input order: {reason}");
                timer.finish(StepStatus::Degraded, Some(reason));
                Ok(RerankOutcome {
                    ranked: ids
                        .into_iter()
                        .map(|id| (id, self.placeholder_score))
                        .collect(),
                    fell_back: true,
                })
            }
        }
    }

    async fn model_ranking(
        &self,
        query: &str,
        ids: &[String],
    ) -> std::result::Result<Vec<(String, f64)>, String> {
        let Some(client) = &self.client else {
            return Err("no completion client configured".to_string());
        };
        let profiles = self.profiles_for(ids).await.map_err(|e| e.to_string())?;
        let prompt = rerank_prompt(query, &profiles);

        let response = client.complete(&prompt).await.map_err(|e| e.to_string())?;
        let value = parse_json_value(&response.text(), STAGE).map_err(|e| e.to_string())?;
        let entries = rerank_entries(value)
            .ok_or_else(|| "response is not a list of rerank entries".to_string())?;
        self.validate_entries(ids, entries)
    }

    async fn profiles_for(&self, ids: &[String]) -> Result<Vec<CandidateProfile>> {
        let found = match &self.profiles {
            Some(store) => store.find_profiles(ids).await?,
            None => Vec::new(),
        };
        let mut by_id: HashMap<String, CandidateProfile> =
            found.into_iter().map(|p| (p.id.clone(), p)).collect();
        Ok(ids
            .iter()
            .map(|id| {
                by_id.remove(id).unwrap_or_else(|| CandidateProfile {
                    id: id.clone(),
                    name: id.clone(),
                    ..CandidateProfile::default()
                })
            })
            .collect())
    }

    fn validate_entries(
        &self,
        ids: &[String],
        entries: Vec<RerankEntry>,
    ) -> std::result::Result<Vec<(String, f64)>, String> {
        if entries.is_empty() {
            return Err("empty ranking".to_string());
        }
        let known: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut seen: HashSet<String> = HashSet::new();
        let mut scored: Vec<(String, f64)> = Vec::with_capacity(ids.len());
        for entry in entries {
            if !known.contains(entry.expert_id.as_str()) {
                return Err(format!("unknown candidate '{}' in response", entry.expert_id));
            }
            if !entry.score.is_finite() {
                return Err(format!("non-finite score for '{}'", entry.expert_id));
            }
            if seen.insert(entry.expert_id.clone()) {
                scored.push((entry.expert_id, entry.score.clamp(0.0, 1.0)));
            }
        }
        // stable: equal scores keep the model's order
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        let omitted: Vec<(String, f64)> = ids
            .iter()
            .filter(|id| !seen.contains(id.as_str()))
            .map(|id| (id.clone(), self.missing_score))
            .collect();
        if !omitted.is_empty() {
            log::debug!("Model omitted {} candidates", omitted.len());
        }
        scored.extend(omitted);
        Ok(scored)
    }
}

fn dedup_ids(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// A bare array of entries, or the first array found inside an object
/// (`{"rankings": [...]}` and similar wrappers).
fn rerank_entries(value: Value) -> Option<Vec<RerankEntry>> {
    let list = match value {
        Value::Array(_) => value,
        Value::Object(map) => map.into_iter().find_map(|(_, v)| v.is_array().then_some(v))?,
        _ => return None,
    };
    serde_json::from_value(list).ok()
}

//! One-level iterative retrieval: retrieve, ask the model for gaps, retrieve
//! again with refined queries and merge.

use crate::config::RetrievalConfig;
use crate::enrichment::ProfileStore;
use crate::error::{Result, SearchError};
use crate::hybrid::Retriever;
use crate::llm::{parse_json_value, CompletionClient};
use crate::prompts::{gap_analysis_prompt, refinement_prompt};
use crate::query_parser::QueryParser;
use crate::trace::{RequestContext, StepStatus, StepTimer};
use expertmatch_protocol::{
    CandidateProfile, GapAnalysis, ParsedQuery, RefinedQueries, RetrievalRequest, RetrievalResult,
};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

const GAP_STAGE: &str = "gap_analysis";
const REFINE_STAGE: &str = "query_refinement";

#[derive(Clone)]
pub struct DeepResearchService {
    retriever: Arc<dyn Retriever>,
    profiles: Arc<dyn ProfileStore>,
    client: Arc<dyn CompletionClient>,
    parser: QueryParser,
    config: RetrievalConfig,
}

impl DeepResearchService {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        profiles: Arc<dyn ProfileStore>,
        client: Arc<dyn CompletionClient>,
    ) -> Self {
        Self {
            retriever,
            profiles,
            client,
            parser: QueryParser::new(),
            config: RetrievalConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs the research loop for `request`.
    ///
    /// The merged answer is cut to `max_results`, like a plain retrieval.
    /// Returns the initial result unchanged when it is empty, when the model
    /// sees no significant gaps, or when refinement or every expanded
    /// retrieval fails. A gap analysis that fails or cannot be parsed is an
    /// error; callers fall back to plain retrieval.
    pub async fn perform_deep_research(
        &self,
        request: &RetrievalRequest,
        parsed: &ParsedQuery,
        ctx: &RequestContext,
    ) -> Result<RetrievalResult> {
        request
            .validate()
            .map_err(|e| SearchError::InvalidInput(e.to_string()))?;
        ctx.check_cancelled()?;

        let initial_request = request.with_expansion_disabled(request.query.clone());
        let initial = self.retriever.retrieve(&initial_request, parsed, ctx).await?;
        if initial.is_empty() {
            log::info!("Deep research: initial retrieval is empty, nothing to analyse");
            return Ok(initial);
        }

        ctx.check_cancelled()?;
        let profiles = self.enrich(&initial.expert_ids, ctx).await?;

        ctx.check_cancelled()?;
        let analysis = self.analyze_gaps(&parsed.original_query, &profiles, ctx).await?;
        if !analysis.has_significant_gaps() {
            log::info!("Deep research: no significant gaps, keeping initial result");
            return Ok(initial);
        }

        ctx.check_cancelled()?;
        let refined = self.refine_queries(&parsed.original_query, &analysis, ctx).await;
        if refined.is_empty() {
            log::info!("Deep research: no refined queries, keeping initial result");
            return Ok(initial);
        }

        ctx.check_cancelled()?;
        let expanded = self.expanded_retrieve(request, refined, ctx).await;
        ctx.check_cancelled()?;
        if expanded.is_empty() {
            log::warn!("Deep research: every expanded retrieval failed, keeping initial result");
            return Ok(initial);
        }

        let merged = merge_results(initial, expanded).truncated(request.options.max_results);
        log::info!("Deep research completed: {} experts", merged.len());
        Ok(merged)
    }

    async fn enrich(&self, ids: &[String], ctx: &RequestContext) -> Result<Vec<CandidateProfile>> {
        let timer = StepTimer::start(ctx.trace(), "Candidate Enrichment", "ProfileStore", "find_profiles")
            .with_input(format!("{} candidates", ids.len()));
        match self.profiles.find_profiles(ids).await {
            Ok(profiles) => {
                timer.finish(StepStatus::Success, Some(format!("{} profiles", profiles.len())));
                Ok(profiles)
            }
            Err(err) => {
                timer.finish(StepStatus::Failed, Some(err.to_string()));
                Err(match err {
                    SearchError::Enrichment(_) => err,
                    other => SearchError::Enrichment(other.to_string()),
                })
            }
        }
    }

    async fn analyze_gaps(
        &self,
        query: &str,
        profiles: &[CandidateProfile],
        ctx: &RequestContext,
    ) -> Result<GapAnalysis> {
        let timer = StepTimer::start(ctx.trace(), "Gap Analysis", "DeepResearchService", "analyze_gaps")
            .with_input(format!("{} profiles", profiles.len()));
        let prompt = gap_analysis_prompt(query, profiles);
        let parsed = match self.client.complete(&prompt).await {
            Ok(response) => parse_json_value(&response.text(), GAP_STAGE).and_then(gap_analysis_from),
            Err(err) => Err(err),
        };
        match parsed {
            Ok(analysis) => {
                log::debug!(
                    "Gap analysis: needs_expansion={}, {} gaps, {} ambiguities",
                    analysis.needs_expansion,
                    analysis.identified_gaps.len(),
                    analysis.ambiguities.len()
                );
                timer.finish(
                    StepStatus::Success,
                    Some(format!("needs_expansion={}", analysis.needs_expansion)),
                );
                Ok(analysis)
            }
            Err(err) => {
                log::warn!("Gap analysis failed: {err}");
                timer.finish(StepStatus::Failed, Some(err.to_string()));
                Err(err)
            }
        }
    }

    /// Never fails: any client or parse problem yields no refined queries.
    async fn refine_queries(
        &self,
        query: &str,
        analysis: &GapAnalysis,
        ctx: &RequestContext,
    ) -> Vec<String> {
        let timer = StepTimer::start(ctx.trace(), "Query Refinement", "DeepResearchService", "refine_queries");
        let limit = self.config.max_refined_queries;
        let prompt = refinement_prompt(query, analysis, limit);

        let refined = match self.client.complete(&prompt).await {
            Ok(response) => parse_json_value(&response.text(), REFINE_STAGE).and_then(|value| {
                RefinedQueries::from_value(value).ok_or_else(|| SearchError::ModelResponseUnparseable {
                    stage: REFINE_STAGE,
                    message: "expected a list of query strings".to_string(),
                })
            }),
            Err(err) => Err(err),
        };
        match refined {
            Ok(refined) => {
                let queries = refined.cleaned(query, limit);
                log::debug!("Refined queries: {queries:?}");
                timer.finish(StepStatus::Success, Some(format!("{} queries", queries.len())));
                queries
            }
            Err(err) => {
                log::warn!("Query refinement failed, skipping expansion: {err}");
                timer.finish(StepStatus::Degraded, Some(err.to_string()));
                Vec::new()
            }
        }
    }

    /// Retrieves every refined query concurrently; failures are skipped and
    /// surviving results keep refined-query order.
    async fn expanded_retrieve(
        &self,
        request: &RetrievalRequest,
        refined: Vec<String>,
        ctx: &RequestContext,
    ) -> Vec<RetrievalResult> {
        let timer = StepTimer::start(ctx.trace(), "Expanded Retrieval", "DeepResearchService", "expanded_retrieve")
            .with_input(format!("{} refined queries", refined.len()));
        let semaphore = Arc::new(Semaphore::new(self.config.expansion_concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let total = refined.len();

        for (position, query) in refined.into_iter().enumerate() {
            let retriever = Arc::clone(&self.retriever);
            let semaphore = Arc::clone(&semaphore);
            let sub_request = request.with_expansion_disabled(query.clone());
            let sub_parsed = self.parser.parse(&query);
            let ctx = ctx.clone();
            tasks.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => retriever.retrieve(&sub_request, &sub_parsed, &ctx).await,
                    Err(_) => Err(SearchError::Cancelled),
                };
                (position, query, outcome)
            });
        }

        let mut slots: Vec<Option<RetrievalResult>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, _, Ok(result))) => {
                    if let Some(slot) = slots.get_mut(position) {
                        *slot = Some(result);
                    }
                }
                Ok((_, query, Err(err))) => {
                    log::warn!("Expanded retrieval for '{query}' failed: {err}");
                }
                Err(err) => log::warn!("Expanded retrieval task failed: {err}"),
            }
        }

        let results: Vec<RetrievalResult> = slots.into_iter().flatten().collect();
        let status = if results.len() == total {
            StepStatus::Success
        } else {
            StepStatus::Degraded
        };
        timer.finish(status, Some(format!("{} of {} succeeded", results.len(), total)));
        results
    }
}

/// Gap analysis must be a JSON object; arrays and scalars are rejected
/// rather than read as "no gaps".
fn gap_analysis_from(value: Value) -> Result<GapAnalysis> {
    if !value.is_object() {
        return Err(SearchError::ModelResponseUnparseable {
            stage: GAP_STAGE,
            message: "expected a JSON object".to_string(),
        });
    }
    serde_json::from_value(value).map_err(|e| SearchError::ModelResponseUnparseable {
        stage: GAP_STAGE,
        message: e.to_string(),
    })
}

/// Union of all candidates keeping each one's best score. Ties keep first
/// appearance, initial result first.
fn merge_results(initial: RetrievalResult, expanded: Vec<RetrievalResult>) -> RetrievalResult {
    let mut order: Vec<String> = Vec::new();
    let mut best: HashMap<String, f64> = HashMap::new();
    let mut degraded = Vec::new();

    for result in std::iter::once(&initial).chain(expanded.iter()) {
        for (id, score) in result.iter() {
            match best.get_mut(id) {
                Some(current) => {
                    if score > *current {
                        *current = score;
                    }
                }
                None => {
                    best.insert(id.to_string(), score);
                    order.push(id.to_string());
                }
            }
        }
        degraded.extend(result.degraded_sources.iter().copied());
    }

    let mut merged: Vec<(String, f64)> = order
        .into_iter()
        .map(|id| {
            let score = best.get(&id).copied().unwrap_or(0.0);
            (id, score)
        })
        .collect();
    merged.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    RetrievalResult::from_scored(merged).with_degraded(degraded)
}

use crate::config::RetrievalConfig;
use crate::error::{Result, SearchError};
use crate::fusion::ResultFusionService;
use crate::keyword::KeywordSearchService;
use crate::rerank::SemanticReranker;
use crate::trace::{RequestContext, StepStatus, StepTimer};
use async_trait::async_trait;
use expertmatch_graph::GraphSearchService;
use expertmatch_protocol::{
    NamedResultSet, ParsedQuery, RetrievalRequest, RetrievalResult, SearchFilters, SearchSource,
};
use expertmatch_vector_store::VectorSearchService;
use std::future::Future;

/// Anything that turns a request into a ranked, scored candidate list.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(
        &self,
        request: &RetrievalRequest,
        parsed: &ParsedQuery,
        ctx: &RequestContext,
    ) -> Result<RetrievalResult>;
}

#[derive(Debug, Default)]
struct SourceOutcome {
    ids: Vec<String>,
    degraded: bool,
}

impl SourceOutcome {
    fn skipped() -> Self {
        Self::default()
    }
}

/// Fans a request out to the enabled sources, fuses their rankings and
/// optionally reranks the fused list.
#[derive(Clone)]
pub struct HybridRetrievalService {
    config: RetrievalConfig,
    vector: Option<VectorSearchService>,
    graph: GraphSearchService,
    keyword: Option<KeywordSearchService>,
    fusion: ResultFusionService,
    reranker: Option<SemanticReranker>,
}

impl HybridRetrievalService {
    #[must_use]
    pub fn new(config: RetrievalConfig) -> Self {
        let fusion = ResultFusionService::new(config.rrf_k);
        Self {
            config,
            vector: None,
            graph: GraphSearchService::disconnected(),
            keyword: None,
            fusion,
            reranker: None,
        }
    }

    #[must_use]
    pub fn with_vector(mut self, vector: VectorSearchService) -> Self {
        self.vector = Some(vector);
        self
    }

    #[must_use]
    pub fn with_graph(mut self, graph: GraphSearchService) -> Self {
        self.graph = graph;
        self
    }

    #[must_use]
    pub fn with_keyword(mut self, keyword: KeywordSearchService) -> Self {
        self.keyword = Some(keyword);
        self
    }

    #[must_use]
    pub fn with_reranker(mut self, reranker: SemanticReranker) -> Self {
        self.reranker = Some(reranker);
        self
    }

    #[must_use]
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    async fn run_source<F>(
        &self,
        source: SearchSource,
        timer: StepTimer<'_>,
        search: F,
    ) -> SourceOutcome
    where
        F: Future<Output = Result<SourceOutcome>>,
    {
        let timeout = self.config.source_timeout();
        let result = match tokio::time::timeout(timeout, search).await {
            Ok(result) => result,
            Err(_) => Err(SearchError::SourceUnavailable {
                backend: source,
                message: format!("timed out after {}ms", timeout.as_millis()),
            }),
        };
        match result {
            Ok(outcome) => {
                let status = if outcome.degraded {
                    StepStatus::Degraded
                } else {
                    StepStatus::Success
                };
                timer.finish(status, Some(format!("{} experts", outcome.ids.len())));
                outcome
            }
            Err(err) => {
                let err = match err {
                    unavailable @ SearchError::SourceUnavailable { .. } => unavailable,
                    other => SearchError::SourceUnavailable {
                        backend: source,
                        message: other.to_string(),
                    },
                };
                log::warn!("{err}; continuing without it");
                timer.finish(StepStatus::Degraded, Some(err.to_string()));
                SourceOutcome {
                    ids: Vec::new(),
                    degraded: true,
                }
            }
        }
    }

    async fn vector_source(
        &self,
        request: &RetrievalRequest,
        parsed: &ParsedQuery,
        limit: usize,
        ctx: &RequestContext,
    ) -> SourceOutcome {
        let timer = StepTimer::start(ctx.trace(), "Vector Search", "VectorSearchService", "search_by_text")
            .with_input(parsed.original_query.clone());
        let Some(vector) = self
            .vector
            .as_ref()
            .filter(|_| request.source_enabled(SearchSource::Vector))
        else {
            timer.finish(StepStatus::Skipped, None);
            return SourceOutcome::skipped();
        };
        let min_similarity = self.config.vector_min_similarity;
        self.run_source(SearchSource::Vector, timer, async {
            let matches = vector
                .search_by_text(&parsed.original_query, limit, min_similarity)
                .await?;
            Ok::<_, SearchError>(SourceOutcome {
                ids: matches.into_iter().map(|m| m.expert_id).collect(),
                degraded: false,
            })
        })
        .await
    }

    async fn graph_source(
        &self,
        request: &RetrievalRequest,
        filters: &SearchFilters,
        limit: usize,
        ctx: &RequestContext,
    ) -> SourceOutcome {
        let timer = StepTimer::start(ctx.trace(), "Graph Search", "GraphSearchService", "search")
            .with_input(format!(
                "{} technologies, {} domains, {} customers",
                filters.technologies.len(),
                filters.domains.len(),
                filters.customers.len()
            ));
        if !request.source_enabled(SearchSource::Graph) || filters.is_empty() {
            timer.finish(StepStatus::Skipped, None);
            return SourceOutcome::skipped();
        }
        self.run_source(SearchSource::Graph, timer, async {
            let outcome = self.graph.search(filters).await;
            let mut ids = outcome.expert_ids;
            ids.truncate(limit);
            Ok::<_, SearchError>(SourceOutcome {
                ids,
                degraded: outcome.degraded,
            })
        })
        .await
    }

    async fn keyword_source(
        &self,
        request: &RetrievalRequest,
        parsed: &ParsedQuery,
        filters: &SearchFilters,
        limit: usize,
        ctx: &RequestContext,
    ) -> SourceOutcome {
        let terms = keyword_terms(parsed, filters);
        let timer = StepTimer::start(ctx.trace(), "Keyword Search", "KeywordSearchService", "search_by_keywords")
            .with_input(terms.join(", "));
        let Some(keyword) = self
            .keyword
            .as_ref()
            .filter(|_| request.source_enabled(SearchSource::Keyword) && !terms.is_empty())
        else {
            timer.finish(StepStatus::Skipped, None);
            return SourceOutcome::skipped();
        };
        self.run_source(SearchSource::Keyword, timer, async {
            let ids = keyword.search_by_keywords(&terms, limit).await?;
            Ok::<_, SearchError>(SourceOutcome {
                ids,
                degraded: false,
            })
        })
        .await
    }

    async fn score(
        &self,
        request: &RetrievalRequest,
        fused: Vec<(String, f64)>,
        ctx: &RequestContext,
    ) -> Result<Vec<(String, f64)>> {
        if request.options.rerank && !fused.is_empty() {
            if let Some(reranker) = &self.reranker {
                let ids: Vec<String> = fused.iter().map(|(id, _)| id.clone()).collect();
                let outcome = reranker.rerank_with_scores(&request.query, &ids, ctx).await?;
                if !outcome.fell_back {
                    return Ok(outcome.ranked);
                }
            }
        }
        Ok(normalized(fused))
    }
}

/// Skills and technologies from the query plus filter terms; bare keywords
/// when neither yields anything.
fn keyword_terms(parsed: &ParsedQuery, filters: &SearchFilters) -> Vec<String> {
    let mut terms = parsed.search_terms();
    for term in filters.skills.iter().chain(filters.technologies.iter()) {
        if !terms.iter().any(|t| t.eq_ignore_ascii_case(term)) {
            terms.push(term.clone());
        }
    }
    if terms.is_empty() {
        terms = parsed.keywords.clone();
    }
    terms.retain(|t| !t.trim().is_empty());
    terms
}

/// Fused scores divided by the best one, so the top candidate scores 1.0.
fn normalized(fused: Vec<(String, f64)>) -> Vec<(String, f64)> {
    let top = fused.first().map_or(0.0, |(_, score)| *score);
    fused
        .into_iter()
        .map(|(id, score)| {
            let scaled = if top > 0.0 { score / top } else { 0.0 };
            (id, scaled)
        })
        .collect()
}

#[async_trait]
impl Retriever for HybridRetrievalService {
    async fn retrieve(
        &self,
        request: &RetrievalRequest,
        parsed: &ParsedQuery,
        ctx: &RequestContext,
    ) -> Result<RetrievalResult> {
        request
            .validate()
            .map_err(|e| SearchError::InvalidInput(e.to_string()))?;
        ctx.check_cancelled()?;

        let max_results = request.options.max_results;
        let limit = max_results.saturating_mul(self.config.candidate_multiplier);
        let filters = SearchFilters::from_parsed(parsed).merged_with(&request.filters);
        log::debug!(
            "Hybrid retrieval: query='{}', sources={:?}, limit={}",
            parsed.original_query,
            request.enabled_sources,
            limit
        );

        let (vector, graph, keyword) = tokio::join!(
            self.vector_source(request, parsed, limit, ctx),
            self.graph_source(request, &filters, limit, ctx),
            self.keyword_source(request, parsed, &filters, limit, ctx),
        );

        let mut named = NamedResultSet::new();
        let mut degraded = Vec::new();
        for (source, outcome) in [
            (SearchSource::Vector, vector),
            (SearchSource::Graph, graph),
            (SearchSource::Keyword, keyword),
        ] {
            if !request.source_enabled(source) {
                continue;
            }
            if outcome.degraded {
                degraded.push(source);
            }
            named.insert(source.as_str(), outcome.ids);
        }

        ctx.check_cancelled()?;
        let timer = StepTimer::start(ctx.trace(), "Result Fusion", "ResultFusionService", "fuse")
            .with_input(format!("{} sources", named.len()));
        let weights = self.config.weights_for(parsed);
        let mut fused = self.fusion.fuse_scored(Some(&named), Some(&weights))?;
        fused.truncate(max_results);
        timer.finish(StepStatus::Success, Some(format!("{} candidates", fused.len())));

        let mut scored = self.score(request, fused, ctx).await?;
        if let Some(min) = request.options.min_confidence {
            scored.retain(|(_, score)| *score >= min);
        }

        let result = RetrievalResult::from_scored(scored).with_degraded(degraded);
        log::info!(
            "Hybrid retrieval completed: {} experts{}",
            result.len(),
            if result.is_degraded() { " (degraded)" } else { "" }
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyword::{KeywordBackend, KeywordIndex};
    use crate::llm::{CompletionClient, CompletionResponse};
    use crate::trace::{CancelFlag, ExecutionTrace};
    use expertmatch_graph::ExpertGraphBuilder;
    use expertmatch_protocol::{CandidateProfile, ProjectExperience, QueryOptions};
    use expertmatch_vector_store::{Embedder, InMemoryVectorIndex, VectorDocument};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> expertmatch_vector_store::Result<Vec<f32>> {
            Ok(vec![1.0, 0.0, 0.0])
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    struct BrokenKeyword;

    #[async_trait]
    impl KeywordBackend for BrokenKeyword {
        async fn search_text(&self, _terms: &[String], _limit: usize) -> Result<Vec<String>> {
            Err(SearchError::Config("index missing".into()))
        }

        async fn search_technologies(&self, _t: &[String], _limit: usize) -> Result<Vec<String>> {
            Err(SearchError::Config("index missing".into()))
        }
    }

    struct SlowKeyword;

    #[async_trait]
    impl KeywordBackend for SlowKeyword {
        async fn search_text(&self, _terms: &[String], _limit: usize) -> Result<Vec<String>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec!["late".into()])
        }

        async fn search_technologies(&self, _t: &[String], _limit: usize) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    struct FixedClient(&'static str);

    #[async_trait]
    impl CompletionClient for FixedClient {
        async fn complete(&self, _prompt: &str) -> Result<CompletionResponse> {
            Ok(CompletionResponse::text_only(self.0))
        }
    }

    fn profile(id: &str, techs: &[&str]) -> CandidateProfile {
        CandidateProfile {
            id: id.to_string(),
            name: format!("Expert {id}"),
            projects: vec![ProjectExperience {
                project_name: format!("Project {id}"),
                technologies: techs.iter().map(|t| t.to_string()).collect(),
                ..ProjectExperience::default()
            }],
            ..CandidateProfile::default()
        }
    }

    fn profiles() -> Vec<CandidateProfile> {
        vec![
            profile("e1", &["Java"]),
            profile("e2", &["Kafka", "Java"]),
            profile("e3", &["Kafka"]),
        ]
    }

    fn vector_service() -> VectorSearchService {
        let mut index = InMemoryVectorIndex::new();
        for (doc, expert, vector) in [
            ("d1", "e1", vec![1.0, 0.0, 0.0]),
            ("d2", "e2", vec![0.8, 0.6, 0.0]),
            ("d3", "e3", vec![0.0, 0.0, 1.0]),
        ] {
            index
                .add(VectorDocument {
                    doc_id: doc.into(),
                    expert_id: expert.into(),
                    vector,
                })
                .unwrap();
        }
        VectorSearchService::new(Arc::new(index)).with_embedder(Arc::new(FixedEmbedder))
    }

    fn config() -> RetrievalConfig {
        RetrievalConfig {
            vector_min_similarity: 0.5,
            source_timeout_ms: 50,
            ..RetrievalConfig::default()
        }
    }

    fn service(keyword: Arc<dyn KeywordBackend>) -> HybridRetrievalService {
        let graph = ExpertGraphBuilder::build(&profiles()).unwrap();
        HybridRetrievalService::new(config())
            .with_vector(vector_service())
            .with_graph(GraphSearchService::new(Arc::new(graph)))
            .with_keyword(KeywordSearchService::new(keyword))
    }

    fn kafka_query() -> ParsedQuery {
        let mut parsed = ParsedQuery::bare("kafka engineers");
        parsed.technologies = vec!["Kafka".into()];
        parsed
    }

    #[tokio::test]
    async fn candidates_found_by_several_sources_rank_first() {
        let svc = service(Arc::new(KeywordIndex::from_profiles(&profiles())));
        let parsed = kafka_query();
        let request = RetrievalRequest::new(parsed.original_query.clone());
        let result = svc.retrieve(&request, &parsed, &RequestContext::new()).await.unwrap();

        // vector [e1, e2], graph [e2, e3], keyword [e3, e2]
        assert_eq!(result.expert_ids, vec!["e2", "e3", "e1"]);
        assert_eq!(result.score("e2"), Some(1.0));
        assert!(!result.is_degraded());
    }

    #[tokio::test]
    async fn failing_source_is_isolated_and_flagged() {
        let svc = service(Arc::new(BrokenKeyword));
        let parsed = kafka_query();
        let request = RetrievalRequest::new(parsed.original_query.clone());
        let trace = ExecutionTrace::new();
        let ctx = RequestContext::new().with_trace(trace.clone());

        let result = svc.retrieve(&request, &parsed, &ctx).await.unwrap();
        assert_eq!(result.degraded_sources, vec![SearchSource::Keyword]);
        assert!(result.expert_ids.contains(&"e2".to_string()));
        assert!(trace
            .steps()
            .iter()
            .any(|s| s.name == "Keyword Search" && s.status == StepStatus::Degraded));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_source_times_out() {
        let svc = service(Arc::new(SlowKeyword));
        let parsed = kafka_query();
        let request = RetrievalRequest::new(parsed.original_query.clone());
        let result = svc.retrieve(&request, &parsed, &RequestContext::new()).await.unwrap();
        assert_eq!(result.degraded_sources, vec![SearchSource::Keyword]);
        assert!(!result.expert_ids.contains(&"late".to_string()));
    }

    #[tokio::test]
    async fn only_enabled_sources_are_queried() {
        let svc = service(Arc::new(BrokenKeyword));
        let parsed = kafka_query();
        let request =
            RetrievalRequest::new(parsed.original_query.clone()).with_sources(vec![SearchSource::Vector]);
        let result = svc.retrieve(&request, &parsed, &RequestContext::new()).await.unwrap();
        assert_eq!(result.expert_ids, vec!["e1", "e2"]);
        assert!(!result.is_degraded());
    }

    #[tokio::test]
    async fn truncates_and_filters_by_confidence() {
        let svc = service(Arc::new(KeywordIndex::from_profiles(&profiles())));
        let parsed = kafka_query();
        let request = RetrievalRequest::new(parsed.original_query.clone()).with_options(QueryOptions {
            max_results: 2,
            min_confidence: Some(0.9),
            ..QueryOptions::default()
        });
        let result = svc.retrieve(&request, &parsed, &RequestContext::new()).await.unwrap();
        assert_eq!(result.expert_ids, vec!["e2"]);
    }

    #[tokio::test]
    async fn rerank_replaces_fused_scores() {
        let reranker = SemanticReranker::new(Some(Arc::new(FixedClient(
            r#"[{"expertId":"e1","score":0.95},{"expertId":"e2","score":0.6},{"expertId":"e3","score":0.1}]"#,
        ))));
        let svc = service(Arc::new(KeywordIndex::from_profiles(&profiles()))).with_reranker(reranker);
        let parsed = kafka_query();
        let request = RetrievalRequest::new(parsed.original_query.clone()).with_options(QueryOptions {
            rerank: true,
            ..QueryOptions::default()
        });
        let result = svc.retrieve(&request, &parsed, &RequestContext::new()).await.unwrap();
        assert_eq!(result.expert_ids, vec!["e1", "e2", "e3"]);
        assert_eq!(result.score("e1"), Some(0.95));
    }

    #[tokio::test]
    async fn rejects_invalid_requests_and_honours_cancellation() {
        let svc = service(Arc::new(BrokenKeyword));
        let parsed = kafka_query();
        let blank = RetrievalRequest::new("   ");
        assert!(matches!(
            svc.retrieve(&blank, &parsed, &RequestContext::new()).await,
            Err(SearchError::InvalidInput(_))
        ));

        let flag = CancelFlag::new();
        flag.cancel();
        let ctx = RequestContext::new().with_cancel(flag);
        let request = RetrievalRequest::new("kafka");
        assert!(matches!(
            svc.retrieve(&request, &parsed, &ctx).await,
            Err(SearchError::Cancelled)
        ));
    }

    #[test]
    fn keyword_terms_fall_back_to_keywords() {
        let mut parsed = ParsedQuery::bare("payments people");
        parsed.keywords = vec!["payments".into()];
        assert_eq!(keyword_terms(&parsed, &SearchFilters::default()), vec!["payments"]);

        let filters = SearchFilters {
            technologies: vec!["Rust".into()],
            ..SearchFilters::default()
        };
        assert_eq!(keyword_terms(&parsed, &filters), vec!["Rust"]);
    }
}

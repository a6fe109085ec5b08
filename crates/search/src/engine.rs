use crate::deep_research::DeepResearchService;
use crate::error::{Result, SearchError};
use crate::hybrid::Retriever;
use crate::query_parser::QueryParser;
use crate::trace::{CancelFlag, RequestContext, TraceStep};
use expertmatch_protocol::{ParsedQuery, RetrievalRequest, RetrievalResult};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub parsed: ParsedQuery,
    pub result: RetrievalResult,
    pub deep_research: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<TraceStep>,
}

/// Entry point: parse the query, then run hybrid retrieval or deep research.
#[derive(Clone)]
pub struct ExpertMatchEngine {
    parser: QueryParser,
    retriever: Arc<dyn Retriever>,
    deep_research: Option<DeepResearchService>,
}

impl ExpertMatchEngine {
    pub fn new(retriever: Arc<dyn Retriever>) -> Self {
        Self {
            parser: QueryParser::new(),
            retriever,
            deep_research: None,
        }
    }

    #[must_use]
    pub fn with_deep_research(mut self, deep_research: DeepResearchService) -> Self {
        self.deep_research = Some(deep_research);
        self
    }

    #[must_use]
    pub fn parse(&self, query: &str) -> ParsedQuery {
        self.parser.parse(query)
    }

    pub async fn process_query(&self, request: &RetrievalRequest) -> Result<QueryResponse> {
        self.process_query_with_cancel(request, CancelFlag::new()).await
    }

    pub async fn process_query_with_cancel(
        &self,
        request: &RetrievalRequest,
        cancel: CancelFlag,
    ) -> Result<QueryResponse> {
        request
            .validate()
            .map_err(|e| SearchError::InvalidInput(e.to_string()))?;
        let ctx = if request.options.include_execution_trace {
            RequestContext::traced()
        } else {
            RequestContext::new()
        }
        .with_cancel(cancel);

        let parsed = self.parser.parse(&request.query);
        log::info!(
            "Processing query: intent={}, {} technologies, {} skills",
            parsed.intent.as_str(),
            parsed.technologies.len(),
            parsed.skills.len()
        );

        let (result, deep_research) = match (&self.deep_research, request.options.deep_research) {
            (Some(service), true) => {
                match service.perform_deep_research(request, &parsed, &ctx).await {
                    Ok(result) => (result, true),
                    Err(
                        err @ (SearchError::ModelResponseUnparseable { .. }
                        | SearchError::Completion(_)
                        | SearchError::Enrichment(_)),
                    ) => {
                        log::warn!("Deep research failed, falling back to hybrid retrieval: {err}");
                        let plain = request.with_expansion_disabled(request.query.clone());
                        (self.retriever.retrieve(&plain, &parsed, &ctx).await?, false)
                    }
                    Err(err) => return Err(err),
                }
            }
            (None, true) => {
                log::info!("Deep research requested but no completion client is configured");
                (self.retriever.retrieve(request, &parsed, &ctx).await?, false)
            }
            (_, false) => (self.retriever.retrieve(request, &parsed, &ctx).await?, false),
        };

        Ok(QueryResponse {
            parsed,
            result,
            deep_research,
            trace: ctx.trace().map(|t| t.steps()).unwrap_or_default(),
        })
    }
}

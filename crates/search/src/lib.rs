//! # ExpertMatch Search
//!
//! Hybrid retrieval and deep research over the vector, graph and keyword sources.
//!
//! ```text
//! query ──> QueryParser ──> ParsedQuery
//!                              │
//!            ┌─────────────────┼──────────────────┐   (concurrent, per-source timeout)
//!            v                 v                  v
//!      VectorSearch       GraphSearch       KeywordSearch
//!            └─────────────────┼──────────────────┘
//!                              v
//!                 ResultFusionService (weighted RRF)
//!                              v
//!                  SemanticReranker (optional)
//!                              v
//!                       RetrievalResult
//!                              │
//!    DeepResearchService: gap analysis ─> refined queries ─> expanded retrieval ─> merge
//! ```

mod config;
mod deep_research;
mod engine;
mod enrichment;
mod error;
mod fusion;
mod hybrid;
mod keyword;
mod llm;
mod prompts;
mod query_parser;
mod rerank;
mod trace;

pub use config::RetrievalConfig;
pub use deep_research::DeepResearchService;
pub use engine::{ExpertMatchEngine, QueryResponse};
pub use enrichment::{InMemoryProfileStore, ProfileStore};
pub use error::{Result, SearchError};
pub use fusion::ResultFusionService;
pub use hybrid::{HybridRetrievalService, Retriever};
pub use keyword::{Bm25Params, KeywordBackend, KeywordIndex, KeywordSearchService};
pub use llm::{
    extract_json_text, strip_code_fences, CompletionClient, CompletionResponse, ToolInvocation,
};
pub use query_parser::QueryParser;
pub use rerank::{RerankOutcome, SemanticReranker};
pub use trace::{CancelFlag, ExecutionTrace, RequestContext, StepStatus, TraceStep};

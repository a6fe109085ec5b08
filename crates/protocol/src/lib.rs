//! # ExpertMatch Protocol
//!
//! Shared data model for the hybrid retrieval engine: parsed queries, retrieval
//! requests and results, fusion inputs, and the structured answers expected from
//! the language model (rerank entries, gap analysis).
//!
//! Every type here is plain data. Values are produced once and never mutated in
//! place by the engine; new results are built by merging, not by editing.

use anyhow::Result;
use serde::Serialize;

mod profile;
mod query;
mod request;
mod research;
mod result;

pub use profile::{CandidateProfile, ProjectExperience};
pub use query::{ParsedQuery, QueryConstraints, QueryIntent, SearchFilters, SearchSource};
pub use request::{QueryOptions, RetrievalRequest, MAX_RESULTS_LIMIT};
pub use research::{GapAnalysis, RefinedQueries, RerankEntry};
pub use result::{NamedResultSet, RetrievalResult, SourceWeights};

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}

pub fn serialize_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}

/// JSON schema of `T`, pretty-printed, for embedding into prompts.
pub fn json_schema_for<T: schemars::JsonSchema>() -> Result<String> {
    let schema = schemars::schema_for!(T);
    serde_json::to_string_pretty(&schema).map_err(Into::into)
}

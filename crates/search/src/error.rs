use expertmatch_graph::GraphError;
use expertmatch_protocol::SearchSource;
use expertmatch_vector_store::VectorStoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Search source '{backend}' unavailable: {message}")]
    SourceUnavailable {
        backend: SearchSource,
        message: String,
    },

    #[error("Unparseable model response during {stage}: {message}")]
    ModelResponseUnparseable {
        stage: &'static str,
        message: String,
    },

    #[error("Completion client error: {0}")]
    Completion(String),

    #[error("Enrichment error: {0}")]
    Enrichment(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}

impl SearchError {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::SourceUnavailable { .. } => "source_unavailable",
            Self::ModelResponseUnparseable { .. } => "model_response_unparseable",
            Self::Completion(_) => "completion_failed",
            Self::Enrichment(_) => "enrichment_failed",
            Self::Cancelled => "cancelled",
            Self::Config(_) => "config",
            Self::VectorStore(_) => "vector_store",
            Self::Graph(_) => "graph",
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

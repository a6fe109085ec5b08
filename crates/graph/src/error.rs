use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Graph build error: {0}")]
    BuildError(String),

    #[error("Vertex not found: {0}")]
    VertexNotFound(String),

    #[error("Traversal error: {0}")]
    TraversalError(String),

    #[error("Graph engine unavailable: {0}")]
    Unavailable(String),
}

//! # ExpertMatch Vector Store
//!
//! Nearest-neighbour search over pre-computed expert embeddings.
//!
//! ## Architecture
//!
//! ```text
//! query text ──> Embedder (trait)
//!                   └─> Vec<f32>
//!                          │
//!                          ├──> width check (pad / truncate)
//!                          │
//!                          └──> VectorBackend::nearest (document hits)
//!                                   └─> collapse to expert id, best similarity
//! ```
//!
//! The engine never generates embeddings on its own behalf beyond the query;
//! [`HashingEmbedder`] exists so the index can be built offline without a model.

mod embeddings;
mod error;
mod index;
mod service;

pub use embeddings::{cosine_similarity, fit_dimension, Embedder, HashingEmbedder, DEFAULT_DIMENSION};
pub use error::{Result, VectorStoreError};
pub use index::{DocumentHit, InMemoryVectorIndex, VectorBackend, VectorDocument};
pub use service::{VectorMatch, VectorSearchService};

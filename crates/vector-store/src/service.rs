use crate::embeddings::{fit_dimension, Embedder};
use crate::error::{Result, VectorStoreError};
use crate::index::VectorBackend;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Documents fetched per requested expert before collapsing to expert ids.
const DOCS_PER_EXPERT: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorMatch {
    pub expert_id: String,
    pub similarity: f32,
}

/// Nearest-neighbour search over pre-computed expert embeddings.
#[derive(Clone)]
pub struct VectorSearchService {
    backend: Arc<dyn VectorBackend>,
    embedder: Option<Arc<dyn Embedder>>,
}

impl VectorSearchService {
    pub fn new(backend: Arc<dyn VectorBackend>) -> Self {
        Self {
            backend,
            embedder: None,
        }
    }

    #[must_use]
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Ranked experts whose best document similarity is at least `min_similarity`.
    ///
    /// A query vector whose width differs from the stored width is zero-padded
    /// or truncated before comparison.
    pub async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        min_similarity: f32,
    ) -> Result<Vec<VectorMatch>> {
        if vector.is_empty() {
            return Err(VectorStoreError::InvalidInput(
                "query vector must not be empty".to_string(),
            ));
        }
        if top_k == 0 {
            return Err(VectorStoreError::InvalidInput(
                "top_k must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&min_similarity) {
            return Err(VectorStoreError::InvalidInput(format!(
                "min_similarity must be within 0..=1 (got {min_similarity})"
            )));
        }

        let Some(stored) = self.backend.dimension() else {
            log::debug!("Vector search skipped: index is empty");
            return Ok(Vec::new());
        };

        let query = if vector.len() == stored {
            vector.to_vec()
        } else {
            log::warn!(
                "Query vector width {} differs from stored width {stored}; {} to fit",
                vector.len(),
                if vector.len() < stored { "zero-padding" } else { "truncating" }
            );
            fit_dimension(vector, stored)
        };

        let hits = self
            .backend
            .nearest(&query, top_k.saturating_mul(DOCS_PER_EXPERT), min_similarity)
            .await?;

        let mut order: Vec<String> = Vec::new();
        let mut best: HashMap<String, f32> = HashMap::new();
        for hit in hits {
            match best.get_mut(&hit.expert_id) {
                Some(score) => {
                    if hit.similarity > *score {
                        *score = hit.similarity;
                    }
                }
                None => {
                    best.insert(hit.expert_id.clone(), hit.similarity);
                    order.push(hit.expert_id);
                }
            }
        }

        let mut matches: Vec<VectorMatch> = order
            .into_iter()
            .map(|expert_id| {
                let similarity = best.get(&expert_id).copied().unwrap_or(0.0);
                VectorMatch {
                    expert_id,
                    similarity,
                }
            })
            .collect();
        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(top_k);

        log::debug!("Vector search returned {} experts", matches.len());
        Ok(matches)
    }

    /// Embeds `text` first; a text that embeds to nothing yields no matches.
    pub async fn search_by_text(
        &self,
        text: &str,
        top_k: usize,
        min_similarity: f32,
    ) -> Result<Vec<VectorMatch>> {
        if text.trim().is_empty() {
            return Err(VectorStoreError::InvalidInput(
                "query text must not be blank".to_string(),
            ));
        }
        let Some(embedder) = &self.embedder else {
            return Err(VectorStoreError::EmbeddingError(
                "no embedding provider configured".to_string(),
            ));
        };
        let vector = embedder.embed(text).await?;
        if vector.is_empty() {
            return Ok(Vec::new());
        }
        self.search(&vector, top_k, min_similarity).await
    }

    #[must_use]
    pub fn indexed_documents(&self) -> usize {
        self.backend.len()
    }
}

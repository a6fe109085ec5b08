use crate::embeddings::{cosine_similarity, Embedder};
use crate::error::{Result, VectorStoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One embedded document (a work-experience entry) owned by an expert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDocument {
    pub doc_id: String,
    pub expert_id: String,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentHit {
    pub doc_id: String,
    pub expert_id: String,
    pub similarity: f32,
}

/// Nearest-neighbour storage queried by [`crate::VectorSearchService`].
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Stored vector width, `None` while nothing is stored.
    fn dimension(&self) -> Option<usize>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Up to `limit` documents with similarity `>= min_similarity`, best first.
    async fn nearest(
        &self,
        query: &[f32],
        limit: usize,
        min_similarity: f32,
    ) -> Result<Vec<DocumentHit>>;
}

/// Brute-force cosine index.
#[derive(Debug, Default)]
pub struct InMemoryVectorIndex {
    dimension: Option<usize>,
    documents: Vec<VectorDocument>,
}

impl InMemoryVectorIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: Some(dimension),
            documents: Vec::new(),
        }
    }

    pub fn add(&mut self, document: VectorDocument) -> Result<()> {
        if document.vector.is_empty() {
            return Err(VectorStoreError::IndexError(format!(
                "document '{}' has an empty vector",
                document.doc_id
            )));
        }
        let expected = *self.dimension.get_or_insert(document.vector.len());
        if document.vector.len() != expected {
            return Err(VectorStoreError::InvalidDimension {
                expected,
                actual: document.vector.len(),
            });
        }
        self.documents.push(document);
        Ok(())
    }

    /// Embeds `(doc_id, expert_id, text)` triples and indexes them. Texts that
    /// embed to nothing are skipped.
    pub async fn from_texts<E>(embedder: &E, texts: Vec<(String, String, String)>) -> Result<Self>
    where
        E: Embedder + ?Sized,
    {
        let mut index = Self::with_dimension(embedder.dimension());
        let bodies: Vec<&str> = texts.iter().map(|(_, _, text)| text.as_str()).collect();
        let vectors = embedder.embed_batch(&bodies).await?;
        for ((doc_id, expert_id, _), vector) in texts.iter().zip(vectors) {
            if vector.is_empty() {
                log::debug!("Skipping document {doc_id}: empty embedding");
                continue;
            }
            index.add(VectorDocument {
                doc_id: doc_id.clone(),
                expert_id: expert_id.clone(),
                vector,
            })?;
        }
        log::info!("Indexed {} documents", index.documents.len());
        Ok(index)
    }

    fn scan(&self, query: &[f32], limit: usize, min_similarity: f32) -> Vec<DocumentHit> {
        let mut scores: Vec<DocumentHit> = self
            .documents
            .iter()
            .map(|doc| DocumentHit {
                doc_id: doc.doc_id.clone(),
                expert_id: doc.expert_id.clone(),
                similarity: cosine_similarity(query, &doc.vector),
            })
            .filter(|hit| hit.similarity >= min_similarity)
            .collect();

        scores.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scores.truncate(limit);
        scores
    }
}

#[async_trait]
impl VectorBackend for InMemoryVectorIndex {
    fn dimension(&self) -> Option<usize> {
        if self.documents.is_empty() {
            None
        } else {
            self.dimension
        }
    }

    fn len(&self) -> usize {
        self.documents.len()
    }

    async fn nearest(
        &self,
        query: &[f32],
        limit: usize,
        min_similarity: f32,
    ) -> Result<Vec<DocumentHit>> {
        if let Some(expected) = self.dimension {
            if query.len() != expected {
                return Err(VectorStoreError::InvalidDimension {
                    expected,
                    actual: query.len(),
                });
            }
        }
        Ok(self.scan(query, limit, min_similarity))
    }
}

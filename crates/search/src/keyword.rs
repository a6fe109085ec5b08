use crate::error::{Result, SearchError};
use async_trait::async_trait;
use expertmatch_protocol::CandidateProfile;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

/// Lexical backend behind [`KeywordSearchService`].
#[async_trait]
pub trait KeywordBackend: Send + Sync {
    /// Experts ranked by full-text relevance to `terms`.
    async fn search_text(&self, terms: &[String], limit: usize) -> Result<Vec<String>>;

    /// Experts ranked by the number of `technologies` they have used.
    async fn search_technologies(&self, technologies: &[String], limit: usize)
        -> Result<Vec<String>>;
}

#[derive(Debug, Clone, Copy)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

#[derive(Debug, Clone)]
struct KeywordDoc {
    expert_id: String,
    tokens: Vec<String>,
    technologies: HashSet<String>,
}

/// In-memory BM25 index with one document per expert.
#[derive(Debug, Clone, Default)]
pub struct KeywordIndex {
    params: Bm25Params,
    docs: Vec<KeywordDoc>,
    doc_freq: HashMap<String, usize>,
    avg_len: f32,
}

pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words().map(str::to_lowercase).collect()
}

fn bm25_idf(total_docs: f32, df: f32) -> f32 {
    ((total_docs - df + 0.5) / (df + 0.5) + 1.0).ln()
}

impl KeywordIndex {
    #[must_use]
    pub fn from_profiles(profiles: &[CandidateProfile]) -> Self {
        Self::with_params(profiles, Bm25Params::default())
    }

    #[must_use]
    pub fn with_params(profiles: &[CandidateProfile], params: Bm25Params) -> Self {
        let mut docs = Vec::with_capacity(profiles.len());
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut total_len = 0usize;

        for profile in profiles {
            let tokens = tokenize(&Self::document_text(profile));
            total_len += tokens.len();
            let unique: HashSet<&String> = tokens.iter().collect();
            for token in unique {
                *doc_freq.entry(token.clone()).or_insert(0) += 1;
            }
            docs.push(KeywordDoc {
                expert_id: profile.id.clone(),
                tokens,
                technologies: profile
                    .technologies()
                    .into_iter()
                    .map(str::to_lowercase)
                    .collect(),
            });
        }

        let avg_len = total_len as f32 / docs.len().max(1) as f32;
        log::debug!("Keyword index built over {} experts", docs.len());
        Self {
            params,
            docs,
            doc_freq,
            avg_len,
        }
    }

    fn document_text(profile: &CandidateProfile) -> String {
        let mut parts: Vec<&str> = vec![profile.name.as_str()];
        parts.extend(profile.seniority.as_deref());
        parts.extend(profile.summary.as_deref());
        parts.extend(profile.skills.iter().map(String::as_str));
        for project in &profile.projects {
            parts.push(&project.project_name);
            parts.extend(project.role.as_deref());
            parts.extend(project.customer.as_deref());
            parts.extend(project.domain.as_deref());
            parts.extend(project.technologies.iter().map(String::as_str));
        }
        parts.join(" ")
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn score(&self, doc: &KeywordDoc, query_tokens: &[String]) -> f32 {
        if doc.tokens.is_empty() {
            return 0.0;
        }
        let dl = doc.tokens.len() as f32;
        let total_docs = self.docs.len().max(1) as f32;
        let mut score = 0.0;
        for token in query_tokens {
            let freq = doc.tokens.iter().filter(|t| *t == token).count() as f32;
            if freq <= 0.0 {
                continue;
            }
            let df = *self.doc_freq.get(token).unwrap_or(&0) as f32;
            let idf = bm25_idf(total_docs, df);
            let denom = freq
                + self.params.k1
                    * (1.0 - self.params.b + self.params.b * dl / self.avg_len.max(1e-3));
            if denom > 0.0 {
                score += idf * (freq * (self.params.k1 + 1.0)) / denom;
            }
        }
        score
    }

    /// Stable descending sort; ties keep document order.
    fn ranked(mut scored: Vec<(usize, f32)>, limit: usize, docs: &[KeywordDoc]) -> Vec<String> {
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored
            .into_iter()
            .take(limit)
            .filter_map(|(idx, _)| docs.get(idx).map(|d| d.expert_id.clone()))
            .collect()
    }
}

#[async_trait]
impl KeywordBackend for KeywordIndex {
    async fn search_text(&self, terms: &[String], limit: usize) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let query_tokens: Vec<String> = terms
            .iter()
            .flat_map(|t| tokenize(t))
            .filter(|t| seen.insert(t.clone()))
            .collect();
        let scored: Vec<(usize, f32)> = self
            .docs
            .iter()
            .enumerate()
            .map(|(idx, doc)| (idx, self.score(doc, &query_tokens)))
            .filter(|(_, score)| *score > 0.0)
            .collect();
        Ok(Self::ranked(scored, limit, &self.docs))
    }

    async fn search_technologies(
        &self,
        technologies: &[String],
        limit: usize,
    ) -> Result<Vec<String>> {
        let wanted: HashSet<String> = technologies
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        let scored: Vec<(usize, f32)> = self
            .docs
            .iter()
            .enumerate()
            .map(|(idx, doc)| (idx, doc.technologies.intersection(&wanted).count() as f32))
            .filter(|(_, matched)| *matched > 0.0)
            .collect();
        Ok(Self::ranked(scored, limit, &self.docs))
    }
}

/// Lexical search with input validation in front of a [`KeywordBackend`].
#[derive(Clone)]
pub struct KeywordSearchService {
    backend: Arc<dyn KeywordBackend>,
}

impl KeywordSearchService {
    pub fn new(backend: Arc<dyn KeywordBackend>) -> Self {
        Self { backend }
    }

    fn validate(kind: &str, terms: &[String], max_results: usize) -> Result<()> {
        if terms.is_empty() || terms.iter().all(|t| t.trim().is_empty()) {
            return Err(SearchError::invalid(format!("{kind} list must not be empty")));
        }
        if max_results == 0 {
            return Err(SearchError::invalid("max_results must be positive"));
        }
        Ok(())
    }

    pub async fn search_by_keywords(
        &self,
        keywords: &[String],
        max_results: usize,
    ) -> Result<Vec<String>> {
        Self::validate("keyword", keywords, max_results)?;
        let ids = self.backend.search_text(keywords, max_results).await?;
        log::debug!("Keyword search returned {} experts", ids.len());
        Ok(ids)
    }

    pub async fn search_by_technologies(
        &self,
        technologies: &[String],
        max_results: usize,
    ) -> Result<Vec<String>> {
        Self::validate("technology", technologies, max_results)?;
        let ids = self
            .backend
            .search_technologies(technologies, max_results)
            .await?;
        log::debug!("Technology search returned {} experts", ids.len());
        Ok(ids)
    }
}

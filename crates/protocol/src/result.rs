use crate::query::SearchSource;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Ordered, duplicate-free candidate list with per-candidate scores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub expert_ids: Vec<String>,
    #[serde(default)]
    pub relevance_scores: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded_sources: Vec<SearchSource>,
}

impl RetrievalResult {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a result from `(id, score)` pairs in rank order. Later duplicates
    /// are dropped; the first occurrence keeps its position and score.
    pub fn from_scored<I, S>(scored: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut expert_ids = Vec::new();
        let mut relevance_scores = BTreeMap::new();
        for (id, score) in scored {
            let id = id.into();
            if seen.insert(id.clone()) {
                relevance_scores.insert(id.clone(), score);
                expert_ids.push(id);
            }
        }
        Self {
            expert_ids,
            relevance_scores,
            degraded_sources: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_degraded(mut self, sources: Vec<SearchSource>) -> Self {
        self.degraded_sources = sources;
        self.degraded_sources.sort();
        self.degraded_sources.dedup();
        self
    }

    /// Keeps the first `max` candidates and their scores.
    #[must_use]
    pub fn truncated(mut self, max: usize) -> Self {
        if self.expert_ids.len() > max {
            for id in self.expert_ids.drain(max..) {
                self.relevance_scores.remove(&id);
            }
        }
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expert_ids.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.expert_ids.len()
    }

    #[must_use]
    pub fn score(&self, id: &str) -> Option<f64> {
        self.relevance_scores.get(id).copied()
    }

    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.degraded_sources.is_empty()
    }

    /// Iterates `(id, score)` in rank order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.expert_ids
            .iter()
            .map(|id| (id.as_str(), self.score(id).unwrap_or(0.0)))
    }
}

/// Per-source ranked lists, kept in insertion order so fusion tie-breaks are
/// reproducible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedResultSet {
    entries: Vec<(String, Vec<String>)>,
}

impl NamedResultSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the list for `source`. Replacing keeps the original slot.
    pub fn insert(&mut self, source: impl Into<String>, ids: Vec<String>) {
        let source = source.into();
        if let Some(slot) = self.entries.iter_mut().find(|(name, _)| *name == source) {
            slot.1 = ids;
        } else {
            self.entries.push((source, ids));
        }
    }

    #[must_use]
    pub fn with(mut self, source: impl Into<String>, ids: Vec<String>) -> Self {
        self.insert(source, ids);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn get(&self, source: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(name, _)| name == source)
            .map(|(_, ids)| ids.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> + '_ {
        self.entries
            .iter()
            .map(|(name, ids)| (name.as_str(), ids.as_slice()))
    }
}

impl<S: Into<String>> FromIterator<(S, Vec<String>)> for NamedResultSet {
    fn from_iter<T: IntoIterator<Item = (S, Vec<String>)>>(iter: T) -> Self {
        let mut set = Self::new();
        for (source, ids) in iter {
            set.insert(source, ids);
        }
        set
    }
}

/// Source name to fusion weight. Unlisted sources weigh 1.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceWeights(BTreeMap<String, f64>);

impl SourceWeights {
    pub const DEFAULT_WEIGHT: f64 = 1.0;

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// vector 1.0, graph 0.8, keyword 0.6
    #[must_use]
    pub fn standard() -> Self {
        Self::new()
            .with(SearchSource::Vector.as_str(), 1.0)
            .with(SearchSource::Graph.as_str(), 0.8)
            .with(SearchSource::Keyword.as_str(), 0.6)
    }

    #[must_use]
    pub fn with(mut self, source: impl Into<String>, weight: f64) -> Self {
        self.0.insert(source.into(), weight);
        self
    }

    pub fn set(&mut self, source: impl Into<String>, weight: f64) {
        self.0.insert(source.into(), weight);
    }

    #[must_use]
    pub fn weight(&self, source: &str) -> f64 {
        self.0.get(source).copied().unwrap_or(Self::DEFAULT_WEIGHT)
    }

    /// First entry that is negative or not finite.
    #[must_use]
    pub fn invalid_entry(&self) -> Option<(&str, f64)> {
        self.0
            .iter()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
            .map(|(name, w)| (name.as_str(), *w))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.0.iter().map(|(name, w)| (name.as_str(), *w))
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for SourceWeights {
    fn from_iter<T: IntoIterator<Item = (S, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn from_scored_drops_duplicates_keeping_first() {
        let result = RetrievalResult::from_scored(vec![("e1", 0.9), ("e2", 0.5), ("e1", 0.1)]);
        assert_eq!(result.expert_ids, vec!["e1".to_string(), "e2".into()]);
        assert_eq!(result.score("e1"), Some(0.9));
    }

    #[test]
    fn truncated_drops_tail_scores() {
        let result = RetrievalResult::from_scored(vec![("e1", 0.9), ("e2", 0.5), ("e3", 0.2)])
            .truncated(2);
        assert_eq!(result.expert_ids, vec!["e1".to_string(), "e2".into()]);
        assert_eq!(result.score("e3"), None);
        assert_eq!(result.relevance_scores.len(), 2);
    }

    #[test]
    fn named_result_set_preserves_insertion_order() {
        let set = NamedResultSet::new()
            .with("keyword", vec!["a".into()])
            .with("vector", vec!["b".into()])
            .with("keyword", vec!["c".into()]);
        let names: Vec<&str> = set.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["keyword", "vector"]);
        assert_eq!(set.get("keyword"), Some(&["c".to_string()][..]));
    }

    #[test]
    fn weights_default_to_one_and_flag_invalid_entries() {
        let weights = SourceWeights::standard();
        assert_eq!(weights.weight("graph"), 0.8);
        assert_eq!(weights.weight("unknown"), 1.0);
        assert!(weights.invalid_entry().is_none());

        let bad = SourceWeights::new().with("vector", f64::NAN);
        assert_eq!(bad.invalid_entry().map(|(name, _)| name), Some("vector"));
    }
}

use crate::error::{Result, SearchError};
use expertmatch_protocol::{NamedResultSet, SourceWeights};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Weighted reciprocal rank fusion of per-source rankings.
///
/// A candidate's fused score is `Σ weight(source) / (k + rank + 1)` over every
/// source list containing it (rank is zero-based). With `k = 0` this is
/// `weight × 1/(rank + 1)`.
#[derive(Debug, Clone, Copy)]
pub struct ResultFusionService {
    k: f64,
}

impl Default for ResultFusionService {
    fn default() -> Self {
        Self { k: 0.0 }
    }
}

impl ResultFusionService {
    #[must_use]
    pub fn new(k: f64) -> Self {
        Self {
            k: if k.is_finite() && k >= 0.0 { k } else { 0.0 },
        }
    }

    /// Fuses with weight 1.0 for every source.
    pub fn fuse(&self, results: Option<&NamedResultSet>) -> Result<Vec<String>> {
        self.fuse_with_weights(results, Some(&SourceWeights::new()))
    }

    /// Fuses with explicit weights; unlisted sources weigh 1.0.
    pub fn fuse_with_weights(
        &self,
        results: Option<&NamedResultSet>,
        weights: Option<&SourceWeights>,
    ) -> Result<Vec<String>> {
        Ok(self
            .fuse_scored(results, weights)?
            .into_iter()
            .map(|(id, _)| id)
            .collect())
    }

    /// Same ordering as [`Self::fuse_with_weights`], keeping the fused scores.
    ///
    /// Ties are broken by first appearance while walking sources in insertion
    /// order, so the output is fully deterministic.
    pub fn fuse_scored(
        &self,
        results: Option<&NamedResultSet>,
        weights: Option<&SourceWeights>,
    ) -> Result<Vec<(String, f64)>> {
        let results = results.ok_or_else(|| SearchError::invalid("named results are required"))?;
        if results.is_empty() {
            return Err(SearchError::invalid("named results must not be empty"));
        }
        let weights = weights.ok_or_else(|| SearchError::invalid("weights must not be null"))?;
        if let Some((source, weight)) = weights.invalid_entry() {
            return Err(SearchError::invalid(format!(
                "weight for '{source}' must be a finite non-negative number (got {weight})"
            )));
        }

        let mut order: Vec<String> = Vec::new();
        let mut scores: HashMap<String, f64> = HashMap::new();
        for (source, ids) in results.iter() {
            let weight = weights.weight(source);
            // a list contributes once per id, at its best rank
            let mut seen_in_source: HashSet<&str> = HashSet::new();
            for (rank, id) in ids.iter().enumerate() {
                if !seen_in_source.insert(id.as_str()) {
                    continue;
                }
                let contribution = weight / (self.k + rank as f64 + 1.0);
                match scores.get_mut(id) {
                    Some(score) => *score += contribution,
                    None => {
                        scores.insert(id.clone(), contribution);
                        order.push(id.clone());
                    }
                }
            }
        }

        let mut fused: Vec<(String, f64)> = order
            .into_iter()
            .map(|id| {
                let score = scores.get(&id).copied().unwrap_or(0.0);
                (id, score)
            })
            .collect();
        // stable: equal scores keep first-seen order
        fused.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        log::debug!(
            "Fused {} sources into {} candidates",
            results.len(),
            fused.len()
        );
        Ok(fused)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn shared_candidate_outranks_single_source_ones() {
        let fusion = ResultFusionService::default();
        let results = NamedResultSet::new()
            .with("a", ids(&["1", "2", "3"]))
            .with("b", ids(&["2", "4", "5"]));
        let fused = fusion.fuse(Some(&results)).unwrap();
        assert_eq!(fused[0], "2");
        assert_eq!(fused, ids(&["2", "1", "4", "3", "5"]));
    }

    #[test]
    fn scores_follow_weighted_reciprocal_rank() {
        let fusion = ResultFusionService::default();
        let results = NamedResultSet::new()
            .with("vector", ids(&["x", "y"]))
            .with("keyword", ids(&["y"]));
        let weights = SourceWeights::new().with("vector", 1.0).with("keyword", 0.5);
        let fused = fusion.fuse_scored(Some(&results), Some(&weights)).unwrap();
        assert_eq!(fused[0].0, "x");
        assert!((fused[0].1 - 1.0).abs() < 1e-12);
        assert_eq!(fused[1].0, "y");
        assert!((fused[1].1 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn repeated_id_in_one_list_counts_once() {
        let fusion = ResultFusionService::default();
        let results = NamedResultSet::new()
            .with("a", ids(&["x", "p", "x", "x", "x"]))
            .with("b", ids(&["p"]));
        let fused = fusion.fuse_scored(Some(&results), Some(&SourceWeights::new())).unwrap();
        assert_eq!(fused[0].0, "p");
        assert!((fused[0].1 - 1.5).abs() < 1e-12);
        assert_eq!(fused[1].0, "x");
        assert!((fused[1].1 - 1.0).abs() < 1e-12);
        assert_eq!(fused.len(), 2);
    }

    #[test]
    fn rrf_constant_flattens_rank_differences() {
        let results = NamedResultSet::new().with("a", ids(&["p", "q"]));
        let fused = ResultFusionService::new(60.0)
            .fuse_scored(Some(&results), Some(&SourceWeights::new()))
            .unwrap();
        assert!((fused[0].1 - 1.0 / 61.0).abs() < 1e-12);
        assert!((fused[1].1 - 1.0 / 62.0).abs() < 1e-12);
    }

    #[test]
    fn validation_errors() {
        let fusion = ResultFusionService::default();
        let non_empty = NamedResultSet::new().with("a", ids(&["1"]));

        assert!(matches!(fusion.fuse(None), Err(SearchError::InvalidInput(_))));
        assert!(matches!(
            fusion.fuse(Some(&NamedResultSet::new())),
            Err(SearchError::InvalidInput(_))
        ));
        assert!(matches!(
            fusion.fuse_with_weights(Some(&non_empty), None),
            Err(SearchError::InvalidInput(_))
        ));
        let negative = SourceWeights::new().with("a", -0.5);
        assert!(fusion.fuse_with_weights(Some(&non_empty), Some(&negative)).is_err());
    }

    #[test]
    fn empty_lists_fuse_to_empty_result() {
        let fusion = ResultFusionService::default();
        let results = NamedResultSet::new().with("a", Vec::new()).with("b", Vec::new());
        assert!(fusion.fuse(Some(&results)).unwrap().is_empty());
    }

    #[test]
    fn zero_weight_source_still_contributes_candidates_last() {
        let fusion = ResultFusionService::default();
        let results = NamedResultSet::new()
            .with("muted", ids(&["m"]))
            .with("main", ids(&["k"]));
        let weights = SourceWeights::new().with("muted", 0.0);
        assert_eq!(
            fusion.fuse_with_weights(Some(&results), Some(&weights)).unwrap(),
            ids(&["k", "m"])
        );
    }
}

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Model judgement on whether the first retrieval pass covers the query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GapAnalysis {
    #[serde(default)]
    pub identified_gaps: Vec<String>,
    #[serde(default)]
    pub ambiguities: Vec<String>,
    #[serde(default)]
    pub missing_information: Vec<String>,
    #[serde(default)]
    pub needs_expansion: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl GapAnalysis {
    #[must_use]
    pub fn no_expansion_needed() -> Self {
        Self::default()
    }

    /// `needs_expansion` with at least one itemised gap, ambiguity or missing note.
    /// An analysis that asks for expansion without naming anything is not significant.
    #[must_use]
    pub fn has_significant_gaps(&self) -> bool {
        self.needs_expansion
            && (!self.identified_gaps.is_empty()
                || !self.ambiguities.is_empty()
                || !self.missing_information.is_empty())
    }
}

/// One reranked candidate as returned by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RerankEntry {
    #[serde(rename = "expertId", alias = "id", alias = "expert_id")]
    pub expert_id: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Alternative phrasings of the original query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RefinedQueries {
    #[serde(default, alias = "refinedQueries", alias = "refined_queries")]
    pub queries: Vec<String>,
}

impl RefinedQueries {
    /// Accepts either a bare array of strings or an object with a `queries` list.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Array(_) => serde_json::from_value::<Vec<String>>(value)
                .ok()
                .map(|queries| Self { queries }),
            Value::Object(_) => serde_json::from_value(value).ok(),
            _ => None,
        }
    }

    /// Trimmed, non-blank, de-duplicated, excluding `original`, capped at `limit`.
    #[must_use]
    pub fn cleaned(self, original: &str, limit: usize) -> Vec<String> {
        let original = original.trim().to_lowercase();
        let mut out: Vec<String> = Vec::new();
        for query in self.queries {
            let query = query.trim();
            if query.is_empty() || query.to_lowercase() == original {
                continue;
            }
            if out.iter().any(|q| q.eq_ignore_ascii_case(query)) {
                continue;
            }
            out.push(query.to_string());
            if out.len() >= limit {
                break;
            }
        }
        out
    }
}

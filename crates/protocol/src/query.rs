use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the independent retrieval backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchSource {
    Vector,
    Graph,
    Keyword,
}

impl SearchSource {
    pub const ALL: [SearchSource; 3] = [Self::Vector, Self::Graph, Self::Keyword];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Graph => "graph",
            Self::Keyword => "keyword",
        }
    }
}

impl fmt::Display for SearchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchSource {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "vector" | "semantic" => Ok(Self::Vector),
            "graph" => Ok(Self::Graph),
            "keyword" | "lexical" | "fts" => Ok(Self::Keyword),
            other => anyhow::bail!("unknown search source '{other}' (expected vector|graph|keyword)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    #[default]
    ExpertSearch,
    TeamFormation,
    RfpResponse,
    DomainInquiry,
}

impl QueryIntent {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExpertSearch => "expert_search",
            Self::TeamFormation => "team_formation",
            Self::RfpResponse => "rfp_response",
            Self::DomainInquiry => "domain_inquiry",
        }
    }
}

impl fmt::Display for QueryIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional structured constraints pulled out of the query text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryConstraints {
    #[serde(default)]
    pub seniority_levels: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub customers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl QueryConstraints {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seniority_levels.is_empty()
            && self.domains.is_empty()
            && self.customers.is_empty()
            && self.language.is_none()
    }
}

/// Output of the query parser. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedQuery {
    pub original_query: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub intent: QueryIntent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<QueryConstraints>,
}

impl ParsedQuery {
    /// A parsed query with nothing extracted beyond the raw text.
    pub fn bare(text: impl Into<String>) -> Self {
        Self {
            original_query: text.into(),
            keywords: Vec::new(),
            technologies: Vec::new(),
            skills: Vec::new(),
            intent: QueryIntent::ExpertSearch,
            constraints: None,
        }
    }

    /// Skills followed by technologies, without duplicates (case-insensitive).
    #[must_use]
    pub fn search_terms(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.skills
            .iter()
            .chain(self.technologies.iter())
            .filter(|term| seen.insert(term.to_ascii_lowercase()))
            .cloned()
            .collect()
    }
}

/// Entity filters driving the graph and keyword backends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub customers: Vec<String>,
    #[serde(default)]
    pub project_types: Vec<String>,
}

impl SearchFilters {
    /// Filters implied by a parsed query.
    #[must_use]
    pub fn from_parsed(parsed: &ParsedQuery) -> Self {
        let (domains, customers) = parsed
            .constraints
            .as_ref()
            .map(|c| (c.domains.clone(), c.customers.clone()))
            .unwrap_or_default();
        Self {
            technologies: parsed.technologies.clone(),
            skills: parsed.skills.clone(),
            domains,
            customers,
            project_types: Vec::new(),
        }
    }

    /// Union of two filter sets, keeping `self` entries first.
    #[must_use]
    pub fn merged_with(&self, other: &SearchFilters) -> Self {
        fn union(a: &[String], b: &[String]) -> Vec<String> {
            let mut out = a.to_vec();
            for item in b {
                if !out.iter().any(|existing| existing.eq_ignore_ascii_case(item)) {
                    out.push(item.clone());
                }
            }
            out
        }
        Self {
            technologies: union(&self.technologies, &other.technologies),
            skills: union(&self.skills, &other.skills),
            domains: union(&self.domains, &other.domains),
            customers: union(&self.customers, &other.customers),
            project_types: union(&self.project_types, &other.project_types),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.technologies.is_empty()
            && self.skills.is_empty()
            && self.domains.is_empty()
            && self.customers.is_empty()
            && self.project_types.is_empty()
    }
}

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

const SUMMARY_PROJECT_LIMIT: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectExperience {
    pub project_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_type: Option<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
}

/// Prompt-time view of a candidate. Never persisted by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seniority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub projects: Vec<ProjectExperience>,
}

impl CandidateProfile {
    /// Distinct technologies across all projects, in first-seen order.
    #[must_use]
    pub fn technologies(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for tech in self.projects.iter().flat_map(|p| p.technologies.iter()) {
            if !out.iter().any(|t| t.eq_ignore_ascii_case(tech)) {
                out.push(tech);
            }
        }
        out
    }

    /// Compact multi-line text used inside prompts.
    #[must_use]
    pub fn summary_text(&self) -> String {
        let mut out = String::new();
        let _ = write!(out, "Expert ID: {}\nName: {}", self.id, self.name);
        if let Some(seniority) = &self.seniority {
            let _ = write!(out, "\nSeniority: {seniority}");
        }
        if let Some(summary) = &self.summary {
            let _ = write!(out, "\nSummary: {summary}");
        }
        if !self.skills.is_empty() {
            let _ = write!(out, "\nSkills: {}", self.skills.join(", "));
        }
        let technologies = self.technologies();
        if !technologies.is_empty() {
            let _ = write!(out, "\nTechnologies: {}", technologies.join(", "));
        }
        for project in self.projects.iter().take(SUMMARY_PROJECT_LIMIT) {
            let _ = write!(out, "\n- Project: {}", project.project_name);
            if let Some(role) = &project.role {
                let _ = write!(out, " (role: {role})");
            }
            if let Some(customer) = &project.customer {
                let _ = write!(out, " for {customer}");
            }
            if let Some(domain) = &project.domain {
                let _ = write!(out, " [{domain}]");
            }
        }
        if self.projects.len() > SUMMARY_PROJECT_LIMIT {
            let _ = write!(
                out,
                "\n- ... {} more project(s)",
                self.projects.len() - SUMMARY_PROJECT_LIMIT
            );
        }
        out
    }
}

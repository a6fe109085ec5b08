use anyhow::{bail, Context, Result};
use expertmatch_protocol::CandidateProfile;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

#[derive(Deserialize)]
#[serde(untagged)]
enum DatasetFile {
    List(Vec<CandidateProfile>),
    Wrapped { experts: Vec<CandidateProfile> },
}

/// Expert profiles loaded from a JSON file: either a bare array or
/// `{"experts": [...]}`.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub profiles: Vec<CandidateProfile>,
}

impl Dataset {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset {}", path.display()))?;
        let dataset = Self::from_json_str(&raw)
            .with_context(|| format!("Invalid dataset {}", path.display()))?;
        log::info!(
            "Loaded {} experts from {}",
            dataset.profiles.len(),
            path.display()
        );
        Ok(dataset)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let profiles = match serde_json::from_str::<DatasetFile>(raw)? {
            DatasetFile::List(profiles) | DatasetFile::Wrapped { experts: profiles } => profiles,
        };
        let mut seen = HashSet::new();
        for profile in &profiles {
            if profile.id.trim().is_empty() {
                bail!("expert '{}' has a blank id", profile.name);
            }
            if !seen.insert(profile.id.as_str()) {
                bail!("duplicate expert id '{}'", profile.id);
            }
        }
        Ok(Self { profiles })
    }

    /// `(doc_id, expert_id, text)` per work-experience entry, plus one
    /// profile-level document for experts without projects.
    #[must_use]
    pub fn vector_documents(&self) -> Vec<(String, String, String)> {
        let mut docs = Vec::new();
        for profile in &self.profiles {
            if profile.projects.is_empty() {
                let text = [
                    profile.summary.clone().unwrap_or_default(),
                    profile.skills.join(" "),
                ]
                .join(" ");
                docs.push((format!("{}#profile", profile.id), profile.id.clone(), text));
                continue;
            }
            for (i, project) in profile.projects.iter().enumerate() {
                let mut parts = vec![project.project_name.clone()];
                parts.extend(project.role.clone());
                parts.extend(project.domain.clone());
                parts.extend(project.project_type.clone());
                parts.extend(project.technologies.iter().cloned());
                parts.extend(profile.skills.iter().cloned());
                docs.push((format!("{}#{i}", profile.id), profile.id.clone(), parts.join(" ")));
            }
        }
        docs
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<&CandidateProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"id": "e1", "name": "Alice", "skills": ["Microservices"],
         "projects": [{"project_name": "Payments", "technologies": ["Java", "Kafka"]}]},
        {"id": "e2", "name": "Bob", "summary": "Data engineer"}
    ]"#;

    #[test]
    fn accepts_bare_and_wrapped_lists() {
        let bare = Dataset::from_json_str(SAMPLE).unwrap();
        assert_eq!(bare.profiles.len(), 2);

        let wrapped = Dataset::from_json_str(&format!("{{\"experts\": {SAMPLE}}}")).unwrap();
        assert_eq!(wrapped.profiles.len(), 2);
        assert_eq!(wrapped.find("e2").map(|p| p.name.as_str()), Some("Bob"));
    }

    #[test]
    fn rejects_duplicate_and_blank_ids() {
        assert!(Dataset::from_json_str(r#"[{"id": "a", "name": "A"}, {"id": "a", "name": "B"}]"#).is_err());
        assert!(Dataset::from_json_str(r#"[{"id": " ", "name": "A"}]"#).is_err());
    }

    #[test]
    fn one_document_per_project() {
        let docs = Dataset::from_json_str(SAMPLE).unwrap().vector_documents();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].0, "e1#0");
        assert!(docs[0].2.contains("Kafka"));
        assert_eq!(docs[1].0, "e2#profile");
    }
}

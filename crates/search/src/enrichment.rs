use crate::error::Result;
use async_trait::async_trait;
use expertmatch_protocol::CandidateProfile;
use std::collections::HashMap;

/// Read-only lookup turning candidate ids into prompt-ready profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Profiles for `ids`, in request order. Unknown ids are skipped.
    async fn find_profiles(&self, ids: &[String]) -> Result<Vec<CandidateProfile>>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryProfileStore {
    profiles: HashMap<String, CandidateProfile>,
}

impl InMemoryProfileStore {
    #[must_use]
    pub fn new(profiles: impl IntoIterator<Item = CandidateProfile>) -> Self {
        Self {
            profiles: profiles.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&CandidateProfile> {
        self.profiles.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn find_profiles(&self, ids: &[String]) -> Result<Vec<CandidateProfile>> {
        let found: Vec<CandidateProfile> = ids
            .iter()
            .filter_map(|id| self.profiles.get(id).cloned())
            .collect();
        if found.len() < ids.len() {
            log::debug!(
                "Enrichment resolved {} of {} candidates",
                found.len(),
                ids.len()
            );
        }
        Ok(found)
    }
}

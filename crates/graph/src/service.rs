use crate::engine::GraphEngine;
use crate::error::Result;
use expertmatch_protocol::SearchFilters;
use std::collections::HashSet;
use std::sync::Arc;

/// Graph search output. `degraded` is set when an engine error was swallowed,
/// so "no matches" and "backend failed" stay distinguishable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphSearchOutcome {
    pub expert_ids: Vec<String>,
    pub degraded: bool,
}

impl GraphSearchOutcome {
    fn degraded() -> Self {
        Self {
            expert_ids: Vec::new(),
            degraded: true,
        }
    }
}

/// Relationship-graph search over experts, projects, customers and technologies.
///
/// Engine errors never propagate: they are logged and turned into an empty,
/// degraded outcome.
#[derive(Clone, Default)]
pub struct GraphSearchService {
    engine: Option<Arc<dyn GraphEngine>>,
}

impl GraphSearchService {
    pub fn new(engine: Arc<dyn GraphEngine>) -> Self {
        Self {
            engine: Some(engine),
        }
    }

    /// A service with no graph behind it; every search is empty.
    #[must_use]
    pub fn disconnected() -> Self {
        Self { engine: None }
    }

    /// Runs the filter-driven traversals in order technologies, skills,
    /// domains, customers, project types; ids are deduplicated in order of
    /// first discovery.
    pub async fn search(&self, filters: &SearchFilters) -> GraphSearchOutcome {
        let Some(engine) = &self.engine else {
            return GraphSearchOutcome::default();
        };
        match Self::traverse(engine.as_ref(), filters).await {
            Ok(expert_ids) => {
                log::debug!("Graph search returned {} experts", expert_ids.len());
                GraphSearchOutcome {
                    expert_ids,
                    degraded: false,
                }
            }
            Err(err) => {
                log::warn!("Graph search failed, returning empty result: {err}");
                GraphSearchOutcome::degraded()
            }
        }
    }

    async fn traverse(engine: &dyn GraphEngine, filters: &SearchFilters) -> Result<Vec<String>> {
        if !engine.graph_exists().await? {
            log::debug!("Graph search skipped: graph does not exist");
            return Ok(Vec::new());
        }

        let mut collected = Collector::default();
        match filters.technologies.as_slice() {
            [] => {}
            [single] => collected.extend(engine.experts_by_technology(single).await?),
            many => collected.extend(engine.experts_by_technologies(many).await?),
        }
        for skill in &filters.skills {
            collected.extend(engine.experts_by_technology(skill).await?);
        }
        for domain in &filters.domains {
            collected.extend(engine.experts_by_domain(domain).await?);
        }
        for customer in &filters.customers {
            collected.extend(engine.experts_by_customer(customer).await?);
        }
        for project_type in &filters.project_types {
            collected.extend(engine.experts_by_project_type(project_type).await?);
        }
        Ok(collected.ids)
    }

    /// Single-technology traversal; empty on engine error.
    pub async fn find_experts_by_technology(&self, technology: &str) -> GraphSearchOutcome {
        let filters = SearchFilters {
            technologies: vec![technology.to_string()],
            ..SearchFilters::default()
        };
        self.search(&filters).await
    }

    /// Experts who share a project with `expert_id`; empty on engine error.
    pub async fn find_collaborating_experts(&self, expert_id: &str) -> GraphSearchOutcome {
        let Some(engine) = &self.engine else {
            return GraphSearchOutcome::default();
        };
        match engine.collaborating_experts(expert_id).await {
            Ok(expert_ids) => GraphSearchOutcome {
                expert_ids,
                degraded: false,
            },
            Err(err) => {
                log::warn!("Collaborator lookup for {expert_id} failed: {err}");
                GraphSearchOutcome::degraded()
            }
        }
    }
}

#[derive(Default)]
struct Collector {
    seen: HashSet<String>,
    ids: Vec<String>,
}

impl Collector {
    fn extend(&mut self, ids: Vec<String>) {
        for id in ids {
            if self.seen.insert(id.clone()) {
                self.ids.push(id);
            }
        }
    }
}

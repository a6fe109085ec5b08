use crate::error::Result;
use crate::types::ExpertGraph;
use async_trait::async_trait;

/// Traversal backend behind [`crate::GraphSearchService`].
///
/// Implementations may talk to an external graph database; the in-memory
/// [`ExpertGraph`] is the bundled one.
#[async_trait]
pub trait GraphEngine: Send + Sync {
    /// `false` when no graph has been created yet.
    async fn graph_exists(&self) -> Result<bool>;

    async fn experts_by_technology(&self, technology: &str) -> Result<Vec<String>>;

    async fn experts_by_technologies(&self, technologies: &[String]) -> Result<Vec<String>>;

    async fn experts_by_domain(&self, domain: &str) -> Result<Vec<String>>;

    async fn experts_by_customer(&self, customer: &str) -> Result<Vec<String>>;

    async fn experts_by_project_type(&self, project_type: &str) -> Result<Vec<String>>;

    async fn collaborating_experts(&self, expert_id: &str) -> Result<Vec<String>>;
}

#[async_trait]
impl GraphEngine for ExpertGraph {
    async fn graph_exists(&self) -> Result<bool> {
        Ok(!self.is_empty())
    }

    async fn experts_by_technology(&self, technology: &str) -> Result<Vec<String>> {
        Ok(ExpertGraph::experts_by_technology(self, technology))
    }

    async fn experts_by_technologies(&self, technologies: &[String]) -> Result<Vec<String>> {
        Ok(ExpertGraph::experts_by_technologies(self, technologies))
    }

    async fn experts_by_domain(&self, domain: &str) -> Result<Vec<String>> {
        Ok(ExpertGraph::experts_by_domain(self, domain))
    }

    async fn experts_by_customer(&self, customer: &str) -> Result<Vec<String>> {
        Ok(ExpertGraph::experts_by_customer(self, customer))
    }

    async fn experts_by_project_type(&self, project_type: &str) -> Result<Vec<String>> {
        Ok(ExpertGraph::experts_by_project_type(self, project_type))
    }

    async fn collaborating_experts(&self, expert_id: &str) -> Result<Vec<String>> {
        ExpertGraph::collaborating_experts(self, expert_id)
    }
}

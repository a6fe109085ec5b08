use crate::error::{GraphError, Result};
use crate::types::{EdgeKind, ExpertGraph, VertexKind};
use petgraph::graph::NodeIndex;
use std::collections::HashMap;

impl ExpertGraph {
    /// Experts that worked on a project using `technology`.
    pub fn experts_by_technology(&self, technology: &str) -> Vec<String> {
        let Some(tech) = self.find(VertexKind::Technology, technology) else {
            return Vec::new();
        };
        let projects = self.incoming(tech, EdgeKind::UsesTechnology);
        self.rank_experts(self.count_workers(&projects))
    }

    /// Experts whose projects cover every technology in `technologies`.
    pub fn experts_by_technologies(&self, technologies: &[String]) -> Vec<String> {
        if technologies.is_empty() {
            return Vec::new();
        }
        let mut combined: Option<HashMap<NodeIndex, usize>> = None;
        for technology in technologies {
            let Some(tech) = self.find(VertexKind::Technology, technology) else {
                return Vec::new();
            };
            let counts = self.count_workers(&self.incoming(tech, EdgeKind::UsesTechnology));
            combined = Some(match combined {
                None => counts,
                Some(acc) => acc
                    .into_iter()
                    .filter_map(|(expert, n)| counts.get(&expert).map(|m| (expert, n + m)))
                    .collect(),
            });
        }
        self.rank_experts(combined.unwrap_or_default())
    }

    /// Experts with a project whose `domain` property matches.
    pub fn experts_by_domain(&self, domain: &str) -> Vec<String> {
        self.experts_by_project_property("domain", domain)
    }

    pub fn experts_by_project_type(&self, project_type: &str) -> Vec<String> {
        self.experts_by_project_property("project_type", project_type)
    }

    pub fn experts_by_customer(&self, customer: &str) -> Vec<String> {
        let Some(customer) = self.find(VertexKind::Customer, customer) else {
            return Vec::new();
        };
        let projects = self.incoming(customer, EdgeKind::ForCustomer);
        self.rank_experts(self.count_workers(&projects))
    }

    /// Experts sharing at least one project with `expert_id`, most shared first.
    pub fn collaborating_experts(&self, expert_id: &str) -> Result<Vec<String>> {
        let expert = self
            .find(VertexKind::Expert, expert_id)
            .ok_or_else(|| GraphError::VertexNotFound(format!("Expert {expert_id}")))?;
        let projects = self.outgoing(expert, EdgeKind::WorkedOn);
        let mut counts = self.count_workers(&projects);
        counts.remove(&expert);
        Ok(self.rank_experts(counts))
    }

    fn experts_by_project_property(&self, property: &str, value: &str) -> Vec<String> {
        let wanted = value.trim();
        if wanted.is_empty() {
            return Vec::new();
        }
        let projects: Vec<NodeIndex> = self
            .vertices(VertexKind::Project)
            .filter(|(_, v)| {
                v.property(property)
                    .is_some_and(|p| p.trim().eq_ignore_ascii_case(wanted))
            })
            .map(|(idx, _)| idx)
            .collect();
        self.rank_experts(self.count_workers(&projects))
    }

    /// Number of listed projects each expert worked on.
    fn count_workers(&self, projects: &[NodeIndex]) -> HashMap<NodeIndex, usize> {
        let mut counts = HashMap::new();
        for &project in projects {
            for expert in self.incoming(project, EdgeKind::WorkedOn) {
                *counts.entry(expert).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Expert ids by descending count, ties by insertion order.
    fn rank_experts(&self, counts: HashMap<NodeIndex, usize>) -> Vec<String> {
        let mut ranked: Vec<(NodeIndex, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
            .into_iter()
            .filter_map(|(idx, _)| self.vertex(idx))
            .filter(|v| v.kind == VertexKind::Expert)
            .map(|v| v.key.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::ExpertGraphBuilder;
    use crate::types::ExpertGraph;
    use expertmatch_protocol::{CandidateProfile, ProjectExperience};
    use pretty_assertions::assert_eq;

    fn project(name: &str, customer: &str, domain: &str, techs: &[&str]) -> ProjectExperience {
        ProjectExperience {
            project_name: name.to_string(),
            customer: Some(customer.to_string()),
            domain: Some(domain.to_string()),
            project_type: Some("Platform".to_string()),
            technologies: techs.iter().map(|t| t.to_string()).collect(),
            ..ProjectExperience::default()
        }
    }

    fn expert(id: &str, projects: Vec<ProjectExperience>) -> CandidateProfile {
        CandidateProfile {
            id: id.to_string(),
            name: id.to_uppercase(),
            projects,
            ..CandidateProfile::default()
        }
    }

    fn fixture() -> ExpertGraph {
        ExpertGraphBuilder::build(&[
            expert(
                "e1",
                vec![
                    project("Atlas", "Acme", "Banking", &["Java", "Kafka"]),
                    project("Beacon", "Globex", "Retail", &["Kafka"]),
                ],
            ),
            expert("e2", vec![project("Atlas", "Acme", "Banking", &["Java", "Kafka"])]),
            expert("e3", vec![project("Comet", "Initech", "Healthcare", &["Python"])]),
        ])
        .unwrap()
    }

    #[test]
    fn by_technology_ranks_by_matching_projects() {
        let graph = fixture();
        assert_eq!(graph.experts_by_technology("kafka"), vec!["e1", "e2"]);
        assert!(graph.experts_by_technology("Cobol").is_empty());
    }

    #[test]
    fn by_technologies_requires_all() {
        let graph = fixture();
        let both = vec!["Java".to_string(), "Kafka".to_string()];
        assert_eq!(graph.experts_by_technologies(&both), vec!["e1", "e2"]);
        let impossible = vec!["Java".to_string(), "Python".to_string()];
        assert!(graph.experts_by_technologies(&impossible).is_empty());
    }

    #[test]
    fn by_domain_customer_and_type() {
        let graph = fixture();
        assert_eq!(graph.experts_by_domain("healthcare"), vec!["e3"]);
        assert_eq!(graph.experts_by_customer("Globex"), vec!["e1"]);
        assert_eq!(graph.experts_by_project_type("platform"), vec!["e1", "e2", "e3"]);
    }

    #[test]
    fn collaborators_exclude_self() {
        let graph = fixture();
        assert_eq!(graph.collaborating_experts("e2").unwrap(), vec!["e1"]);
        assert!(graph.collaborating_experts("e3").unwrap().is_empty());
        assert!(graph.collaborating_experts("missing").is_err());
    }
}

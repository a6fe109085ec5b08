use crate::error::{GraphError, Result};
use crate::types::{normalize_key, EdgeKind, ExpertGraph, GraphEdge, GraphVertex, VertexKind};
use expertmatch_protocol::CandidateProfile;
use std::collections::BTreeMap;

/// Builds an [`ExpertGraph`] from expert profiles.
///
/// Each profile becomes an Expert vertex; each project becomes a Project vertex
/// (shared across experts by name) linked to its customer and technologies.
#[derive(Debug, Default)]
pub struct ExpertGraphBuilder {
    graph: ExpertGraph,
}

impl ExpertGraphBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_profile(&mut self, profile: &CandidateProfile) -> Result<()> {
        if profile.id.trim().is_empty() {
            return Err(GraphError::BuildError(format!(
                "expert '{}' has no id",
                profile.name
            )));
        }

        let mut expert_props = BTreeMap::new();
        if let Some(seniority) = &profile.seniority {
            expert_props.insert("seniority".to_string(), seniority.clone());
        }
        let expert = self.graph.upsert_vertex(GraphVertex {
            kind: VertexKind::Expert,
            key: profile.id.clone(),
            label: profile.name.clone(),
            properties: expert_props,
        });

        for project in &profile.projects {
            if project.project_name.trim().is_empty() {
                log::debug!("Skipping unnamed project for expert {}", profile.id);
                continue;
            }
            let mut props = BTreeMap::new();
            if let Some(domain) = &project.domain {
                props.insert("domain".to_string(), domain.clone());
            }
            if let Some(project_type) = &project.project_type {
                props.insert("project_type".to_string(), project_type.clone());
            }
            let project_idx = self.graph.upsert_vertex(GraphVertex {
                kind: VertexKind::Project,
                key: normalize_key(&project.project_name),
                label: project.project_name.clone(),
                properties: props,
            });
            self.graph.add_edge(
                expert,
                project_idx,
                GraphEdge {
                    kind: EdgeKind::WorkedOn,
                    role: project.role.clone(),
                },
            );

            if let Some(customer) = project.customer.as_deref().filter(|c| !c.trim().is_empty()) {
                let customer_idx = self.graph.upsert_vertex(GraphVertex {
                    kind: VertexKind::Customer,
                    key: normalize_key(customer),
                    label: customer.trim().to_string(),
                    properties: BTreeMap::new(),
                });
                self.graph.add_edge(
                    project_idx,
                    customer_idx,
                    GraphEdge {
                        kind: EdgeKind::ForCustomer,
                        role: None,
                    },
                );
            }

            for tech in project.technologies.iter().filter(|t| !t.trim().is_empty()) {
                let tech_idx = self.graph.upsert_vertex(GraphVertex {
                    kind: VertexKind::Technology,
                    key: normalize_key(tech),
                    label: tech.trim().to_string(),
                    properties: BTreeMap::new(),
                });
                self.graph.add_edge(
                    project_idx,
                    tech_idx,
                    GraphEdge {
                        kind: EdgeKind::UsesTechnology,
                        role: None,
                    },
                );
            }
        }
        Ok(())
    }

    pub fn build(profiles: &[CandidateProfile]) -> Result<ExpertGraph> {
        let mut builder = Self::new();
        for profile in profiles {
            builder.add_profile(profile)?;
        }
        let graph = builder.finish();
        let stats = graph.stats();
        log::info!(
            "Built expert graph: {} experts, {} projects, {} customers, {} technologies, {} edges",
            stats.experts,
            stats.projects,
            stats.customers,
            stats.technologies,
            stats.edges
        );
        Ok(graph)
    }

    #[must_use]
    pub fn finish(self) -> ExpertGraph {
        self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expertmatch_protocol::ProjectExperience;
    use pretty_assertions::assert_eq;

    #[test]
    fn shared_projects_and_technologies_collapse() {
        let profiles = vec![
            CandidateProfile {
                id: "e1".into(),
                name: "Ada".into(),
                projects: vec![ProjectExperience {
                    project_name: "Atlas".into(),
                    customer: Some("Acme Bank".into()),
                    domain: Some("Banking".into()),
                    technologies: vec!["Kafka".into(), "Java".into()],
                    ..ProjectExperience::default()
                }],
                ..CandidateProfile::default()
            },
            CandidateProfile {
                id: "e2".into(),
                name: "Grace".into(),
                projects: vec![ProjectExperience {
                    project_name: "atlas".into(),
                    technologies: vec!["kafka".into()],
                    ..ProjectExperience::default()
                }],
                ..CandidateProfile::default()
            },
        ];
        let graph = ExpertGraphBuilder::build(&profiles).unwrap();
        let stats = graph.stats();
        assert_eq!(stats.experts, 2);
        assert_eq!(stats.projects, 1);
        assert_eq!(stats.customers, 1);
        assert_eq!(stats.technologies, 2);
        // 2 WORKED_ON + 1 FOR_CUSTOMER + 2 USES_TECHNOLOGY
        assert_eq!(stats.edges, 5);
    }

    #[test]
    fn missing_expert_id_is_rejected() {
        let profile = CandidateProfile {
            name: "Nobody".into(),
            ..CandidateProfile::default()
        };
        assert!(ExpertGraphBuilder::build(&[profile]).is_err());
    }
}

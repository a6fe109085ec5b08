use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VertexKind {
    Expert,
    Project,
    Customer,
    Technology,
}

impl VertexKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Expert => "Expert",
            Self::Project => "Project",
            Self::Customer => "Customer",
            Self::Technology => "Technology",
        }
    }
}

impl fmt::Display for VertexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship between vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Expert -> Project
    WorkedOn,
    /// Project -> Technology
    UsesTechnology,
    /// Project -> Customer
    ForCustomer,
}

impl EdgeKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WorkedOn => "WORKED_ON",
            Self::UsesTechnology => "USES_TECHNOLOGY",
            Self::ForCustomer => "FOR_CUSTOMER",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphVertex {
    pub kind: VertexKind,
    /// Stable identifier; expert ids verbatim, other kinds by lowercased name.
    pub key: String,
    /// Display name.
    pub label: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl GraphVertex {
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub kind: EdgeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphStats {
    pub experts: usize,
    pub projects: usize,
    pub customers: usize,
    pub technologies: usize,
    pub edges: usize,
}

/// Property graph of experts, their projects, customers and technologies.
#[derive(Debug, Default)]
pub struct ExpertGraph {
    pub graph: DiGraph<GraphVertex, GraphEdge>,
    index: HashMap<(VertexKind, String), NodeIndex>,
}

/// Lookup key for non-expert vertices.
#[must_use]
pub fn normalize_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl ExpertGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the existing vertex for `(kind, key)` or inserts a new one.
    /// Properties of an existing vertex are extended, never overwritten.
    pub fn upsert_vertex(&mut self, vertex: GraphVertex) -> NodeIndex {
        let lookup = (vertex.kind, vertex.key.clone());
        if let Some(&idx) = self.index.get(&lookup) {
            if let Some(existing) = self.graph.node_weight_mut(idx) {
                for (name, value) in vertex.properties {
                    existing.properties.entry(name).or_insert(value);
                }
            }
            return idx;
        }
        let idx = self.graph.add_node(vertex);
        self.index.insert(lookup, idx);
        idx
    }

    /// Adds an edge unless one of the same kind already joins the two vertices.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, edge: GraphEdge) {
        let exists = self
            .graph
            .edges_connecting(from, to)
            .any(|e| e.weight().kind == edge.kind);
        if !exists {
            self.graph.add_edge(from, to, edge);
        }
    }

    #[must_use]
    pub fn find(&self, kind: VertexKind, key: &str) -> Option<NodeIndex> {
        let key = match kind {
            VertexKind::Expert => key.to_string(),
            _ => normalize_key(key),
        };
        self.index.get(&(kind, key)).copied()
    }

    #[must_use]
    pub fn vertex(&self, idx: NodeIndex) -> Option<&GraphVertex> {
        self.graph.node_weight(idx)
    }

    /// Vertices of `kind`, in insertion order.
    pub fn vertices(&self, kind: VertexKind) -> impl Iterator<Item = (NodeIndex, &GraphVertex)> {
        self.graph
            .node_indices()
            .filter_map(move |idx| self.graph.node_weight(idx).map(|v| (idx, v)))
            .filter(move |(_, v)| v.kind == kind)
    }

    /// Targets of outgoing `kind` edges.
    pub fn outgoing(&self, idx: NodeIndex, kind: EdgeKind) -> Vec<NodeIndex> {
        self.graph
            .edges(idx)
            .filter(|e| e.weight().kind == kind)
            .map(|e| e.target())
            .collect()
    }

    /// Sources of incoming `kind` edges.
    pub fn incoming(&self, idx: NodeIndex, kind: EdgeKind) -> Vec<NodeIndex> {
        self.graph
            .edges_directed(idx, petgraph::Direction::Incoming)
            .filter(|e| e.weight().kind == kind)
            .map(|e| e.source())
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    #[must_use]
    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            edges: self.graph.edge_count(),
            ..GraphStats::default()
        };
        for vertex in self.graph.node_weights() {
            match vertex.kind {
                VertexKind::Expert => stats.experts += 1,
                VertexKind::Project => stats.projects += 1,
                VertexKind::Customer => stats.customers += 1,
                VertexKind::Technology => stats.technologies += 1,
            }
        }
        stats
    }
}

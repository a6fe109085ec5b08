//! # ExpertMatch Graph
//!
//! Relationship-graph search over the expert / project / customer / technology
//! property graph.
//!
//! ## Architecture
//!
//! ```text
//! CandidateProfile[]
//!     │
//!     ├──> ExpertGraphBuilder
//!     │      ├─ Expert ──WORKED_ON──────> Project
//!     │      ├─ Project ─USES_TECHNOLOGY─> Technology
//!     │      └─ Project ─FOR_CUSTOMER────> Customer
//!     │
//!     ├──> ExpertGraph (petgraph)  implements GraphEngine
//!     │
//!     └──> GraphSearchService
//!            ├─ technologies (single / AND), skills, domains, customers, project types
//!            └─ engine errors -> empty + degraded
//! ```

mod builder;
mod engine;
mod error;
mod graph;
mod service;
mod types;

pub use builder::ExpertGraphBuilder;
pub use engine::GraphEngine;
pub use error::{GraphError, Result};
pub use service::{GraphSearchOutcome, GraphSearchService};
pub use types::{EdgeKind, ExpertGraph, GraphEdge, GraphStats, GraphVertex, VertexKind};

/// Dependency graph artifact types.
pub mod model;

/// Query mini-language over the dependency graph.
pub mod queries;

pub use model::{DependencyGraph, GraphEdge, GraphNode};
pub use queries::{query_dependency_graph, GraphQuery, GraphQueryEngine};

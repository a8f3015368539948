use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::Result;

/// A file node in the dependency graph artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(default)]
    pub spectral_freq: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub essence: String,
    #[serde(default)]
    pub exports_count: u64,
    /// Any further attributes the producer recorded; echoed back untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A directed `source -> target` edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphMetadata {
    #[serde(default)]
    pub hyperedges: Vec<Value>,
    #[serde(default)]
    pub clusters: Vec<Value>,
    #[serde(default)]
    pub void_dirs: Vec<Value>,
    /// Precomputed structural checks, kept exactly as the producer wrote them.
    #[serde(default)]
    pub validation: Value,
}

/// The dependency graph as produced by external tooling.
///
/// Node ids are expected to be unique and edges to reference existing ids;
/// neither is checked here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyGraph {
    #[serde(default)]
    pub directed: bool,
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
    #[serde(default)]
    pub metadata: GraphMetadata,
}

impl DependencyGraph {
    /// Reads and parses a graph artifact.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

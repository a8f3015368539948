use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde_json::{json, Value};
use tracing::debug;

use super::model::{DependencyGraph, GraphEdge};

/// Maximum number of nodes returned by a `spectral` query.
pub const SPECTRAL_LIMIT: usize = 50;

/// Query forms understood by [`GraphQueryEngine::run`].
pub const SUPPORTED_COMMANDS: [&str; 5] = [
    "node <filename>",
    "dependencies <filename>",
    "dependents <filename>",
    "spectral <RED|ORANGE|GOLD|BLUE|WHITE|INDIGO|VIOLET>",
    "stats",
];

/// A parsed query: lower-cased command word plus its lower-cased argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphQuery {
    pub command: String,
    pub arg: String,
}

impl GraphQuery {
    /// Splits on whitespace; the first token is the command and the rest,
    /// rejoined with single spaces, is the argument.
    pub fn parse(query: &str) -> Self {
        let lowered = query.trim().to_lowercase();
        let mut parts = lowered.split_whitespace();
        let command = parts.next().unwrap_or_default().to_string();
        let arg = parts.collect::<Vec<_>>().join(" ");
        Self { command, arg }
    }
}

/// Read-only query operations over a loaded dependency graph.
pub struct GraphQueryEngine<'a> {
    graph: &'a DependencyGraph,
}

impl<'a> GraphQueryEngine<'a> {
    pub fn new(graph: &'a DependencyGraph) -> Self {
        Self { graph }
    }

    /// Runs a query string and returns the structured answer.
    ///
    /// Unmatched lookups and unknown commands are reported as `error` fields
    /// in the returned value.
    pub fn run(&self, query: &str) -> Value {
        let q = GraphQuery::parse(query);
        debug!(command = %q.command, arg = %q.arg, "graph query");

        match q.command.as_str() {
            "node" => self.node(&q.arg),
            "dependencies" => self.dependencies(&q.arg),
            "dependents" => self.dependents(&q.arg),
            "spectral" => self.spectral(&q.arg),
            "stats" => self.stats(),
            _ => json!({
                "error": "Unknown query command",
                "command": q.command,
                "supported_commands": SUPPORTED_COMMANDS,
            }),
        }
    }

    /// First node whose id contains `needle`, case-insensitively.
    pub fn node(&self, needle: &str) -> Value {
        let needle = needle.to_lowercase();
        match self
            .graph
            .nodes
            .iter()
            .find(|n| n.id.to_lowercase().contains(&needle))
        {
            Some(node) => json!({ "node": node }),
            None => json!({ "error": "Node not found", "query": needle }),
        }
    }

    /// Distinct targets of edges whose source contains `needle`.
    pub fn dependencies(&self, needle: &str) -> Value {
        let deps = self.neighbours(needle, |e| (&e.source, &e.target));
        json!({
            "file": needle,
            "count": deps.len(),
            "dependencies": deps,
        })
    }

    /// Distinct sources of edges whose target contains `needle`.
    pub fn dependents(&self, needle: &str) -> Value {
        let deps = self.neighbours(needle, |e| (&e.target, &e.source));
        json!({
            "file": needle,
            "count": deps.len(),
            "dependents": deps,
        })
    }

    /// Collects the far end of every edge whose near end contains `needle`,
    /// de-duplicated in first-seen order.
    fn neighbours<F>(&self, needle: &str, ends: F) -> Vec<String>
    where
        F: Fn(&GraphEdge) -> (&String, &String),
    {
        let needle = needle.to_lowercase();
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for edge in &self.graph.edges {
            let (near, far) = ends(edge);
            if near.to_lowercase().contains(&needle) && seen.insert(far.as_str()) {
                out.push(far.clone());
            }
        }
        out
    }

    /// Nodes tagged with spectral frequency `freq`, compared upper-cased.
    pub fn spectral(&self, freq: &str) -> Value {
        let freq = freq.to_uppercase();
        let matches: Vec<_> = self
            .graph
            .nodes
            .iter()
            .filter(|n| n.spectral_freq.to_uppercase() == freq)
            .collect();
        let total = matches.len();

        json!({
            "frequency": freq,
            "nodes": &matches[..total.min(SPECTRAL_LIMIT)],
            "total_count": total,
            "truncated": total > SPECTRAL_LIMIT,
        })
    }

    /// Aggregate counts plus the validation flags stored in the artifact.
    ///
    /// Nodes without a `spectral_freq` are counted under the `""` key.
    pub fn stats(&self) -> Value {
        let mut distribution: BTreeMap<&str, usize> = BTreeMap::new();
        for node in &self.graph.nodes {
            *distribution.entry(node.spectral_freq.as_str()).or_insert(0) += 1;
        }

        json!({
            "total_nodes": self.graph.nodes.len(),
            "total_hyperedges": self.graph.edges.len(),
            "directed": self.graph.directed,
            "spectral_distribution": distribution,
            "void_directories": self.graph.metadata.void_dirs.len(),
            "clusters": self.graph.metadata.clusters.len(),
            "validation": self.graph.metadata.validation,
        })
    }
}

/// Loads the graph at `path` and runs `query` against it.
///
/// Never fails: a missing artifact yields `{error, path}` and a malformed
/// one yields `{error, message}`.
pub fn query_dependency_graph(path: &Path, query: &str) -> Value {
    if !path.exists() {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "dependency graph".to_string());
        return json!({
            "error": format!("{} not found", name),
            "path": path.display().to_string(),
        });
    }

    match DependencyGraph::load(path) {
        Ok(graph) => GraphQueryEngine::new(&graph).run(query),
        Err(e) => json!({
            "error": "Failed to query dependency graph",
            "message": e.to_string(),
        }),
    }
}

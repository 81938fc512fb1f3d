//! Graph data model: nodes, edges, traversal paths, inferred connections.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Weight assumed for an edge that carries none.
pub const DEFAULT_EDGE_WEIGHT: f64 = 1.0;

/// Node as returned by the similarity index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub content: String,
    /// May be empty in snapshots that have not been embedded yet.
    #[serde(default)]
    pub embedding: Vec<f32>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, content: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            embedding,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Directed, typed edge. Direction of exploration is decided by the traversal, not the edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl GraphEdge {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        edge_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            edge_type: edge_type.into(),
            weight: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Edge weight, or [`DEFAULT_EDGE_WEIGHT`] when unset.
    pub fn effective_weight(&self) -> f64 {
        self.weight.unwrap_or(DEFAULT_EDGE_WEIGHT)
    }

    /// The endpoint on the other side of `node_id`, if the edge touches it.
    pub fn other_endpoint(&self, node_id: &str) -> Option<&str> {
        if self.source == node_id {
            Some(&self.target)
        } else if self.target == node_id {
            Some(&self.source)
        } else {
            None
        }
    }
}

/// Why a [`TraversalPath`] could not be built.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PathError {
    #[error("path must contain at least one node")]
    Empty,
    #[error("path has {nodes} nodes but {edges} edges")]
    EdgeCount { nodes: usize, edges: usize },
    #[error("node {0} appears more than once in path")]
    Cycle(String),
}

/// Acyclic chain of nodes plus the edges joining consecutive nodes.
///
/// Nodes and edges are fixed at construction; only the score can move afterwards
/// (see [`TraversalPath::boost`]).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraversalPath {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    score: f64,
}

impl TraversalPath {
    pub fn new(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>, score: f64) -> Result<Self, PathError> {
        if nodes.is_empty() {
            return Err(PathError::Empty);
        }
        if edges.len() + 1 != nodes.len() {
            return Err(PathError::EdgeCount {
                nodes: nodes.len(),
                edges: edges.len(),
            });
        }
        let mut seen = HashSet::with_capacity(nodes.len());
        for node in &nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(PathError::Cycle(node.id.clone()));
            }
        }
        Ok(Self {
            nodes,
            edges,
            score: clamp_unit(score),
        })
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.id.as_str())
    }

    /// True when `source` is immediately followed by `target` somewhere in the path.
    pub fn has_consecutive_pair(&self, source: &str, target: &str) -> bool {
        self.nodes
            .windows(2)
            .any(|w| w[0].id == source && w[1].id == target)
    }

    /// Add `amount` to the score, keeping it within [0, 1].
    pub fn boost(&mut self, amount: f64) {
        self.score = clamp_unit(self.score + amount);
    }
}

/// Edge proposed by inference. Advisory only; never written to the graph store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferredConnection {
    pub source_node: String,
    pub target_node: String,
    pub reasoning: String,
    pub confidence: f64,
    pub inferred_type: String,
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> GraphNode {
        GraphNode::new(id, id, vec![])
    }

    #[test]
    fn path_rejects_repeated_nodes() {
        let err = TraversalPath::new(
            vec![node("a"), node("b"), node("a")],
            vec![GraphEdge::new("e1", "a", "b", "r"), GraphEdge::new("e2", "b", "a", "r")],
            0.5,
        )
        .unwrap_err();
        assert_eq!(err, PathError::Cycle("a".to_string()));
    }

    #[test]
    fn path_requires_one_edge_per_hop() {
        let err = TraversalPath::new(vec![node("a"), node("b")], vec![], 0.5).unwrap_err();
        assert_eq!(err, PathError::EdgeCount { nodes: 2, edges: 0 });
        assert_eq!(
            TraversalPath::new(vec![], vec![], 0.5).unwrap_err(),
            PathError::Empty
        );
    }

    #[test]
    fn boost_clamps_at_one() {
        let mut path = TraversalPath::new(vec![node("a")], vec![], 0.97).unwrap();
        path.boost(0.08);
        assert_eq!(path.score(), 1.0);
    }

    #[test]
    fn consecutive_pair_is_directional() {
        let path = TraversalPath::new(
            vec![node("n1"), node("n2")],
            vec![GraphEdge::new("e", "n1", "n2", "r")],
            0.4,
        )
        .unwrap();
        assert!(path.has_consecutive_pair("n1", "n2"));
        assert!(!path.has_consecutive_pair("n2", "n1"));
    }

    #[test]
    fn edge_type_serializes_as_type() {
        let edge = GraphEdge::new("e", "a", "b", "part_of");
        let json = serde_json::to_value(&edge).unwrap();
        assert_eq!(json["type"], "part_of");
        assert!(json.get("weight").is_none());
        assert_eq!(edge.effective_weight(), DEFAULT_EDGE_WEIGHT);
    }
}

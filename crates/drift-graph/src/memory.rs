//! In-memory graph index with KNN search over embeddings.

use drift_types::{GraphEdge, GraphNode, IndexError, SimilarityIndex};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type EdgeIndex = HashMap<String, Vec<String>>;

/// In-memory implementation of [`SimilarityIndex`].
/// Nodes and edges are keyed by id; edges are additionally indexed by both endpoints.
pub struct InMemoryGraphIndex {
    /// node_id -> node.
    nodes: Arc<RwLock<HashMap<String, GraphNode>>>,
    /// edge_id -> edge.
    edges: Arc<RwLock<HashMap<String, GraphEdge>>>,
    /// source node_id -> edge_ids.
    out_index: Arc<RwLock<EdgeIndex>>,
    /// target node_id -> edge_ids.
    in_index: Arc<RwLock<EdgeIndex>>,
}

impl InMemoryGraphIndex {
    pub fn new() -> Self {
        Self {
            nodes: Arc::new(RwLock::new(HashMap::new())),
            edges: Arc::new(RwLock::new(HashMap::new())),
            out_index: Arc::new(RwLock::new(HashMap::new())),
            in_index: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn add_edge_to_index(index: &mut EdgeIndex, node_id: &str, edge_id: &str) {
        let list = index.entry(node_id.to_string()).or_default();
        if !list.iter().any(|x| x == edge_id) {
            list.push(edge_id.to_string());
        }
    }

    fn remove_edge_from_index(index: &mut EdgeIndex, node_id: &str, edge_id: &str) {
        if let Some(list) = index.get_mut(node_id) {
            list.retain(|x| x != edge_id);
            if list.is_empty() {
                index.remove(node_id);
            }
        }
    }

    /// Insert or replace a node.
    pub async fn add_node(&self, node: GraphNode) {
        self.nodes.write().await.insert(node.id.clone(), node);
    }

    pub async fn add_nodes_batch(&self, nodes: impl IntoIterator<Item = GraphNode>) {
        let mut guard = self.nodes.write().await;
        for node in nodes {
            guard.insert(node.id.clone(), node);
        }
    }

    /// Insert or replace edges. Fails without writing anything if an endpoint is unknown.
    pub async fn add_edges_batch(&self, edges: &[GraphEdge]) -> Result<(), IndexError> {
        if edges.is_empty() {
            return Ok(());
        }
        {
            let nodes = self.nodes.read().await;
            for edge in edges {
                if !nodes.contains_key(&edge.source) {
                    return Err(IndexError::NodeNotFound(edge.source.clone()));
                }
                if !nodes.contains_key(&edge.target) {
                    return Err(IndexError::NodeNotFound(edge.target.clone()));
                }
            }
        }

        let mut edge_guard = self.edges.write().await;
        let mut out_guard = self.out_index.write().await;
        let mut in_guard = self.in_index.write().await;
        for edge in edges {
            if let Some(old) = edge_guard.insert(edge.id.clone(), edge.clone()) {
                Self::remove_edge_from_index(&mut out_guard, &old.source, &old.id);
                Self::remove_edge_from_index(&mut in_guard, &old.target, &old.id);
            }
            Self::add_edge_to_index(&mut out_guard, &edge.source, &edge.id);
            Self::add_edge_to_index(&mut in_guard, &edge.target, &edge.id);
        }
        Ok(())
    }

    pub async fn node_count(&self) -> usize {
        self.nodes.read().await.len()
    }

    pub async fn edge_count(&self) -> usize {
        self.edges.read().await.len()
    }

    /// Every edge, ordered by id.
    pub async fn all_edges(&self) -> Vec<GraphEdge> {
        let guard = self.edges.read().await;
        let mut edges: Vec<GraphEdge> = guard.values().cloned().collect();
        edges.sort_by(|a, b| a.id.cmp(&b.id));
        edges
    }

    async fn edges_from_index(
        &self,
        index: &RwLock<EdgeIndex>,
        node_id: &str,
    ) -> Result<Vec<GraphEdge>, IndexError> {
        if !self.nodes.read().await.contains_key(node_id) {
            return Err(IndexError::NodeNotFound(node_id.to_string()));
        }
        let edge_ids = index.read().await.get(node_id).cloned().unwrap_or_default();
        let edge_guard = self.edges.read().await;
        let mut edges: Vec<GraphEdge> = edge_ids
            .iter()
            .filter_map(|id| edge_guard.get(id).cloned())
            .collect();
        // Keep traversal deterministic across runtimes and hash-map ordering.
        edges.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(edges)
    }
}

impl Default for InMemoryGraphIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SimilarityIndex for InMemoryGraphIndex {
    async fn get_node(&self, id: &str) -> Result<Option<GraphNode>, IndexError> {
        Ok(self.nodes.read().await.get(id).cloned())
    }

    async fn find_similar(&self, vector: &[f32], k: usize) -> Result<Vec<GraphNode>, IndexError> {
        if k == 0 || vector.is_empty() {
            return Ok(Vec::new());
        }
        let guard = self.nodes.read().await;
        let mut candidates: Vec<(&GraphNode, f64)> = guard
            .values()
            .filter(|n| n.embedding.len() == vector.len())
            .map(|n| (n, cosine_similarity(vector, &n.embedding)))
            .collect();
        candidates.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.id.cmp(&b.0.id))
        });
        Ok(candidates
            .into_iter()
            .take(k)
            .map(|(n, _)| n.clone())
            .collect())
    }

    async fn get_outgoing_edges(&self, node_id: &str) -> Result<Vec<GraphEdge>, IndexError> {
        self.edges_from_index(&self.out_index, node_id).await
    }

    async fn get_incoming_edges(&self, node_id: &str) -> Result<Vec<GraphEdge>, IndexError> {
        self.edges_from_index(&self.in_index, node_id).await
    }

    async fn get_all_nodes(&self) -> Result<Vec<GraphNode>, IndexError> {
        let guard = self.nodes.read().await;
        let mut nodes: Vec<GraphNode> = guard.values().cloned().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(nodes)
    }

    async fn is_empty(&self) -> Result<bool, IndexError> {
        Ok(self.nodes.read().await.is_empty())
    }
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();
    let na: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let nb: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na * nb)
}

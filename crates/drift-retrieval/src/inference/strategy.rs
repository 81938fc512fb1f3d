//! Pairwise overlap measures used to propose missing connections.

use super::InferenceError;
use crate::text::{significant_terms, QueryTerms};
use async_trait::async_trait;
use drift_types::{GraphNode, InferenceStrategy, InferredConnection, SimilarityIndex};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// One way of judging whether two nodes should be connected.
///
/// Implementations return every pair with overlap above zero, `source` being the node that
/// appears first in `nodes`. Thresholding and capping happen in the engine.
#[async_trait]
pub trait ConnectionStrategy: Send + Sync {
    fn kind(&self) -> InferenceStrategy;

    async fn propose(
        &self,
        nodes: &[GraphNode],
        query: &QueryTerms,
    ) -> Result<Vec<InferredConnection>, InferenceError>;
}

fn connection(
    source: &GraphNode,
    target: &GraphNode,
    confidence: f64,
    reasoning: String,
    inferred_type: &str,
) -> InferredConnection {
    InferredConnection {
        source_node: source.id.clone(),
        target_node: target.id.clone(),
        reasoning,
        confidence: confidence.clamp(0.0, 1.0),
        inferred_type: inferred_type.to_string(),
    }
}

fn sorted_preview(terms: &HashSet<&String>, limit: usize) -> String {
    let mut v: Vec<&str> = terms.iter().map(|s| s.as_str()).collect();
    v.sort_unstable();
    v.truncate(limit);
    v.join(", ")
}

/// Shared significant terms in node content, scored by the overlap coefficient with a
/// small bonus when the shared terms come from the query.
#[derive(Debug, Default)]
pub struct LexicalOverlap;

const OVERLAP_WEIGHT: f64 = 0.8;
const QUERY_BONUS_WEIGHT: f64 = 0.2;

#[async_trait]
impl ConnectionStrategy for LexicalOverlap {
    fn kind(&self) -> InferenceStrategy {
        InferenceStrategy::Semantic
    }

    async fn propose(
        &self,
        nodes: &[GraphNode],
        query: &QueryTerms,
    ) -> Result<Vec<InferredConnection>, InferenceError> {
        let query_terms: HashSet<&str> = query.iter().collect();
        let term_sets: Vec<HashSet<String>> =
            nodes.iter().map(|n| significant_terms(&n.content)).collect();

        let mut out = Vec::new();
        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                let (a, b) = (&term_sets[i], &term_sets[j]);
                let shared: HashSet<&String> = a.intersection(b).collect();
                if shared.is_empty() {
                    continue;
                }
                let overlap = shared.len() as f64 / a.len().min(b.len()) as f64;
                let from_query = shared
                    .iter()
                    .filter(|t| query_terms.contains(t.as_str()))
                    .count() as f64
                    / shared.len() as f64;
                let confidence = OVERLAP_WEIGHT * overlap + QUERY_BONUS_WEIGHT * from_query;
                out.push(connection(
                    &nodes[i],
                    &nodes[j],
                    confidence,
                    format!("both mention {}", sorted_preview(&shared, 5)),
                    "semantically_related",
                ));
            }
        }
        Ok(out)
    }
}

/// Cosine similarity of node embeddings. Nodes without an embedding, or with one of a
/// different dimension, are never paired.
#[derive(Debug, Default)]
pub struct EmbeddingSimilarity;

fn cosine(a: &[f32], b: &[f32]) -> f64 {
    let (mut dot, mut na, mut nb) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

#[async_trait]
impl ConnectionStrategy for EmbeddingSimilarity {
    fn kind(&self) -> InferenceStrategy {
        InferenceStrategy::Similarity
    }

    async fn propose(
        &self,
        nodes: &[GraphNode],
        _query: &QueryTerms,
    ) -> Result<Vec<InferredConnection>, InferenceError> {
        let mut out = Vec::new();
        for i in 0..nodes.len() {
            let a = &nodes[i].embedding;
            if a.is_empty() {
                continue;
            }
            for j in (i + 1)..nodes.len() {
                let b = &nodes[j].embedding;
                if b.len() != a.len() {
                    continue;
                }
                let sim = cosine(a, b);
                if sim.is_nan() || sim <= 0.0 {
                    continue;
                }
                out.push(connection(
                    &nodes[i],
                    &nodes[j],
                    sim,
                    format!("embedding cosine similarity {:.2}", sim),
                    "similar_to",
                ));
            }
        }
        Ok(out)
    }
}

/// Common-neighbour link prediction: Jaccard index of the two nodes' neighbour sets,
/// read from the similarity index in both edge directions.
pub struct SharedNeighbors {
    index: Arc<dyn SimilarityIndex>,
}

impl SharedNeighbors {
    pub fn new(index: Arc<dyn SimilarityIndex>) -> Self {
        Self { index }
    }

    async fn neighbors(&self, node_id: &str) -> Result<HashSet<String>, InferenceError> {
        let mut set = HashSet::new();
        for edge in self.index.get_outgoing_edges(node_id).await? {
            set.insert(edge.target);
        }
        for edge in self.index.get_incoming_edges(node_id).await? {
            set.insert(edge.source);
        }
        set.remove(node_id);
        Ok(set)
    }
}

#[async_trait]
impl ConnectionStrategy for SharedNeighbors {
    fn kind(&self) -> InferenceStrategy {
        InferenceStrategy::Structural
    }

    async fn propose(
        &self,
        nodes: &[GraphNode],
        _query: &QueryTerms,
    ) -> Result<Vec<InferredConnection>, InferenceError> {
        let mut neighbors: HashMap<&str, HashSet<String>> = HashMap::with_capacity(nodes.len());
        for node in nodes {
            neighbors.insert(node.id.as_str(), self.neighbors(&node.id).await?);
        }

        let empty = HashSet::new();
        let mut out = Vec::new();
        for i in 0..nodes.len() {
            let a = neighbors.get(nodes[i].id.as_str()).unwrap_or(&empty);
            for j in (i + 1)..nodes.len() {
                let b = neighbors.get(nodes[j].id.as_str()).unwrap_or(&empty);
                let shared: HashSet<&String> = a.intersection(b).collect();
                if shared.is_empty() {
                    continue;
                }
                let union = a.union(b).count();
                let jaccard = shared.len() as f64 / union as f64;
                out.push(connection(
                    &nodes[i],
                    &nodes[j],
                    jaccard,
                    format!(
                        "{} shared neighbour(s): {}",
                        shared.len(),
                        sorted_preview(&shared, 5)
                    ),
                    "shares_neighbors",
                ));
            }
        }
        Ok(out)
    }
}

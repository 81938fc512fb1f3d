//! Path scoring, deduplication, inference boosting, and top-K selection.

use crate::text::QueryTerms;
use drift_types::{GraphEdge, GraphNode, InferredConnection, TraversalPath};
use std::collections::HashMap;
use tracing::{debug, warn};

const RELEVANCE_WEIGHT: f64 = 0.5;
const EDGE_WEIGHT_WEIGHT: f64 = 0.3;
const LENGTH_WEIGHT: f64 = 0.2;
/// Edge-weight term for a path with no edges.
const NO_EDGE_WEIGHT: f64 = 0.5;
/// Per-node factor in the length penalty `1 / (1 + n * LENGTH_DECAY)`.
const LENGTH_DECAY: f64 = 0.1;
/// Score added per unit of inference confidence.
pub const BOOST_FACTOR: f64 = 0.1;

/// `0.5 * relevance + 0.3 * mean edge weight + 0.2 * length penalty`, clamped to [0, 1].
///
/// Relevance is the mean, over nodes, of the fraction of distinct query terms present in
/// the node content. Shorter paths score higher when everything else is equal.
pub fn calculate_path_score(nodes: &[GraphNode], edges: &[GraphEdge], query: &QueryTerms) -> f64 {
    if nodes.is_empty() {
        return 0.0;
    }
    let relevance =
        nodes.iter().map(|n| query.coverage(&n.content)).sum::<f64>() / nodes.len() as f64;
    let edge_weight = if edges.is_empty() {
        NO_EDGE_WEIGHT
    } else {
        edges.iter().map(GraphEdge::effective_weight).sum::<f64>() / edges.len() as f64
    };
    let length_penalty = 1.0 / (1.0 + nodes.len() as f64 * LENGTH_DECAY);

    let score = RELEVANCE_WEIGHT * relevance
        + EDGE_WEIGHT_WEIGHT * edge_weight
        + LENGTH_WEIGHT * length_penalty;
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Collapse paths with identical node-id sequences, keeping the higher score.
/// Surviving paths keep the order in which their sequence was first seen.
pub fn deduplicate_paths(paths: Vec<TraversalPath>) -> Vec<TraversalPath> {
    let mut slot_by_key: HashMap<Vec<String>, usize> = HashMap::with_capacity(paths.len());
    let mut out: Vec<TraversalPath> = Vec::with_capacity(paths.len());
    for path in paths {
        let key: Vec<String> = path.node_ids().map(str::to_string).collect();
        match slot_by_key.get(&key) {
            Some(&slot) => {
                if path.score() > out[slot].score() {
                    out[slot] = path;
                }
            }
            None => {
                slot_by_key.insert(key, out.len());
                out.push(path);
            }
        }
    }
    out
}

/// Why an inferred connection was refused.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidInference {
    #[error("self-loop on {0}")]
    SelfLoop(String),
    #[error("confidence {0} outside [0, 1]")]
    Confidence(f64),
    #[error("empty reasoning")]
    EmptyReasoning,
    #[error("empty inferred type")]
    EmptyType,
}

/// Check an inferred connection before it may influence scores.
pub fn validate_inference(conn: &InferredConnection) -> Result<(), InvalidInference> {
    if conn.source_node == conn.target_node {
        return Err(InvalidInference::SelfLoop(conn.source_node.clone()));
    }
    if !(0.0..=1.0).contains(&conn.confidence) {
        return Err(InvalidInference::Confidence(conn.confidence));
    }
    if conn.reasoning.trim().is_empty() {
        return Err(InvalidInference::EmptyReasoning);
    }
    if conn.inferred_type.trim().is_empty() {
        return Err(InvalidInference::EmptyType);
    }
    Ok(())
}

/// Split `connections` into the valid ones and a count of dropped ones.
pub fn retain_valid_inferences(
    connections: Vec<InferredConnection>,
) -> (Vec<InferredConnection>, usize) {
    let total = connections.len();
    let valid: Vec<InferredConnection> = connections
        .into_iter()
        .filter(|c| match validate_inference(c) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    source = %c.source_node,
                    target = %c.target_node,
                    reason = %e,
                    "dropping invalid inferred connection"
                );
                false
            }
        })
        .collect();
    let dropped = total - valid.len();
    (valid, dropped)
}

/// Add `confidence * BOOST_FACTOR` to every path containing the connection's
/// (source, target) as consecutive nodes. Invalid connections are skipped.
pub fn boost_with_inferences(paths: &mut [TraversalPath], connections: &[InferredConnection]) {
    for conn in connections {
        if validate_inference(conn).is_err() {
            continue;
        }
        for path in paths.iter_mut() {
            if path.has_consecutive_pair(&conn.source_node, &conn.target_node) {
                path.boost(conn.confidence * BOOST_FACTOR);
            }
        }
    }
}

/// Drop paths under `min_score`, sort best first, keep `top_k`.
pub fn select_top_paths(
    mut paths: Vec<TraversalPath>,
    min_score: f64,
    top_k: usize,
) -> Vec<TraversalPath> {
    paths.retain(|p| p.score() >= min_score);
    paths.sort_by(|a, b| {
        b.score()
            .partial_cmp(&a.score())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    paths.truncate(top_k);
    paths
}

/// Result of [`aggregate_paths`].
#[derive(Debug, Clone)]
pub struct Aggregated {
    pub paths: Vec<TraversalPath>,
    /// Paths left after deduplication, before threshold and top-K.
    pub unique_paths: usize,
    pub dropped_inferences: usize,
}

/// Deduplicate, boost with valid inferences, then select.
pub fn aggregate_paths(
    paths: Vec<TraversalPath>,
    inferences: Vec<InferredConnection>,
    min_score: f64,
    top_k: usize,
) -> Aggregated {
    let raw = paths.len();
    let mut unique = deduplicate_paths(paths);
    let unique_paths = unique.len();
    let (valid, dropped_inferences) = retain_valid_inferences(inferences);
    boost_with_inferences(&mut unique, &valid);
    let selected = select_top_paths(unique, min_score, top_k);
    debug!(
        raw,
        unique = unique_paths,
        selected = selected.len(),
        dropped_inferences,
        "paths aggregated"
    );
    Aggregated {
        paths: selected,
        unique_paths,
        dropped_inferences,
    }
}

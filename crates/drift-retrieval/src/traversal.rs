//! Breadth-first, depth-bounded path exploration from seed nodes.

use crate::ranking::calculate_path_score;
use crate::text::QueryTerms;
use drift_types::{
    GraphEdge, GraphNode, IndexError, SimilarityIndex, TraversalDirection, TraversalPath,
};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Predicate deciding whether a discovered node may join a path.
pub type NodeFilter = Arc<dyn Fn(&GraphNode) -> bool + Send + Sync>;

/// Optional restrictions applied while expanding the frontier.
#[derive(Clone, Default)]
pub struct TraversalFilters {
    pub node_filter: Option<NodeFilter>,
    /// Allow-list of edge types; `None` follows every type.
    pub edge_types: Option<HashSet<String>>,
}

impl TraversalFilters {
    pub fn with_node_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&GraphNode) -> bool + Send + Sync + 'static,
    {
        self.node_filter = Some(Arc::new(filter));
        self
    }

    pub fn with_edge_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.edge_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    fn allows_edge(&self, edge: &GraphEdge) -> bool {
        self.edge_types
            .as_ref()
            .map_or(true, |allowed| allowed.contains(&edge.edge_type))
    }

    fn allows_node(&self, node: &GraphNode) -> bool {
        self.node_filter.as_ref().map_or(true, |f| f(node))
    }
}

impl fmt::Debug for TraversalFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraversalFilters")
            .field("node_filter", &self.node_filter.is_some())
            .field("edge_types", &self.edge_types)
            .finish()
    }
}

struct PathState {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    depth: usize,
}

impl PathState {
    fn current(&self) -> &GraphNode {
        // Never empty: every state starts from the seed node.
        &self.nodes[self.nodes.len() - 1]
    }

    fn contains(&self, node_id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == node_id)
    }
}

pub struct TraversalEngine {
    index: Arc<dyn SimilarityIndex>,
}

impl TraversalEngine {
    pub fn new(index: Arc<dyn SimilarityIndex>) -> Self {
        Self { index }
    }

    /// Every path of two or more nodes reachable from `start` within `max_depth` hops,
    /// each scored against `query`.
    pub async fn traverse(
        &self,
        start: &GraphNode,
        query: &str,
        max_depth: usize,
        direction: TraversalDirection,
        filters: &TraversalFilters,
    ) -> Result<Vec<TraversalPath>, IndexError> {
        let terms = QueryTerms::new(query);
        self.traverse_with_terms(start, &terms, max_depth, direction, filters)
            .await
    }

    pub(crate) async fn traverse_with_terms(
        &self,
        start: &GraphNode,
        query: &QueryTerms,
        max_depth: usize,
        direction: TraversalDirection,
        filters: &TraversalFilters,
    ) -> Result<Vec<TraversalPath>, IndexError> {
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(start.id.clone());

        let mut queue: VecDeque<PathState> = VecDeque::new();
        queue.push_back(PathState {
            nodes: vec![start.clone()],
            edges: Vec::new(),
            depth: 0,
        });

        let mut paths = Vec::new();
        while let Some(state) = queue.pop_front() {
            if state.nodes.len() > 1 {
                let score = calculate_path_score(&state.nodes, &state.edges, query);
                match TraversalPath::new(state.nodes.clone(), state.edges.clone(), score) {
                    Ok(path) => paths.push(path),
                    Err(e) => warn!(error = %e, "discarding malformed traversal path"),
                }
            }
            if state.depth >= max_depth {
                continue;
            }

            let current_id = state.current().id.clone();
            for edge in self.candidate_edges(&current_id, direction).await? {
                if !filters.allows_edge(&edge) {
                    continue;
                }
                let Some(neighbor_id) = edge.other_endpoint(&current_id) else {
                    continue;
                };
                if state.contains(neighbor_id) || visited.contains(neighbor_id) {
                    continue;
                }
                let Some(neighbor) = self.index.get_node(neighbor_id).await? else {
                    continue;
                };
                if !filters.allows_node(&neighbor) {
                    continue;
                }
                visited.insert(neighbor.id.clone());

                let mut nodes = state.nodes.clone();
                nodes.push(neighbor);
                let mut edges = state.edges.clone();
                edges.push(edge);
                queue.push_back(PathState {
                    nodes,
                    edges,
                    depth: state.depth + 1,
                });
            }
        }

        debug!(start = %start.id, max_depth, %direction, paths = paths.len(), "traversal done");
        Ok(paths)
    }

    /// Traverse from every seed independently and concatenate the results.
    /// Overlap between seeds is left for deduplication.
    pub async fn traverse_from_entry_points(
        &self,
        entry_points: &[GraphNode],
        query: &str,
        max_depth: usize,
        direction: TraversalDirection,
        filters: &TraversalFilters,
    ) -> Result<Vec<TraversalPath>, IndexError> {
        let terms = QueryTerms::new(query);
        let mut all = Vec::new();
        for seed in entry_points {
            let paths = self
                .traverse_with_terms(seed, &terms, max_depth, direction, filters)
                .await?;
            all.extend(paths);
        }
        Ok(all)
    }

    async fn candidate_edges(
        &self,
        node_id: &str,
        direction: TraversalDirection,
    ) -> Result<Vec<GraphEdge>, IndexError> {
        let mut edges = Vec::new();
        if direction.follows_outgoing() {
            edges.extend(self.index.get_outgoing_edges(node_id).await?);
        }
        if direction.follows_incoming() {
            let seen: HashSet<String> = edges.iter().map(|e| e.id.clone()).collect();
            edges.extend(
                self.index
                    .get_incoming_edges(node_id)
                    .await?
                    .into_iter()
                    .filter(|e| !seen.contains(&e.id)),
            );
        }
        Ok(edges)
    }
}

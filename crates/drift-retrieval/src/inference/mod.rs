//! Inference of connections missing from the graph, plus knowledge-gap reporting.
//!
//! Inference is advisory: it only boosts scores of existing paths and never writes to the
//! graph. Any failure inside this module degrades to "no inferences" with a warning.

mod cache;
mod gaps;
mod strategy;

pub use cache::CacheStats;
pub use gaps::{identify_knowledge_gaps, NO_PATHS_GAP};
pub use strategy::{ConnectionStrategy, EmbeddingSimilarity, LexicalOverlap, SharedNeighbors};

use crate::text::QueryTerms;
use cache::InferenceCache;
use drift_types::{
    DriftConfig, GraphNode, IndexError, InferenceStrategy, InferredConnection, SimilarityIndex,
    TraversalPath,
};
use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Pairwise inference is quadratic; larger node sets are cut to their first nodes.
const MAX_INFERENCE_NODES: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("no strategy registered for {0}")]
    UnknownStrategy(InferenceStrategy),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("{0}")]
    Other(String),
}

/// Per-call inference settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceOptions {
    pub strategy: InferenceStrategy,
    pub confidence_threshold: f64,
    pub max_inferences: usize,
    pub use_cache: bool,
}

impl InferenceOptions {
    pub fn from_config(config: &DriftConfig) -> Self {
        Self {
            strategy: config.inference_strategy,
            confidence_threshold: config.inference_confidence_threshold,
            max_inferences: config.max_inferences,
            use_cache: config.inference_cache_enabled,
        }
    }
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self::from_config(&DriftConfig::default())
    }
}

/// Distinct nodes of `paths` in first-appearance order.
pub fn nodes_from_paths(paths: &[TraversalPath]) -> Vec<GraphNode> {
    let mut seen = HashSet::new();
    paths
        .iter()
        .flat_map(|p| p.nodes())
        .filter(|n| seen.insert(n.id.clone()))
        .cloned()
        .collect()
}

pub struct InferenceEngine {
    strategies: HashMap<InferenceStrategy, Arc<dyn ConnectionStrategy>>,
    cache: InferenceCache,
}

impl InferenceEngine {
    /// Engine with the three built-in strategies and a cache of `cache_size` entries
    /// (at least one).
    pub fn new(index: Arc<dyn SimilarityIndex>, cache_size: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            strategies: HashMap::new(),
            cache: InferenceCache::new(capacity),
        }
        .with_strategy(Arc::new(LexicalOverlap))
        .with_strategy(Arc::new(EmbeddingSimilarity))
        .with_strategy(Arc::new(SharedNeighbors::new(index)))
    }

    /// Register `strategy`, replacing any existing one of the same kind.
    pub fn with_strategy(mut self, strategy: Arc<dyn ConnectionStrategy>) -> Self {
        self.strategies.insert(strategy.kind(), strategy);
        self
    }

    /// Propose connections between `nodes`, best first, at or above the confidence
    /// threshold and at most `max_inferences` of them. Errors yield an empty list.
    pub async fn infer_missing_connections(
        &self,
        nodes: &[GraphNode],
        query: &str,
        options: &InferenceOptions,
    ) -> Vec<InferredConnection> {
        match self.try_infer(nodes, query, options).await {
            Ok(found) => found,
            Err(e) => {
                warn!(strategy = %options.strategy, error = %e, "inference failed, continuing without");
                Vec::new()
            }
        }
    }

    async fn try_infer(
        &self,
        nodes: &[GraphNode],
        query: &str,
        options: &InferenceOptions,
    ) -> Result<Vec<InferredConnection>, InferenceError> {
        if nodes.len() < 2 || options.max_inferences == 0 {
            return Ok(Vec::new());
        }
        let nodes = &nodes[..nodes.len().min(MAX_INFERENCE_NODES)];

        let key = options
            .use_cache
            .then(|| InferenceCache::key(options.strategy, nodes, query));
        let cached = key.as_deref().and_then(|k| self.cache.get(k));
        let candidates = match cached {
            Some(hit) => hit,
            None => {
                let strategy = self
                    .strategies
                    .get(&options.strategy)
                    .ok_or(InferenceError::UnknownStrategy(options.strategy))?;
                let mut proposed = strategy.propose(nodes, &QueryTerms::new(query)).await?;
                proposed.retain(|c| c.confidence > 0.0);
                proposed.sort_by(|a, b| {
                    b.confidence
                        .partial_cmp(&a.confidence)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                if let Some(k) = key {
                    self.cache.put(k, proposed.clone());
                }
                proposed
            }
        };

        let found: Vec<InferredConnection> = candidates
            .into_iter()
            .filter(|c| c.confidence >= options.confidence_threshold)
            .take(options.max_inferences)
            .collect();
        debug!(
            strategy = %options.strategy,
            nodes = nodes.len(),
            inferred = found.len(),
            "connections inferred"
        );
        Ok(found)
    }

    pub fn identify_knowledge_gaps(&self, paths: &[TraversalPath], query: &str) -> Vec<String> {
        identify_knowledge_gaps(paths, query)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Change cache capacity; shrinking evicts the oldest entries.
    pub fn resize_cache(&self, cache_size: usize) {
        self.cache
            .resize(NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN));
    }
}

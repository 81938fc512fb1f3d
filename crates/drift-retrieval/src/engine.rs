//! DriftRetriever: wires entry points, traversal, inference, ranking and synthesis.

use crate::inference::{nodes_from_paths, CacheStats, InferenceEngine, InferenceOptions};
use crate::ranking::{aggregate_paths, retain_valid_inferences};
use crate::traversal::{TraversalEngine, TraversalFilters};
use crate::{DriftError, EntryPointDetector, ResponseSynthesizer};
use drift_embed::LLMClient;
use drift_types::{
    ConfigError, ConfigUpdate, DriftConfig, Embedder, GraphNode, InferredConnection,
    SimilarityIndex, TraversalPath,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Per-query overrides on top of the engine configuration.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// `None` uses the configured default.
    pub include_provenance: Option<bool>,
    pub filters: TraversalFilters,
}

impl QueryOptions {
    pub fn with_provenance(mut self, include: bool) -> Self {
        self.include_provenance = Some(include);
        self
    }

    pub fn with_node_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&GraphNode) -> bool + Send + Sync + 'static,
    {
        self.filters = self.filters.with_node_filter(filter);
        self
    }

    pub fn with_edge_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters = self.filters.with_edge_types(types);
        self
    }
}

/// Stage timings (microseconds) and counts for one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryMetrics {
    pub entry_point_us: u64,
    pub traversal_us: u64,
    pub inference_us: u64,
    pub ranking_us: u64,
    pub synthesis_us: u64,
    pub total_us: u64,
    pub entry_points: usize,
    pub raw_paths: usize,
    pub unique_paths: usize,
    pub selected_paths: usize,
    pub inferred_connections: usize,
    pub dropped_inferences: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DriftResponse {
    pub answer: String,
    /// Ranked paths handed to synthesis, best first.
    pub paths: Vec<TraversalPath>,
    pub entry_points: Vec<GraphNode>,
    pub inferred_connections: Vec<InferredConnection>,
    pub knowledge_gaps: Vec<String>,
    pub metrics: QueryMetrics,
}

fn micros(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_micros()).unwrap_or(u64::MAX)
}

pub struct DriftRetriever {
    index: Arc<dyn SimilarityIndex>,
    config: RwLock<DriftConfig>,
    entry_points: EntryPointDetector,
    traversal: TraversalEngine,
    inference: InferenceEngine,
    synthesizer: ResponseSynthesizer,
}

impl DriftRetriever {
    /// Build a retriever without an LLM; answers come from the built-in template.
    pub fn new(
        index: Arc<dyn SimilarityIndex>,
        embedder: Arc<dyn Embedder>,
        config: DriftConfig,
    ) -> Result<Self, ConfigError> {
        let config = config.validated()?;
        Ok(Self {
            entry_points: EntryPointDetector::new(index.clone(), embedder),
            traversal: TraversalEngine::new(index.clone()),
            inference: InferenceEngine::new(index.clone(), config.inference_cache_size),
            synthesizer: ResponseSynthesizer::new(None),
            config: RwLock::new(config),
            index,
        })
    }

    pub fn with_llm(mut self, llm: Arc<dyn LLMClient>) -> Self {
        self.synthesizer = ResponseSynthesizer::new(Some(llm));
        self
    }

    /// Replace the inference engine, e.g. one with extra strategies registered.
    /// Its cache is resized to the configured `inference_cache_size`.
    pub fn with_inference_engine(mut self, engine: InferenceEngine) -> Self {
        engine.resize_cache(self.config.get_mut().inference_cache_size);
        self.inference = engine;
        self
    }

    pub async fn config(&self) -> DriftConfig {
        self.config.read().await.clone()
    }

    /// Apply a partial update. On error the running configuration is unchanged.
    pub async fn update_config(&self, update: &ConfigUpdate) -> Result<DriftConfig, ConfigError> {
        let mut guard = self.config.write().await;
        let next = guard.apply(update)?;
        if next.inference_cache_size != guard.inference_cache_size {
            self.inference.resize_cache(next.inference_cache_size);
        }
        *guard = next.clone();
        info!(config = ?next, "configuration updated");
        Ok(next)
    }

    /// Answer `query`; see [`DriftRetriever::query_detailed`] for the full result.
    pub async fn query(&self, query: &str) -> Result<String, DriftError> {
        Ok(self
            .query_detailed(query, &QueryOptions::default())
            .await?
            .answer)
    }

    pub async fn query_detailed(
        &self,
        query: &str,
        options: &QueryOptions,
    ) -> Result<DriftResponse, DriftError> {
        let started = Instant::now();
        if query.trim().is_empty() {
            return Err(DriftError::EmptyQuery);
        }
        // Snapshot so a concurrent update never changes settings mid-query.
        let config = self.config().await;
        let mut metrics = QueryMetrics::default();

        if self.index.is_empty().await? {
            return Err(DriftError::EmptyCorpus);
        }

        let stage = Instant::now();
        let seeds = self
            .entry_points
            .find_entry_points(query, config.entry_point_count)
            .await?;
        metrics.entry_point_us = micros(stage);
        metrics.entry_points = seeds.len();
        if seeds.is_empty() {
            return Err(DriftError::NoEntryPoints(query.to_string()));
        }

        let stage = Instant::now();
        let raw = self
            .traversal
            .traverse_from_entry_points(
                &seeds,
                query,
                config.max_depth,
                config.direction,
                &options.filters,
            )
            .await?;
        metrics.traversal_us = micros(stage);
        metrics.raw_paths = raw.len();

        let stage = Instant::now();
        let inferred = if config.enable_inference {
            let nodes = nodes_from_paths(&raw);
            self.inference
                .infer_missing_connections(&nodes, query, &InferenceOptions::from_config(&config))
                .await
        } else {
            Vec::new()
        };
        let (inferred, dropped) = retain_valid_inferences(inferred);
        metrics.inference_us = micros(stage);
        metrics.inferred_connections = inferred.len();
        metrics.dropped_inferences = dropped;

        let stage = Instant::now();
        let aggregated = aggregate_paths(
            raw,
            inferred.clone(),
            config.min_path_score,
            config.top_k_paths,
        );
        let paths = aggregated.paths;
        let knowledge_gaps = self.inference.identify_knowledge_gaps(&paths, query);
        metrics.ranking_us = micros(stage);
        metrics.unique_paths = aggregated.unique_paths;
        metrics.selected_paths = paths.len();

        let stage = Instant::now();
        let include_provenance = options
            .include_provenance
            .unwrap_or(config.include_provenance);
        let answer = self
            .synthesizer
            .generate_response(query, &paths, include_provenance)
            .await?;
        metrics.synthesis_us = micros(stage);
        metrics.total_us = micros(started);

        let seed_ids: Vec<&str> = seeds.iter().map(|n| n.id.as_str()).collect();
        debug!(seeds = ?seed_ids, gaps = knowledge_gaps.len(), "query stages complete");
        info!(
            entry_points = metrics.entry_points,
            raw_paths = metrics.raw_paths,
            unique_paths = metrics.unique_paths,
            selected_paths = metrics.selected_paths,
            inferred = metrics.inferred_connections,
            llm = self.synthesizer.has_llm(),
            total_us = metrics.total_us,
            "drift query answered"
        );

        Ok(DriftResponse {
            answer,
            paths,
            entry_points: seeds,
            inferred_connections: inferred,
            knowledge_gaps,
            metrics,
        })
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inference.cache_stats()
    }

    pub fn clear_inference_cache(&self) {
        self.inference.clear_cache();
    }
}

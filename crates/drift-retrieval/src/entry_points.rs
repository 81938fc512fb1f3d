//! Seed selection: embed the query, take its nearest nodes.

use crate::DriftError;
use drift_types::{Embedder, GraphNode, SimilarityIndex};
use std::sync::Arc;
use tracing::debug;

pub struct EntryPointDetector {
    index: Arc<dyn SimilarityIndex>,
    embedder: Arc<dyn Embedder>,
}

impl EntryPointDetector {
    pub fn new(index: Arc<dyn SimilarityIndex>, embedder: Arc<dyn Embedder>) -> Self {
        Self { index, embedder }
    }

    /// Up to `count` nodes nearest to the query embedding.
    ///
    /// A short or empty result is not an error here; the caller decides what an empty
    /// seed list means.
    pub async fn find_entry_points(
        &self,
        query: &str,
        count: usize,
    ) -> Result<Vec<GraphNode>, DriftError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let vector = self.embedder.embed(query).await?;
        let mut nodes = self.index.find_similar(&vector, count).await?;
        // Never more than `count`, whatever the index returns.
        nodes.truncate(count);
        debug!(requested = count, found = nodes.len(), "entry points selected");
        Ok(nodes)
    }
}

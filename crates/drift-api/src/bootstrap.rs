//! Graph loading at startup.

use drift_embed::Embedder;
use drift_graph::{GraphSnapshot, InMemoryGraphIndex};
use std::path::Path;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Load a JSON graph snapshot, embedding every node that arrives without a vector.
pub async fn load_graph(
    path: impl AsRef<Path>,
    embedder: &dyn Embedder,
) -> Result<InMemoryGraphIndex, BoxError> {
    let mut snapshot = GraphSnapshot::read_json(path.as_ref()).await?;
    let pending: Vec<&mut drift_types::GraphNode> = snapshot.unembedded_nodes_mut().collect();
    if !pending.is_empty() {
        let texts: Vec<String> = pending.iter().map(|n| n.content.clone()).collect();
        let vectors = embedder.embed_batch(&texts).await?;
        if vectors.len() != pending.len() {
            return Err(format!(
                "embedder returned {} vectors for {} nodes",
                vectors.len(),
                pending.len()
            )
            .into());
        }
        tracing::info!(count = pending.len(), "embedded snapshot nodes");
        for (node, vector) in pending.into_iter().zip(vectors) {
            node.embedding = vector;
        }
    }
    let index = InMemoryGraphIndex::from_snapshot(snapshot).await?;
    tracing::info!(
        nodes = index.node_count().await,
        edges = index.edge_count().await,
        path = %path.as_ref().display(),
        "graph loaded"
    );
    Ok(index)
}

//! Traits for the collaborators the retrieval engine depends on.

use crate::{GraphEdge, GraphNode};
use async_trait::async_trait;

/// Graph storage plus nearest-neighbour lookup over node embeddings.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Get one node by id.
    async fn get_node(&self, id: &str) -> Result<Option<GraphNode>, IndexError>;

    /// Up to `k` nodes nearest to `vector`, best match first.
    async fn find_similar(&self, vector: &[f32], k: usize) -> Result<Vec<GraphNode>, IndexError>;

    /// Edges whose source is `node_id`.
    async fn get_outgoing_edges(&self, node_id: &str) -> Result<Vec<GraphEdge>, IndexError>;

    /// Edges whose target is `node_id`.
    async fn get_incoming_edges(&self, node_id: &str) -> Result<Vec<GraphEdge>, IndexError>;

    /// Every node in the graph.
    async fn get_all_nodes(&self) -> Result<Vec<GraphNode>, IndexError>;

    /// True when the graph holds no nodes. Default implementation uses get_all_nodes.
    async fn is_empty(&self) -> Result<bool, IndexError> {
        Ok(self.get_all_nodes().await?.is_empty())
    }
}

/// Embedder: text -> vector(s).
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text. Default implementation uses embed_batch.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let v = self.embed_batch(&[text.to_string()]).await?;
        v.into_iter().next().ok_or(EmbedderError::EmptyResponse)
    }

    /// Embed multiple texts.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("node not found: {0}")]
    NodeNotFound(String),
    #[error("similarity index error: {0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum EmbedderError {
    #[error("embedder error: {0}")]
    Other(String),
    #[error("empty response")]
    EmptyResponse,
}

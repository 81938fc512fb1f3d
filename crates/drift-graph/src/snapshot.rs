//! JSON snapshots of an [`InMemoryGraphIndex`].

use crate::InMemoryGraphIndex;
use drift_types::{GraphEdge, GraphNode, IndexError, SimilarityIndex};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serializable graph contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

impl GraphSnapshot {
    /// Nodes whose embedding has not been computed yet.
    pub fn unembedded_nodes_mut(&mut self) -> impl Iterator<Item = &mut GraphNode> {
        self.nodes.iter_mut().filter(|n| n.embedding.is_empty())
    }

    pub async fn read_json(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| IndexError::Other(format!("read {}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| IndexError::Other(format!("parse {}: {}", path.display(), e)))
    }

    pub async fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IndexError> {
        let path = path.as_ref();
        let body =
            serde_json::to_string_pretty(self).map_err(|e| IndexError::Other(e.to_string()))?;
        tokio::fs::write(path, body)
            .await
            .map_err(|e| IndexError::Other(format!("write {}: {}", path.display(), e)))
    }
}

impl InMemoryGraphIndex {
    /// Build an index from a snapshot. Edges must reference nodes present in the snapshot.
    pub async fn from_snapshot(snapshot: GraphSnapshot) -> Result<Self, IndexError> {
        let index = Self::new();
        index.add_nodes_batch(snapshot.nodes).await;
        index.add_edges_batch(&snapshot.edges).await?;
        Ok(index)
    }

    /// Nodes and edges, each ordered by id.
    pub async fn snapshot(&self) -> GraphSnapshot {
        let nodes = self.get_all_nodes().await.unwrap_or_default();
        GraphSnapshot {
            nodes,
            edges: self.all_edges().await,
        }
    }
}

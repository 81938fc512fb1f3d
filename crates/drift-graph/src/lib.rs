//! Similarity index backed by in-process maps.

mod memory;
mod snapshot;

pub use drift_types::{GraphEdge, GraphNode, IndexError, SimilarityIndex};
pub use memory::{cosine_similarity, InMemoryGraphIndex};
pub use snapshot::GraphSnapshot;

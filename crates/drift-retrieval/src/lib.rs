//! DRIFT retrieval pipeline.
//!
//! query → [`EntryPointDetector`] → [`TraversalEngine`] (per seed) → [`InferenceEngine`]
//! (optional) → [`ranking`] → [`ResponseSynthesizer`] → answer.
//!
//! [`DriftRetriever`] wires the stages together and owns the runtime configuration.

mod engine;
mod entry_points;
mod error;
pub mod inference;
pub mod ranking;
mod synthesis;
pub mod text;
mod traversal;

pub use drift_types::{
    ConfigError, ConfigUpdate, DriftConfig, GraphEdge, GraphNode, InferenceStrategy,
    InferredConnection, TraversalDirection, TraversalPath,
};
pub use engine::{DriftResponse, DriftRetriever, QueryMetrics, QueryOptions};
pub use entry_points::EntryPointDetector;
pub use error::DriftError;
pub use inference::{CacheStats, InferenceEngine, InferenceOptions};
pub use synthesis::{ResponseSynthesizer, NO_RESULTS_MESSAGE};
pub use traversal::{NodeFilter, TraversalEngine, TraversalFilters};

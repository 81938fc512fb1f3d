//! Core types and traits for DRIFT knowledge-graph retrieval.
//!
//! The graph model, engine configuration, and the contracts the engine expects
//! from its collaborators (similarity index, embedder) live here so that every
//! other crate can depend on them without pulling in the pipeline.

mod config;
mod model;
mod traits;

pub use config::*;
pub use model::*;
pub use traits::*;

use drift_embed::LLMError;
use drift_types::{ConfigError, EmbedderError, IndexError};

/// Failure of a retrieval query.
///
/// Inference problems never show up here; they degrade to an empty inference list.
#[derive(Debug, thiserror::Error)]
pub enum DriftError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("empty graph: the knowledge graph has no nodes")]
    EmptyCorpus,
    #[error("no entry points found for query: {0:?}")]
    NoEntryPoints(String),
    #[error("empty query")]
    EmptyQuery,
    #[error("embedding provider: {0}")]
    Embedder(#[from] EmbedderError),
    #[error("similarity index: {0}")]
    Index(#[from] IndexError),
    #[error("LLM provider: {0}")]
    Llm(#[from] LLMError),
}

impl DriftError {
    /// Errors the caller can fix by changing the request or configuration,
    /// as opposed to a collaborator being unavailable.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            DriftError::Config(_)
                | DriftError::EmptyCorpus
                | DriftError::NoEntryPoints(_)
                | DriftError::EmptyQuery
        )
    }
}

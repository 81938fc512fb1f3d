//! Embedding and LLM provider clients.

mod llm;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
mod openai;

pub use drift_types::{Embedder, EmbedderError};
pub use llm::{LLMClient, LLMError, Message, OpenAiLLMClient};
pub use openai::OpenAiEmbedder;

#[cfg(any(test, feature = "test-util"))]
pub use mock::{FailingEmbedder, MockEmbedder, MockLLMClient};

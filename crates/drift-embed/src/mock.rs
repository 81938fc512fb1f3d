//! Deterministic providers for tests: no network.

use crate::{LLMClient, LLMError, Message};
use drift_types::{Embedder, EmbedderError};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

const DIM: usize = 256;

/// Bag-of-words embedder using feature hashing.
///
/// Each lowercase alphanumeric token adds ±1 to one of `DIM` buckets, then the vector
/// is L2-normalised. Texts sharing words therefore have positive cosine similarity,
/// which keeps entry-point selection meaningful in tests.
pub struct MockEmbedder;

impl MockEmbedder {
    pub fn new() -> Self {
        Self
    }

    fn embed_text(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; DIM];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let h = hasher.finish();
            let bucket = (h % DIM as u64) as usize;
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }
        let norm: f64 = v.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x = (*x as f64 / norm) as f32;
            }
        }
        v
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Embedder for MockEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        Ok(texts.iter().map(|t| Self::embed_text(t)).collect())
    }
}

/// Embedder that fails every call, for exercising provider-error paths.
pub struct FailingEmbedder {
    message: String,
}

impl FailingEmbedder {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait::async_trait]
impl Embedder for FailingEmbedder {
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        Err(EmbedderError::Other(self.message.clone()))
    }
}

enum Reply {
    Fixed(String),
    Fail(String),
}

/// LLM stand-in that returns a canned reply (or error) and records every prompt.
pub struct MockLLMClient {
    reply: Reply,
    prompts: Mutex<Vec<String>>,
}

impl MockLLMClient {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Reply::Fixed(reply.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Reply::Fail(message.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|g| g.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl LLMClient for MockLLMClient {
    async fn complete_with_messages(&self, messages: &[Message]) -> Result<String, LLMError> {
        let prompt = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        if let Ok(mut guard) = self.prompts.lock() {
            guard.push(prompt);
        }
        match &self.reply {
            Reply::Fixed(text) => Ok(text.clone()),
            Reply::Fail(msg) => Err(LLMError::Api(msg.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_types::Embedder;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn shared_words_are_closer_than_disjoint_words() {
        let e = MockEmbedder::new();
        let q = e.embed("deep learning").await.unwrap();
        let near = e.embed("Deep learning uses neural networks").await.unwrap();
        let far = e.embed("quarterly tax filing").await.unwrap();
        assert_eq!(q.len(), DIM);
        assert!(cosine(&q, &near) > cosine(&q, &far));
    }

    #[tokio::test]
    async fn embeddings_are_deterministic() {
        let e = MockEmbedder::new();
        let a = e.embed("same text").await.unwrap();
        let b = e.embed("same text").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn mock_llm_records_prompts_and_can_fail() {
        let ok = MockLLMClient::replying("answer");
        assert_eq!(ok.complete("question").await.unwrap(), "answer");
        assert_eq!(ok.prompts(), vec!["question".to_string()]);

        let bad = MockLLMClient::failing("down");
        assert!(matches!(bad.complete("q").await, Err(LLMError::Api(_))));
    }

    #[tokio::test]
    async fn failing_embedder_reports_its_message() {
        let e = FailingEmbedder::new("unreachable");
        match e.embed("anything").await {
            Err(EmbedderError::Other(msg)) => assert_eq!(msg, "unreachable"),
            other => panic!("expected failure, got {:?}", other),
        }
    }
}

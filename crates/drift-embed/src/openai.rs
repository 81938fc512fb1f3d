//! HTTP client for OpenAI-compatible embedding API.

use drift_types::{Embedder, EmbedderError};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    data: Vec<EmbedItem>,
}

#[derive(Debug, Deserialize)]
struct EmbedItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// Embedder that posts batches to an OpenAI-compatible `/embeddings` endpoint.
///
/// All texts of a batch go out in one request; the response is reordered by `index`
/// so output `i` always belongs to input `i`.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
    /// When set, every returned vector must have exactly this length.
    dimensions: Option<usize>,
}

impl OpenAiEmbedder {
    pub fn new(url: impl Into<String>, api_key: Option<String>, model: Option<&str>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            api_key,
            model: model.unwrap_or("text-embedding-3-small").to_string(),
            dimensions: None,
        }
    }

    /// Reads `EMBED_API_URL`, `EMBED_API_KEY`, `EMBED_MODEL`, `EMBED_DIMENSIONS`.
    pub fn from_env() -> Self {
        let url = std::env::var("EMBED_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1/embeddings".to_string());
        let api_key = std::env::var("EMBED_API_KEY").ok();
        let model = std::env::var("EMBED_MODEL").ok();
        let mut embedder = Self::new(url, api_key, model.as_deref());
        embedder.dimensions = std::env::var("EMBED_DIMENSIONS")
            .ok()
            .and_then(|v| v.parse().ok());
        embedder
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<(), EmbedderError> {
        match self.dimensions {
            Some(expected) if vector.len() != expected => Err(EmbedderError::Other(format!(
                "expected {}-dimensional embedding, got {}",
                expected,
                vector.len()
            ))),
            _ => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut body = serde_json::json!({
            "input": texts,
            "model": self.model,
        });
        if let Some(dimensions) = self.dimensions {
            body["dimensions"] = serde_json::json!(dimensions);
        }
        let mut req = self.client.post(&self.url).json(&body);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        let res = req
            .send()
            .await
            .map_err(|e| EmbedderError::Other(e.to_string()))?;
        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| EmbedderError::Other(e.to_string()))?;
        if !status.is_success() {
            return Err(EmbedderError::Other(format!(
                "embed API error {}: {}",
                status, text
            )));
        }

        let mut parsed: EmbedResponse =
            serde_json::from_str(&text).map_err(|e| EmbedderError::Other(e.to_string()))?;
        if parsed.data.is_empty() {
            return Err(EmbedderError::EmptyResponse);
        }
        if parsed.data.len() != texts.len() {
            return Err(EmbedderError::Other(format!(
                "asked for {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }
        parsed.data.sort_by_key(|item| item.index);
        let mut out = Vec::with_capacity(parsed.data.len());
        for item in parsed.data {
            self.check_dimensions(&item.embedding)?;
            out.push(item.embedding);
        }
        Ok(out)
    }
}

//! DRIFT retrieval API server.

use drift_api::bootstrap::{load_graph, BoxError};
use drift_api::server::{self, AppState};
use drift_embed::{Embedder, OpenAiEmbedder, OpenAiLLMClient};
use drift_graph::InMemoryGraphIndex;
use drift_retrieval::{DriftConfig, DriftRetriever};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = DriftConfig::from_env()?;
    let embedder: Arc<dyn Embedder> = Arc::new(OpenAiEmbedder::from_env());
    let index = match std::env::var("DRIFT_GRAPH_PATH") {
        Ok(path) => load_graph(&path, embedder.as_ref()).await?,
        Err(_) => {
            tracing::warn!("DRIFT_GRAPH_PATH not set, starting with an empty graph");
            InMemoryGraphIndex::new()
        }
    };

    let mut retriever = DriftRetriever::new(Arc::new(index), embedder, config)?;
    match OpenAiLLMClient::from_env() {
        Some(llm) => retriever = retriever.with_llm(Arc::new(llm)),
        None => tracing::info!("LLM_API_KEY not set, answers use the built-in template"),
    }

    let state = Arc::new(AppState {
        retriever: Arc::new(retriever),
    });
    let app = server::router(state);
    let addr: SocketAddr = std::env::var("DRIFT_LISTEN")
        .unwrap_or_else(|_| "0.0.0.0:8001".to_string())
        .parse()?;
    tracing::info!("DRIFT API listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(addr).await?,
        app.into_make_service(),
    )
    .await?;
    Ok(())
}

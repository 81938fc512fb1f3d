//! Axum server and routes.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use drift_retrieval::{
    CacheStats, ConfigUpdate, DriftConfig, DriftError, DriftResponse, DriftRetriever,
    QueryOptions,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub struct AppState {
    pub retriever: Arc<DriftRetriever>,
}

/// Envelope shared by every JSON endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

fn ok<T>(message: &str, data: T) -> Reply<T> {
    (
        StatusCode::OK,
        Json(ApiResponse {
            code: 200,
            message: message.to_string(),
            data: Some(data),
        }),
    )
}

fn fail<T>(status: StatusCode, message: String) -> Reply<T> {
    (
        status,
        Json(ApiResponse {
            code: i32::from(status.as_u16()),
            message,
            data: None,
        }),
    )
}

/// Malformed or mistyped bodies get the envelope with 400, not axum's plain-text 4xx.
fn bad_body<T>(rejection: JsonRejection) -> Reply<T> {
    tracing::info!(error = %rejection.body_text(), "request body rejected");
    fail(StatusCode::BAD_REQUEST, rejection.body_text())
}

fn status_for(err: &DriftError) -> StatusCode {
    match err {
        DriftError::EmptyQuery | DriftError::Config(_) => StatusCode::BAD_REQUEST,
        DriftError::EmptyCorpus | DriftError::NoEntryPoints(_) => StatusCode::NOT_FOUND,
        DriftError::Embedder(_) | DriftError::Index(_) | DriftError::Llm(_) => {
            StatusCode::BAD_GATEWAY
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/drift/query", post(handle_query))
        .route("/drift/config", get(handle_get_config).post(handle_update_config))
        .route("/drift/cache/stats", get(handle_cache_stats))
        .route("/drift/cache/clear", post(handle_cache_clear))
        .route("/health", get(handle_health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    /// Missing is treated as empty and rejected by the retriever.
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub include_provenance: Option<bool>,
    /// Only follow edges of these types.
    #[serde(default)]
    pub edge_types: Option<Vec<String>>,
    /// Only visit nodes whose metadata contains all of these key/value pairs.
    #[serde(default)]
    pub node_metadata: Option<HashMap<String, serde_json::Value>>,
}

impl QueryRequest {
    fn options(&self) -> QueryOptions {
        let mut options = QueryOptions {
            include_provenance: self.include_provenance,
            ..QueryOptions::default()
        };
        if let Some(types) = &self.edge_types {
            options = options.with_edge_types(types.iter().cloned());
        }
        if let Some(required) = self.node_metadata.clone() {
            options = options.with_node_filter(move |node| {
                required
                    .iter()
                    .all(|(k, v)| node.metadata.get(k) == Some(v))
            });
        }
        options
    }
}

async fn handle_query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Reply<DriftResponse> {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return bad_body(rejection),
    };
    match state
        .retriever
        .query_detailed(&req.query, &req.options())
        .await
    {
        Ok(res) => ok("Query completed successfully", res),
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                tracing::error!(error = %e, "drift query failed");
            } else {
                tracing::info!(error = %e, "drift query rejected");
            }
            fail(status, e.to_string())
        }
    }
}

async fn handle_get_config(State(state): State<Arc<AppState>>) -> Reply<DriftConfig> {
    ok("Success", state.retriever.config().await)
}

async fn handle_update_config(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ConfigUpdate>, JsonRejection>,
) -> Reply<DriftConfig> {
    let update = match payload {
        Ok(Json(update)) => update,
        Err(rejection) => return bad_body(rejection),
    };
    match state.retriever.update_config(&update).await {
        Ok(config) => ok("Configuration updated", config),
        Err(e) => fail(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

async fn handle_cache_stats(State(state): State<Arc<AppState>>) -> Reply<CacheStats> {
    ok("Success", state.retriever.cache_stats())
}

async fn handle_cache_clear(State(state): State<Arc<AppState>>) -> Reply<CacheStats> {
    state.retriever.clear_inference_cache();
    ok("Inference cache cleared", state.retriever.cache_stats())
}

async fn handle_health() -> &'static str {
    "ok"
}

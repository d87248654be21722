//! Caller-facing HTTP API.
//!
//! - GET  /           liveness message
//! - GET  /health     upstream reachability and model names
//! - GET  /models     model names plus the raw tags response
//! - GET  /chat       full response, parameters in the query string
//! - POST /chat       full response, parameters in a JSON body
//! - GET  /stream     plain-text body streamed fragment by fragment
//! - GET  /playground browser test page
//! - GET  /metrics    prometheus counters

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::UpstreamError;
use crate::metrics::GatewayMetrics;
use crate::server::playground::PLAYGROUND_HTML;
use crate::server::streaming::relay_generation;
use crate::upstream::aggregate::aggregate;
use crate::upstream::client::OllamaClient;
use crate::upstream::types::{AggregatedResult, GenerationParams, GenerationRequest, ModelListing};

/// Application state shared across handlers. Read-only after startup.
pub struct AppState {
    pub config: Arc<Config>,
    pub upstream: OllamaClient,
    pub metrics: Arc<GatewayMetrics>,
}

impl AppState {
    pub fn new(config: Arc<Config>) -> anyhow::Result<Self> {
        let metrics = Arc::new(GatewayMetrics::new()?);
        let upstream = OllamaClient::new(&config.upstream, metrics.clone())?;
        Ok(Self {
            config,
            upstream,
            metrics,
        })
    }
}

/// Build the axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/models", get(list_models))
        .route("/chat", get(chat_get).post(chat_post))
        .route("/stream", get(stream))
        .route("/playground", get(playground))
        .route("/metrics", get(metrics))
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─── Response Types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub ollama_url: String,
    pub models: Vec<String>,
}

// ─── Route Handlers ────────────────────────────────────────────────────────

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Ollama gateway is running" }))
}

async fn health(State(state): State<Arc<AppState>>) -> Response {
    let timeout = state.config.upstream.health_timeout();
    match state.upstream.list_models(timeout).await {
        Ok(listing) => Json(HealthResponse {
            ok: true,
            ollama_url: state.upstream.base_url().to_string(),
            models: listing.names,
        })
        .into_response(),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "ok": false, "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn list_models(State(state): State<Arc<AppState>>) -> Result<Json<ModelListing>, UpstreamError> {
    let timeout = state.config.upstream.models_timeout();
    let listing = state.upstream.list_models(timeout).await.inspect_err(|e| {
        warn!(error = %e, "Model listing failed");
    })?;
    Ok(Json(listing))
}

async fn chat_get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GenerationParams>,
) -> Result<Json<AggregatedResult>, UpstreamError> {
    chat_full(&state, params.into_request()).await.map(Json)
}

async fn chat_post(
    State(state): State<Arc<AppState>>,
    Json(params): Json<GenerationParams>,
) -> Result<Json<AggregatedResult>, UpstreamError> {
    chat_full(&state, params.into_request()).await.map(Json)
}

async fn chat_full(state: &AppState, req: GenerationRequest) -> Result<AggregatedResult, UpstreamError> {
    let request_id = Uuid::new_v4().to_string();

    info!(
        request_id = %request_id,
        model = %req.model,
        temperature = req.temperature,
        top_p = req.top_p,
        max_tokens = req.max_tokens,
        "Chat request"
    );

    let result = match state.upstream.generate(&req.payload()).await {
        Ok(fragments) => aggregate(fragments).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(text) => {
            info!(request_id = %request_id, chars = text.len(), "Chat complete");
            Ok(req.into_result(text))
        }
        Err(e) => {
            warn!(request_id = %request_id, error = %e, "Chat failed");
            Err(e)
        }
    }
}

async fn stream(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GenerationParams>,
) -> Response {
    let req = params.into_request();
    let request_id = Uuid::new_v4().to_string();

    info!(
        request_id = %request_id,
        model = %req.model,
        temperature = req.temperature,
        top_p = req.top_p,
        max_tokens = req.max_tokens,
        "Stream request"
    );

    let body = Body::from_stream(relay_generation(state.upstream.clone(), req.payload()));
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

async fn playground() -> Html<&'static str> {
    Html(PLAYGROUND_HTML)
}

async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

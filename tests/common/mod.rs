//! Shared harness: an in-process stub of the Ollama API and a gateway
//! pointed at it, both on ephemeral ports.

#![allow(dead_code)]

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;

use ollama_gateway::config::Config;
use ollama_gateway::server::api::{build_router, AppState};

/// How the stub answers `GET /api/tags`.
#[derive(Clone)]
pub enum Tags {
    Models(Value),
    Status(u16),
}

/// How the stub answers `POST /api/generate`.
#[derive(Clone)]
pub enum Generate {
    /// Whole body at once.
    Body(String),
    /// One line per frame, with a pause before each.
    Paced(Vec<String>, Duration),
    /// Error status with a text body.
    Status(u16, String),
    /// Never send headers.
    StallBeforeHeaders,
    /// Send this much of the body, then hold the connection open.
    StallAfter(String),
    /// Like `StallAfter`, but set the flag once the body is dropped.
    HeldOpen(String, Arc<AtomicBool>),
}

/// Sets its flag when dropped.
pub struct ReleaseFlag(Arc<AtomicBool>);

impl Drop for ReleaseFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

pub struct Stub {
    pub tags: Tags,
    pub generate: Generate,
    pub received: Mutex<Vec<Value>>,
}

impl Stub {
    pub fn new(tags: Tags, generate: Generate) -> Self {
        Self {
            tags,
            generate,
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn generating(generate: Generate) -> Self {
        Self::new(Tags::Models(serde_json::json!({ "models": [] })), generate)
    }

    pub fn received(&self) -> Vec<Value> {
        self.received.lock().unwrap().clone()
    }
}

async fn stub_tags(State(stub): State<Arc<Stub>>) -> Response {
    match &stub.tags {
        Tags::Models(value) => Json(value.clone()).into_response(),
        Tags::Status(code) => StatusCode::from_u16(*code).unwrap().into_response(),
    }
}

async fn stub_generate(State(stub): State<Arc<Stub>>, Json(payload): Json<Value>) -> Response {
    stub.received.lock().unwrap().push(payload);

    match stub.generate.clone() {
        Generate::Body(body) => body.into_response(),
        Generate::Paced(lines, pause) => {
            let frames = stream::iter(lines).then(move |line| async move {
                tokio::time::sleep(pause).await;
                Ok::<_, Infallible>(Bytes::from(line))
            });
            Body::from_stream(frames).into_response()
        }
        Generate::Status(code, body) => (StatusCode::from_u16(code).unwrap(), body).into_response(),
        Generate::StallBeforeHeaders => {
            tokio::time::sleep(Duration::from_secs(60)).await;
            StatusCode::OK.into_response()
        }
        Generate::StallAfter(head) => {
            let frames = stream::once(async move { Ok::<_, Infallible>(Bytes::from(head)) })
                .chain(stream::pending());
            Body::from_stream(frames).into_response()
        }
        Generate::HeldOpen(head, released) => {
            let flag = ReleaseFlag(released);
            let frames = stream::once(async move { Ok::<_, Infallible>(Bytes::from(head)) })
                .chain(stream::pending())
                .map(move |frame| {
                    let _held = &flag;
                    frame
                });
            Body::from_stream(frames).into_response()
        }
    }
}

/// Start the stub; returns its base URL.
pub async fn spawn_upstream(stub: Arc<Stub>) -> String {
    let app = Router::new()
        .route("/api/tags", get(stub_tags))
        .route("/api/generate", post(stub_generate))
        .with_state(stub);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await });
    format!("http://{addr}")
}

/// A URL nothing is listening on.
pub async fn dead_upstream() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Start a gateway in front of `upstream_url` with a one second read timeout.
pub async fn spawn_gateway(upstream_url: &str) -> String {
    spawn_gateway_with_read_timeout(upstream_url, 1).await
}

pub async fn spawn_gateway_with_read_timeout(upstream_url: &str, read_timeout_secs: u64) -> String {
    let mut config = Config::default();
    config.upstream.url = format!("{upstream_url}/");
    config.upstream.read_timeout_secs = read_timeout_secs;
    config.upstream.health_timeout_secs = 2;
    config.upstream.models_timeout_secs = 2;
    let config = Arc::new(config);

    let state = Arc::new(AppState::new(config).unwrap());
    let app = build_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await });
    format!("http://{addr}")
}

/// Stub plus gateway in one call.
pub async fn spawn(stub: Stub) -> (String, Arc<Stub>) {
    let stub = Arc::new(stub);
    let upstream = spawn_upstream(stub.clone()).await;
    let gateway = spawn_gateway(&upstream).await;
    (gateway, stub)
}

//! Upstream error taxonomy and its mapping onto caller-facing responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("no response within the read timeout")]
    Timeout,

    #[error("{0}")]
    Unavailable(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("stream read failed: {0}")]
    Read(#[source] std::io::Error),

    #[error("invalid response body: {0}")]
    InvalidBody(#[from] serde_json::Error),
}

impl UpstreamError {
    /// Classify a reqwest failure from a generate call.
    pub fn from_request(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Unavailable(err)
        }
    }

    /// Classify an I/O failure surfaced while reading the upstream body.
    pub fn from_io(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::TimedOut {
            Self::Timeout
        } else {
            Self::Read(err)
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// 504 for timeouts, 502 for everything else.
    pub fn status_code(&self) -> StatusCode {
        if self.is_timeout() {
            StatusCode::GATEWAY_TIMEOUT
        } else {
            StatusCode::BAD_GATEWAY
        }
    }

    /// Human-readable message shown to callers.
    pub fn detail(&self) -> String {
        match self {
            Self::Timeout => "Timeout talking to Ollama".to_string(),
            other => format!("Ollama error: {other}"),
        }
    }

    /// Final in-band fragment written when a streamed body fails.
    pub fn stream_notice(&self) -> String {
        format!("[{}]", self.detail())
    }
}

impl IntoResponse for UpstreamError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(json!({ "detail": self.detail() }))).into_response()
    }
}

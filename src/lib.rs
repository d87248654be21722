//! ollama-gateway: a thin HTTP front for a local Ollama server.
//!
//! Forwards generation requests to Ollama's `/api/generate` and returns the
//! output either aggregated into one JSON response or relayed as a streamed
//! plain-text body. Also proxies the model list and serves a browser
//! playground for manual testing.

pub mod config;
pub mod error;
pub mod metrics;
pub mod server;
pub mod upstream;

//! Runtime configuration for ollama-gateway.
//!
//! Configuration is loaded from an optional JSON file, then the upstream URL
//! is overridden from the command line or the `OLLAMA_URL` environment
//! variable. The resolved value is immutable for the process lifetime.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Upstream address used when nothing else is configured.
pub const DEFAULT_UPSTREAM_URL: &str = "http://127.0.0.1:11434";

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "ollama-gateway", about = "HTTP gateway for a local Ollama server")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "gateway.json")]
    pub config: PathBuf,

    /// HTTP listen address (overrides the config file).
    #[arg(long)]
    pub listen: Option<String>,

    /// Base URL of the Ollama server.
    #[arg(long, env = "OLLAMA_URL")]
    pub upstream_url: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,

    /// Upstream (Ollama) configuration.
    pub upstream: UpstreamConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (e.g. "0.0.0.0:8000").
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Upstream connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL, without a trailing slash once resolved.
    pub url: String,

    /// Connect-phase timeout for generate calls.
    pub connect_timeout_secs: u64,

    /// Read-phase timeout for generate calls (headers, then each line).
    pub read_timeout_secs: u64,

    /// Total timeout for the tags call made by `/health`.
    pub health_timeout_secs: u64,

    /// Total timeout for the tags call made by `/models`.
    pub models_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_UPSTREAM_URL.to_string(),
            connect_timeout_secs: 5,
            read_timeout_secs: 120,
            health_timeout_secs: 10,
            models_timeout_secs: 30,
        }
    }
}

impl UpstreamConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }

    pub fn models_timeout(&self) -> Duration {
        Duration::from_secs(self.models_timeout_secs)
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Apply command-line and environment overrides, then normalize.
    pub fn resolve(mut self, cli: &Cli) -> Self {
        if let Some(listen) = &cli.listen {
            self.server.listen = listen.clone();
        }
        if let Some(url) = &cli.upstream_url {
            self.upstream.url = url.clone();
        }
        self.upstream.url = normalize_url(&self.upstream.url);
        self
    }
}

/// Strip trailing slashes; an empty value means the loopback default.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        DEFAULT_UPSTREAM_URL.to_string()
    } else {
        trimmed.to_string()
    }
}

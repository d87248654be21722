//! Request, payload, and result types exchanged with callers and with Ollama.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_MODEL: &str = "phi3:mini";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_TOP_P: f64 = 0.9;
pub const DEFAULT_MAX_TOKENS: i64 = 512;

/// Caller-supplied generation parameters, as received in a query string or
/// JSON body. Everything except the prompt is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationParams {
    pub prompt: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<i64>,
}

impl GenerationParams {
    /// Resolve into a request. Absent or falsy values (`""`, `0`, `0.0`)
    /// take their defaults.
    pub fn into_request(self) -> GenerationRequest {
        GenerationRequest {
            prompt: self.prompt,
            model: self
                .model
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: self
                .temperature
                .filter(|t| *t != 0.0)
                .unwrap_or(DEFAULT_TEMPERATURE),
            top_p: self.top_p.filter(|p| *p != 0.0).unwrap_or(DEFAULT_TOP_P),
            max_tokens: self
                .max_tokens
                .filter(|n| *n != 0)
                .unwrap_or(DEFAULT_MAX_TOKENS),
        }
    }
}

/// A fully-resolved generation request. Lives for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: String,
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: i64,
}

impl GenerationRequest {
    pub fn payload(&self) -> UpstreamPayload {
        UpstreamPayload {
            model: self.model.clone(),
            prompt: self.prompt.clone(),
            stream: true,
            options: GenerateOptions {
                temperature: self.temperature,
                top_p: self.top_p,
                num_predict: self.max_tokens,
            },
        }
    }

    pub fn into_result(self, response: String) -> AggregatedResult {
        AggregatedResult {
            model: self.model,
            prompt: self.prompt,
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
            response,
        }
    }
}

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpstreamPayload {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub options: GenerateOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerateOptions {
    pub temperature: f64,
    pub top_p: f64,
    /// Ollama's name for the generation length limit.
    pub num_predict: i64,
}

/// One decoded line of the generate stream.
///
/// Only `response` is read; sibling fields are ignored whatever their type.
#[derive(Debug)]
pub struct UpstreamChunk(Value);

impl UpstreamChunk {
    pub fn parse(line: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(line).map(Self)
    }

    /// The text fragment, when `response` is a string.
    pub fn fragment(&self) -> Option<&str> {
        self.0.get("response").and_then(Value::as_str)
    }

    /// An in-stream error reported by Ollama, if any.
    pub fn error(&self) -> Option<&Value> {
        self.0.get("error")
    }
}

/// Response of the full (non-streamed) chat endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregatedResult {
    pub model: String,
    pub prompt: String,
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: i64,
    pub response: String,
}

/// Response of `GET /api/tags`, with the model names pulled out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelListing {
    pub names: Vec<String>,
    pub raw: Value,
}

impl ModelListing {
    pub fn from_raw(raw: Value) -> Self {
        let names = raw
            .get("models")
            .and_then(Value::as_array)
            .map(|models| {
                models
                    .iter()
                    .filter_map(|m| m.get("name").and_then(Value::as_str))
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self { names, raw }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(prompt: &str) -> GenerationParams {
        GenerationParams {
            prompt: prompt.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_when_absent() {
        let req = params("hi").into_request();
        assert_eq!(req.model, "phi3:mini");
        assert_eq!(req.temperature, 0.7);
        assert_eq!(req.top_p, 0.9);
        assert_eq!(req.max_tokens, 512);
    }

    #[test]
    fn test_defaults_when_falsy() {
        let req = GenerationParams {
            prompt: "hi".to_string(),
            model: Some(String::new()),
            temperature: Some(0.0),
            top_p: Some(0.0),
            max_tokens: Some(0),
        }
        .into_request();
        assert_eq!(req, params("hi").into_request());
    }

    #[test]
    fn test_supplied_values_override() {
        let req = GenerationParams {
            prompt: "hi".to_string(),
            model: Some("llama3:8b".to_string()),
            temperature: Some(1.3),
            top_p: Some(0.5),
            max_tokens: Some(64),
        }
        .into_request();
        assert_eq!(req.model, "llama3:8b");
        assert_eq!(req.temperature, 1.3);
        assert_eq!(req.top_p, 0.5);
        assert_eq!(req.max_tokens, 64);
    }

    #[test]
    fn test_payload_shape() {
        let payload = params("why is the sky blue?").into_request().payload();
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "phi3:mini",
                "prompt": "why is the sky blue?",
                "stream": true,
                "options": { "temperature": 0.7, "top_p": 0.9, "num_predict": 512 }
            })
        );
    }

    #[test]
    fn test_model_listing_names() {
        let raw = json!({
            "models": [
                { "name": "phi3:mini", "size": 2176178913u64 },
                { "size": 1 },
                { "name": "" },
                { "name": "llama3:8b" }
            ]
        });
        let listing = ModelListing::from_raw(raw);
        assert_eq!(listing.names, vec!["phi3:mini", "llama3:8b"]);

        assert!(ModelListing::from_raw(json!({ "models": [] })).names.is_empty());
        assert!(ModelListing::from_raw(json!({})).names.is_empty());
    }
}

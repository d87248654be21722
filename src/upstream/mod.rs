//! Everything that talks to, or decodes output from, the Ollama server.
//!
//! - [`client`]: HTTP calls to the tags and generate endpoints
//! - [`decode`]: shared line decoding and the lazy fragment stream
//! - [`aggregate`]: fold a fragment stream into the full response
//! - [`types`]: request parameters, upstream payload, results

pub mod aggregate;
pub mod client;
pub mod decode;
pub mod types;

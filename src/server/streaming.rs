//! Stream relay: forwards fragments to the caller as they arrive.
//!
//! The HTTP status is committed before the first fragment, so any upstream
//! failure becomes one final in-band notice and the body then ends.

use std::convert::Infallible;
use std::future::ready;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use tracing::warn;

use crate::error::UpstreamError;
use crate::upstream::client::OllamaClient;
use crate::upstream::decode::Fragments;
use crate::upstream::types::UpstreamPayload;

/// Relay an already-open fragment stream. Empty fragments carry nothing and
/// are not forwarded.
pub fn relay(fragments: Fragments) -> impl Stream<Item = Result<Bytes, Infallible>> + Send {
    let non_empty = fragments.filter(|item| ready(!matches!(item, Ok(text) if text.is_empty())));
    non_empty.scan(false, |failed, item| {
        if *failed {
            return ready(None);
        }
        let text = match item {
            Ok(fragment) => fragment,
            Err(e) => {
                warn!(error = %e, "Upstream failed while streaming");
                *failed = true;
                e.stream_notice()
            }
        };
        ready(Some(Ok(Bytes::from(text))))
    })
}

/// Open the upstream generation lazily, on first poll, and relay it.
///
/// A failure to start the generation is relayed the same way as one that
/// happens mid-stream.
pub fn relay_generation(
    client: OllamaClient,
    payload: UpstreamPayload,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send {
    let upstream = stream::once(async move { client.generate(&payload).await })
        .map(|started: Result<Fragments, UpstreamError>| match started {
            Ok(fragments) => fragments,
            Err(e) => stream::iter([Err(e)]).boxed(),
        })
        .flatten()
        .boxed();
    relay(upstream)
}

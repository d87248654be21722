//! Line-by-line decoding of Ollama's newline-delimited JSON stream.
//!
//! [`decode_line`] is the only place the skip-on-malformed policy lives.
//! [`fragments`] wraps it into a lazy, single-pass stream that both the
//! aggregator and the relay consume.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, BoxStream};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use crate::error::UpstreamError;
use crate::metrics::{DropReason, GatewayMetrics};
use crate::upstream::types::UpstreamChunk;

/// Lazy, non-restartable sequence of text fragments in arrival order.
///
/// Ends after the first error.
pub type Fragments = BoxStream<'static, Result<String, UpstreamError>>;

/// What a single upstream line turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedLine {
    Blank,
    Fragment(String),
    Dropped(DropReason),
}

pub fn decode_line(line: &[u8]) -> DecodedLine {
    if line.iter().all(u8::is_ascii_whitespace) {
        return DecodedLine::Blank;
    }

    match UpstreamChunk::parse(line) {
        Ok(chunk) => match chunk.fragment() {
            Some(text) => DecodedLine::Fragment(text.to_string()),
            None => {
                if let Some(err) = chunk.error() {
                    warn!(error = %err, "Upstream reported an error in-stream");
                }
                DecodedLine::Dropped(DropReason::NoFragment)
            }
        },
        Err(e) => {
            debug!(error = %e, len = line.len(), "Dropping malformed upstream line");
            DecodedLine::Dropped(DropReason::Malformed)
        }
    }
}

struct LineReader<R> {
    reader: R,
    read_timeout: Duration,
    metrics: Arc<GatewayMetrics>,
    finished: bool,
}

/// Turn a buffered upstream body into a [`Fragments`] stream.
///
/// Each line must arrive within `read_timeout`; otherwise the stream yields
/// [`UpstreamError::Timeout`] and ends. EOF ends the stream normally.
///
/// The budget covers a whole line, not each socket read: a line that keeps
/// trickling in for longer than `read_timeout` times out even though bytes
/// are still arriving, and line length is not capped. Ollama emits one short
/// JSON object per token, so neither matters for its generate stream.
pub fn fragments<R>(reader: R, read_timeout: Duration, metrics: Arc<GatewayMetrics>) -> Fragments
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let state = LineReader {
        reader,
        read_timeout,
        metrics,
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }

        let mut line = Vec::new();
        loop {
            line.clear();
            let read = tokio::time::timeout(
                state.read_timeout,
                state.reader.read_until(b'\n', &mut line),
            )
            .await;

            match read {
                Err(_) => {
                    state.finished = true;
                    return Some((Err(UpstreamError::Timeout), state));
                }
                Ok(Err(e)) => {
                    state.finished = true;
                    return Some((Err(UpstreamError::from_io(e)), state));
                }
                Ok(Ok(0)) => return None,
                Ok(Ok(_)) => match decode_line(&line) {
                    DecodedLine::Blank => {}
                    DecodedLine::Fragment(text) => return Some((Ok(text), state)),
                    DecodedLine::Dropped(reason) => state.metrics.record_dropped_line(reason),
                },
            }
        }
    }))
}

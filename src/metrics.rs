//! Prometheus counters for upstream traffic.
//!
//! Lines the decoder drops are counted here rather than surfaced, so a change
//! in the upstream wire format shows up as a rising drop rate.

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Why an upstream line produced no fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Not valid JSON (or not valid UTF-8).
    Malformed,
    /// Valid JSON without a `response` string.
    NoFragment,
}

impl DropReason {
    fn as_label(self) -> &'static str {
        match self {
            DropReason::Malformed => "malformed",
            DropReason::NoFragment => "no_fragment",
        }
    }
}

/// Outcome label for an upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Timeout,
    Error,
}

impl Outcome {
    fn as_label(self) -> &'static str {
        match self {
            Outcome::Ok => "ok",
            Outcome::Timeout => "timeout",
            Outcome::Error => "error",
        }
    }
}

pub struct GatewayMetrics {
    registry: Registry,
    lines_dropped: IntCounterVec,
    upstream_requests: IntCounterVec,
}

impl GatewayMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let lines_dropped = IntCounterVec::new(
            Opts::new(
                "gateway_upstream_lines_dropped_total",
                "Upstream stream lines that carried no text fragment",
            ),
            &["reason"],
        )?;
        let upstream_requests = IntCounterVec::new(
            Opts::new(
                "gateway_upstream_requests_total",
                "Calls made to the upstream server",
            ),
            &["endpoint", "outcome"],
        )?;

        registry.register(Box::new(lines_dropped.clone()))?;
        registry.register(Box::new(upstream_requests.clone()))?;

        Ok(Self {
            registry,
            lines_dropped,
            upstream_requests,
        })
    }

    pub fn record_dropped_line(&self, reason: DropReason) {
        self.lines_dropped.with_label_values(&[reason.as_label()]).inc();
    }

    pub fn dropped_lines(&self, reason: DropReason) -> u64 {
        self.lines_dropped.with_label_values(&[reason.as_label()]).get()
    }

    pub fn record_request(&self, endpoint: &str, outcome: Outcome) {
        self.upstream_requests
            .with_label_values(&[endpoint, outcome.as_label()])
            .inc();
    }

    pub fn requests(&self, endpoint: &str, outcome: Outcome) -> u64 {
        self.upstream_requests
            .with_label_values(&[endpoint, outcome.as_label()])
            .get()
    }

    /// Render every registered metric in the text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

//! Metrics collection.
//!
//! # Metrics
//! - `magic_spend_rpc_requests_total` (counter): remote calls by endpoint, method, outcome
//! - `magic_spend_rpc_duration_seconds` (histogram): remote call latency
//! - `magic_spend_flow_steps_total` (counter): completed flow steps by name
//!
//! No exporter is installed here. Without a recorder these calls are no-ops.

use std::time::Duration;

/// Which remote endpoint served a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Node,
    Bundler,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Node => "node",
            Endpoint::Bundler => "bundler",
        }
    }
}

/// Record the outcome and latency of one remote call.
pub fn record_rpc_call(endpoint: Endpoint, method: &'static str, ok: bool, elapsed: Duration) {
    let outcome = if ok { "ok" } else { "error" };
    metrics::counter!(
        "magic_spend_rpc_requests_total",
        "endpoint" => endpoint.as_str(),
        "method" => method,
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!(
        "magic_spend_rpc_duration_seconds",
        "endpoint" => endpoint.as_str(),
        "method" => method
    )
    .record(elapsed.as_secs_f64());
}

/// Record that a named flow step completed.
pub fn record_step(step: &'static str) {
    metrics::counter!("magic_spend_flow_steps_total", "step" => step).increment(1);
}

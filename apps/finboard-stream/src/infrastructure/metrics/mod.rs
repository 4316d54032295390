//! Prometheus Metrics Module
//!
//! Exposes application metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Feed**: trades received and dispatched, malformed frames
//! - **Connection**: connection state, reconnection attempts
//! - **Subscriptions**: active symbols and listener failures
//! - **Quotes**: REST quote requests by endpoint and data source
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port.

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::domain::connection::ConnectionState;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Calling it again returns the handle installed by the first call.
///
/// # Errors
///
/// Returns an error if the recorder cannot be installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "finboard_trades_received_total",
        "Total trade events received from the feed"
    );
    describe_counter!(
        "finboard_trades_dispatched_total",
        "Total listener invocations for trade events"
    );
    describe_counter!(
        "finboard_listener_failures_total",
        "Total listener invocations that returned an error or panicked"
    );
    describe_counter!(
        "finboard_malformed_frames_total",
        "Total inbound frames or trade entries that could not be decoded"
    );

    describe_gauge!(
        "finboard_connection_state",
        "Feed connection state (0 idle, 1 connecting, 2 open, 3 closed, 4 exhausted)"
    );
    describe_counter!(
        "finboard_reconnects_total",
        "Total feed reconnection attempts"
    );

    describe_gauge!(
        "finboard_subscribed_symbols",
        "Number of symbols with at least one listener"
    );

    describe_counter!(
        "finboard_quote_requests_total",
        "Total quote service requests by endpoint and data source"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Why a listener invocation failed.
#[derive(Debug, Clone, Copy)]
pub enum ListenerFailure {
    /// The listener returned an error.
    Error,
    /// The listener panicked.
    Panic,
}

impl ListenerFailure {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Panic => "panic",
        }
    }
}

/// Where a quote service response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteSource {
    /// Served from the TTL cache.
    Cache,
    /// Fetched from the REST API.
    Upstream,
    /// Synthesized locally.
    Synthetic,
}

impl QuoteSource {
    /// Label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Upstream => "upstream",
            Self::Synthetic => "synthetic",
        }
    }
}

/// Record trade events received from the feed.
pub fn record_trades_received(count: u64) {
    counter!("finboard_trades_received_total").increment(count);
}

/// Record listener invocations.
pub fn record_trades_dispatched(count: u64) {
    counter!("finboard_trades_dispatched_total").increment(count);
}

/// Record a failed listener invocation.
pub fn record_listener_failure(kind: ListenerFailure) {
    counter!(
        "finboard_listener_failures_total",
        "kind" => kind.as_str()
    )
    .increment(1);
}

/// Record undecodable frames or trade entries.
pub fn record_malformed(count: u64) {
    counter!("finboard_malformed_frames_total").increment(count);
}

/// Publish the connection state.
pub fn set_connection_state(state: ConnectionState) {
    gauge!("finboard_connection_state").set(f64::from(state.code()));
}

/// Record a reconnection attempt.
pub fn record_reconnect() {
    counter!("finboard_reconnects_total").increment(1);
}

/// Publish the number of active symbols.
pub fn set_subscribed_symbols(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("finboard_subscribed_symbols").set(count as f64);
}

/// Record a quote service request.
pub fn record_quote_request(endpoint: &'static str, source: QuoteSource) {
    counter!(
        "finboard_quote_requests_total",
        "endpoint" => endpoint,
        "source" => source.as_str()
    )
    .increment(1);
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_values() {
        assert_eq!(ListenerFailure::Error.as_str(), "error");
        assert_eq!(ListenerFailure::Panic.as_str(), "panic");
        assert_eq!(QuoteSource::Cache.as_str(), "cache");
        assert_eq!(QuoteSource::Upstream.as_str(), "upstream");
        assert_eq!(QuoteSource::Synthetic.as_str(), "synthetic");
    }

    #[test]
    fn recording_without_recorder_is_noop() {
        record_trades_received(3);
        record_listener_failure(ListenerFailure::Panic);
        set_connection_state(ConnectionState::Open);
        set_subscribed_symbols(2);
        record_quote_request("quote", QuoteSource::Synthetic);
    }
}

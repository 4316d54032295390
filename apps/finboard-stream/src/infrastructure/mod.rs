//! Infrastructure Layer - Adapters for the Finnhub feed and REST API,
//! dashboard persistence, configuration, and observability.

/// Finnhub WebSocket feed, stream manager and REST quote service.
pub mod finnhub;

/// Dashboard persistence adapters.
pub mod storage;

/// Environment-based configuration.
pub mod config;

/// Health check HTTP server.
pub mod health;

/// Prometheus metrics.
pub mod metrics;

/// Tracing and OpenTelemetry setup.
pub mod telemetry;

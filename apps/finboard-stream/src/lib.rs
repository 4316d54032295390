#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Finboard Stream - Market Data Feed Manager
//!
//! Maintains a single reconnecting connection to the Finnhub trade stream
//! and multiplexes per-symbol subscriptions to any number of in-process
//! listeners. Also hosts the dashboard widget store and a cached REST
//! quote service with synthetic fallback data.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Core types with no I/O
//!   - `streaming`: Trade events
//!   - `subscription`: Per-symbol listener registry
//!   - `connection`: Connection state machine and reconnect policy
//!   - `widget`: Dashboard widgets, layout and templates
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Feed transport and dashboard storage interfaces
//!   - `services`: Dashboard store
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `finnhub`: WebSocket transport, stream manager, quote service
//!   - `storage`: JSON file persistence for the dashboard
//!   - `config`: Environment configuration
//!   - `health`: Health check HTTP endpoint
//!
//! # Data Flow
//!
//! ```text
//! Finnhub WS ──► FeedDriver ──► SubscriptionRegistry ──► listener 1
//!                   ▲                                 ├─► listener 2
//!                   │ subscribe / unsubscribe         └─► listener N
//!              StreamManager
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core feed and dashboard types with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::connection::ConnectionState;
pub use domain::connection::reconnect::ReconnectConfig;
pub use domain::streaming::{Symbol, TradeEvent};
pub use domain::subscription::{Listener, ListenerId, RegistryStats, SharedListener};
pub use domain::widget::{Dashboard, Position, Theme, Widget, WidgetConfig, WidgetKind};

// Dashboard store
pub use application::services::{DashboardError, DashboardExport, DashboardStore};

// Feed
pub use infrastructure::finnhub::{
    QuoteService, QuoteServiceConfig, StreamConfig, StreamManager, SubscriptionHandle,
    TradeStream, WebSocketTransport,
};

// Infrastructure config
pub use infrastructure::config::{AppConfig, ConfigError};

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};

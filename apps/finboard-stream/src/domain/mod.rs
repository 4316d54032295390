//! Domain Layer - Core feed, subscription and dashboard types.
//!
//! Nothing in this layer performs I/O. The connection lifecycle is a pure
//! state machine driven by the feed adapter in the infrastructure layer.

/// Trade event types.
pub mod streaming;

/// Subscription registry and listener abstraction.
pub mod subscription;

/// Connection state machine and reconnection policy.
pub mod connection;

/// Dashboard widgets and templates.
pub mod widget;

/// Display formatting helpers.
pub mod format;

//! Port Interfaces
//!
//! Contracts that infrastructure adapters implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `FeedTransport`: opens text-frame links to the upstream trade feed
//! - `DashboardStorage`: persists the dashboard document

mod dashboard_storage_port;
mod feed_transport_port;

pub use dashboard_storage_port::{DashboardStorage, StorageError};
pub use feed_transport_port::{FeedLink, FeedLinkPeer, FeedTransport, TransportError};

#[cfg(test)]
pub use dashboard_storage_port::MockDashboardStorage;
#[cfg(test)]
pub use feed_transport_port::MockFeedTransport;

//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `DashboardStore`: widget collection with persistence, templates and
//!   import/export

/// Dashboard widget store.
pub mod dashboard;

pub use dashboard::{DashboardError, DashboardExport, DashboardStore};

//! Dashboard Storage Port (Driven Port)
//!
//! Key-value persistence of the dashboard as one JSON document.

use crate::domain::widget::Dashboard;

/// Dashboard storage error.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Reading or writing the backing store failed.
    #[error("dashboard storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored document is not a valid dashboard.
    #[error("dashboard storage is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

/// Port for loading and saving the dashboard.
#[cfg_attr(test, mockall::automock)]
pub trait DashboardStorage: Send + Sync {
    /// Load the stored dashboard, or `None` if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or is corrupt.
    fn load(&self) -> Result<Option<Dashboard>, StorageError>;

    /// Replace the stored dashboard.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn save(&self, dashboard: &Dashboard) -> Result<(), StorageError>;
}

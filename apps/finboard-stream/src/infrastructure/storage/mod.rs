//! Dashboard Storage Adapters
//!
//! - `JsonFileStorage`: one pretty-printed JSON file, replaced atomically
//! - `InMemoryStorage`: for tests and ephemeral sessions

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::application::ports::{DashboardStorage, StorageError};
use crate::domain::widget::Dashboard;

/// Default dashboard file name.
pub const DEFAULT_DASHBOARD_PATH: &str = "finboard-dashboard.json";

// =============================================================================
// JSON File
// =============================================================================

/// Dashboard persisted as a JSON file.
///
/// Saves write a sibling temp file and rename it over the target, so a
/// crash never leaves a half-written dashboard behind.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    /// Storage backed by the file at `path`. The file need not exist yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl DashboardStorage for JsonFileStorage {
    fn load(&self) -> Result<Option<Dashboard>, StorageError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn save(&self, dashboard: &Dashboard) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_vec_pretty(dashboard)?;
        let temp = self.temp_path();
        {
            let mut file = fs::File::create(&temp)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(&temp, &self.path)?;

        tracing::debug!(path = %self.path.display(), widgets = dashboard.widgets.len(), "Dashboard saved");
        Ok(())
    }
}

// =============================================================================
// In Memory
// =============================================================================

/// Dashboard kept in memory only.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    dashboard: RwLock<Option<Dashboard>>,
}

impl InMemoryStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-populated with `dashboard`.
    #[must_use]
    pub fn with(dashboard: Dashboard) -> Self {
        Self {
            dashboard: RwLock::new(Some(dashboard)),
        }
    }

    /// Last saved dashboard.
    #[must_use]
    pub fn stored(&self) -> Option<Dashboard> {
        self.dashboard.read().clone()
    }
}

impl DashboardStorage for InMemoryStorage {
    fn load(&self) -> Result<Option<Dashboard>, StorageError> {
        Ok(self.stored())
    }

    fn save(&self, dashboard: &Dashboard) -> Result<(), StorageError> {
        *self.dashboard.write() = Some(dashboard.clone());
        Ok(())
    }
}

//! Dashboard Store
//!
//! Ordered widget collection with theme, template loading and JSON
//! import/export. Every mutation is written through the
//! [`DashboardStorage`] port before it becomes visible; a failed write leaves
//! the in-memory state untouched.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::application::ports::{DashboardStorage, StorageError};
use crate::domain::streaming::Symbol;
use crate::domain::widget::{
    Dashboard, Position, Theme, Widget, WidgetDraft, WidgetId, WidgetPatch, templates,
};

/// Version tag written into exported documents.
pub const EXPORT_VERSION: &str = "1.0";

// =============================================================================
// Errors
// =============================================================================

/// Dashboard store error.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// No widget with this id.
    #[error("widget not found: {0}")]
    WidgetNotFound(WidgetId),

    /// No built-in template with this id.
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// The imported document is not a dashboard configuration.
    #[error("invalid dashboard configuration: {0}")]
    InvalidImport(#[source] serde_json::Error),

    /// The dashboard could not be serialized.
    #[error("failed to export dashboard: {0}")]
    Export(#[source] serde_json::Error),

    /// Persisting the change failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

// =============================================================================
// Export Document
// =============================================================================

/// Document produced by [`DashboardStore::export_json`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardExport {
    /// Widgets in display order.
    pub widgets: Vec<Widget>,
    /// Theme; absent in hand-written imports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    /// When the export was made.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_date: Option<DateTime<Utc>>,
    /// Document version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

// =============================================================================
// Store
// =============================================================================

/// Persistent widget store.
pub struct DashboardStore {
    state: Mutex<Dashboard>,
    storage: Arc<dyn DashboardStorage>,
}

impl std::fmt::Debug for DashboardStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardStore")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl DashboardStore {
    /// Open the store, loading whatever `storage` holds.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored dashboard cannot be read.
    pub fn open(storage: Arc<dyn DashboardStorage>) -> Result<Self, DashboardError> {
        let dashboard = storage.load()?.unwrap_or_default();
        tracing::debug!(widgets = dashboard.widgets.len(), "Dashboard loaded");
        Ok(Self {
            state: Mutex::new(dashboard),
            storage,
        })
    }

    /// Append a widget at the default position.
    ///
    /// # Errors
    ///
    /// Returns an error if the change cannot be persisted.
    pub fn add_widget(&self, draft: WidgetDraft) -> Result<Widget, DashboardError> {
        self.mutate(|dashboard| {
            let widget = draft.place(Position::default());
            dashboard.widgets.push(widget.clone());
            Ok(widget)
        })
    }

    /// Remove a widget.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::WidgetNotFound`] for unknown ids.
    pub fn remove_widget(&self, id: WidgetId) -> Result<Widget, DashboardError> {
        self.mutate(|dashboard| {
            let index = dashboard
                .position_of(id)
                .ok_or(DashboardError::WidgetNotFound(id))?;
            Ok(dashboard.widgets.remove(index))
        })
    }

    /// Apply a partial update to a widget.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::WidgetNotFound`] for unknown ids.
    pub fn update_widget(&self, id: WidgetId, patch: WidgetPatch) -> Result<Widget, DashboardError> {
        self.mutate(|dashboard| {
            let widget = dashboard
                .widgets
                .iter_mut()
                .find(|w| w.id == id)
                .ok_or(DashboardError::WidgetNotFound(id))?;
            patch.apply(widget);
            Ok(widget.clone())
        })
    }

    /// Move or resize a widget.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::WidgetNotFound`] for unknown ids.
    pub fn update_position(&self, id: WidgetId, position: Position) -> Result<Widget, DashboardError> {
        self.update_widget(
            id,
            WidgetPatch {
                position: Some(position),
                ..WidgetPatch::default()
            },
        )
    }

    /// Switch between light and dark. Returns the new theme.
    ///
    /// # Errors
    ///
    /// Returns an error if the change cannot be persisted.
    pub fn toggle_theme(&self) -> Result<Theme, DashboardError> {
        self.mutate(|dashboard| {
            dashboard.theme = dashboard.theme.toggled();
            Ok(dashboard.theme)
        })
    }

    /// Remove every widget. The theme is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the change cannot be persisted.
    pub fn clear(&self) -> Result<(), DashboardError> {
        self.mutate(|dashboard| {
            dashboard.widgets.clear();
            Ok(())
        })
    }

    /// Replace all widgets with a built-in template's.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::TemplateNotFound`] for unknown template ids.
    pub fn load_template(&self, template_id: &str) -> Result<Vec<Widget>, DashboardError> {
        let template = templates::find(template_id)
            .ok_or_else(|| DashboardError::TemplateNotFound(template_id.to_string()))?;

        let widgets: Vec<Widget> = template
            .widgets
            .into_iter()
            .map(|(draft, position)| draft.place(position))
            .collect();

        tracing::info!(template = template_id, widgets = widgets.len(), "Loading dashboard template");

        self.mutate(|dashboard| {
            dashboard.widgets.clone_from(&widgets);
            Ok(widgets)
        })
    }

    /// Serialize the dashboard as a pretty-printed export document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn export_json(&self) -> Result<String, DashboardError> {
        let dashboard = self.snapshot();
        let document = DashboardExport {
            widgets: dashboard.widgets,
            theme: Some(dashboard.theme),
            export_date: Some(Utc::now()),
            version: Some(EXPORT_VERSION.to_string()),
        };
        serde_json::to_string_pretty(&document).map_err(DashboardError::Export)
    }

    /// Replace the dashboard with an exported document.
    ///
    /// The document must contain `widgets`. A missing `theme` keeps the
    /// current one.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::InvalidImport`] if the document does not
    /// parse; the store is left unchanged.
    pub fn import_json(&self, json: &str) -> Result<usize, DashboardError> {
        let document: DashboardExport =
            serde_json::from_str(json).map_err(DashboardError::InvalidImport)?;

        self.mutate(|dashboard| {
            dashboard.widgets = document.widgets;
            if let Some(theme) = document.theme {
                dashboard.theme = theme;
            }
            Ok(dashboard.widgets.len())
        })
    }

    /// Widgets in display order.
    #[must_use]
    pub fn widgets(&self) -> Vec<Widget> {
        self.state.lock().widgets.clone()
    }

    /// Current theme.
    #[must_use]
    pub fn theme(&self) -> Theme {
        self.state.lock().theme
    }

    /// Copy of the whole dashboard.
    #[must_use]
    pub fn snapshot(&self) -> Dashboard {
        self.state.lock().clone()
    }

    /// Distinct symbols shown by live widgets, in widget order.
    #[must_use]
    pub fn live_symbols(&self) -> Vec<Symbol> {
        self.state.lock().live_symbols()
    }

    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut Dashboard) -> Result<T, DashboardError>,
    ) -> Result<T, DashboardError> {
        let mut state = self.state.lock();
        let mut next = state.clone();
        let out = change(&mut next)?;
        self.storage.save(&next)?;
        *state = next;
        drop(state);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use crate::application::ports::MockDashboardStorage;
    use crate::domain::widget::{WidgetConfig, WidgetKind};

    use super::*;

    #[test]
    fn failed_save_leaves_state_unchanged() {
        let mut storage = MockDashboardStorage::new();
        storage.expect_load().returning(|| Ok(None));
        storage.expect_save().times(1).returning(|_| {
            Err(StorageError::Io(std::io::Error::other("disk full")))
        });

        let store = DashboardStore::open(Arc::new(storage)).unwrap();
        let result = store.add_widget(WidgetDraft::new(
            WidgetKind::Table,
            "Watchlist",
            WidgetConfig::default(),
        ));

        assert!(matches!(result, Err(DashboardError::Storage(_))));
        assert!(store.widgets().is_empty());
    }

    #[test]
    fn unknown_widget_does_not_touch_storage() {
        let mut storage = MockDashboardStorage::new();
        storage.expect_load().returning(|| Ok(None));
        storage.expect_save().never();

        let store = DashboardStore::open(Arc::new(storage)).unwrap();
        let id = uuid::Uuid::new_v4();

        assert!(matches!(
            store.remove_widget(id),
            Err(DashboardError::WidgetNotFound(missing)) if missing == id
        ));
        assert!(matches!(
            store.load_template("nope"),
            Err(DashboardError::TemplateNotFound(_))
        ));
    }
}

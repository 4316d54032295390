//! Dashboard Widgets
//!
//! Descriptors for the widgets a user arranges on the dashboard, and the
//! dashboard snapshot that is persisted as a single JSON document.

pub mod templates;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::streaming::Symbol;

// =============================================================================
// Widget Types
// =============================================================================

/// Kind of widget. Determines how the widget is rendered and which data it
/// pulls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetKind {
    /// Watchlist table of quotes.
    Table,
    /// Summary cards.
    Cards,
    /// Historical price chart.
    Chart,
    /// Live price ticker fed by the trade stream.
    Live,
}

impl WidgetKind {
    /// Whether this widget consumes the live trade stream.
    #[must_use]
    pub const fn is_streaming(self) -> bool {
        matches!(self, Self::Live)
    }
}

/// Per-widget configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetConfig {
    /// Instrument shown by the widget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<Symbol>,
    /// Candle resolution for charts (`1`, `5`, `D`, `W`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
}

impl WidgetConfig {
    /// Configuration for a single symbol.
    #[must_use]
    pub fn for_symbol(symbol: impl Into<Symbol>) -> Self {
        Self {
            symbol: Some(symbol.into()),
            interval: None,
        }
    }

    /// Set the chart interval.
    #[must_use]
    pub fn with_interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = Some(interval.into());
        self
    }
}

/// Grid placement in layout units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
    /// Width in columns.
    pub w: u32,
    /// Height in rows.
    pub h: u32,
}

impl Position {
    /// Create a position.
    #[must_use]
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
}

impl Default for Position {
    /// Top-left, six columns by four rows.
    fn default() -> Self {
        Self::new(0, 0, 6, 4)
    }
}

/// Unique widget identifier.
pub type WidgetId = Uuid;

/// A placed widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Widget {
    /// Identifier, unique within a dashboard.
    pub id: WidgetId,
    /// Widget kind.
    #[serde(rename = "type")]
    pub kind: WidgetKind,
    /// Display title.
    pub title: String,
    /// Kind-specific configuration.
    #[serde(default)]
    pub config: WidgetConfig,
    /// Grid placement.
    #[serde(default)]
    pub position: Position,
}

/// A widget before it is placed: everything except the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetDraft {
    /// Widget kind.
    pub kind: WidgetKind,
    /// Display title.
    pub title: String,
    /// Kind-specific configuration.
    pub config: WidgetConfig,
}

impl WidgetDraft {
    /// Create a draft.
    #[must_use]
    pub fn new(kind: WidgetKind, title: impl Into<String>, config: WidgetConfig) -> Self {
        Self {
            kind,
            title: title.into(),
            config,
        }
    }

    /// Place the draft with a fresh id.
    #[must_use]
    pub fn place(self, position: Position) -> Widget {
        Widget {
            id: Uuid::new_v4(),
            kind: self.kind,
            title: self.title,
            config: self.config,
            position,
        }
    }
}

/// Partial update of a widget. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WidgetPatch {
    /// New title.
    pub title: Option<String>,
    /// New configuration.
    pub config: Option<WidgetConfig>,
    /// New position.
    pub position: Option<Position>,
}

impl WidgetPatch {
    /// Apply the patch to `widget`.
    pub fn apply(self, widget: &mut Widget) {
        if let Some(title) = self.title {
            widget.title = title;
        }
        if let Some(config) = self.config {
            widget.config = config;
        }
        if let Some(position) = self.position {
            widget.position = position;
        }
    }
}

// =============================================================================
// Dashboard
// =============================================================================

/// Colour theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light theme.
    #[default]
    Light,
    /// Dark theme.
    Dark,
}

impl Theme {
    /// The other theme.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

/// Persisted dashboard state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    /// Widgets in display order.
    #[serde(default)]
    pub widgets: Vec<Widget>,
    /// Colour theme.
    #[serde(default)]
    pub theme: Theme,
}

impl Dashboard {
    /// Index of the widget with `id`.
    #[must_use]
    pub fn position_of(&self, id: WidgetId) -> Option<usize> {
        self.widgets.iter().position(|w| w.id == id)
    }

    /// Distinct symbols of streaming widgets, in widget order.
    #[must_use]
    pub fn live_symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = Vec::new();
        for widget in self.widgets.iter().filter(|w| w.kind.is_streaming()) {
            if let Some(symbol) = &widget.config.symbol
                && !symbols.contains(symbol)
            {
                symbols.push(symbol.clone());
            }
        }
        symbols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widget_serializes_kind_as_type() {
        let widget = WidgetDraft::new(WidgetKind::Live, "AAPL Live", WidgetConfig::for_symbol("AAPL"))
            .place(Position::default());

        let json = serde_json::to_value(&widget).unwrap();
        assert_eq!(json["type"], "live");
        assert_eq!(json["config"]["symbol"], "AAPL");
        assert!(json["config"].get("interval").is_none());
        assert_eq!(json["position"]["w"], 6);
    }

    #[test]
    fn widget_without_position_gets_default() {
        let json = r#"{"id":"6f9619ff-8b86-d011-b42d-00cf4fc964ff","type":"table","title":"Watchlist"}"#;
        let widget: Widget = serde_json::from_str(json).unwrap();
        assert_eq!(widget.position, Position::new(0, 0, 6, 4));
        assert_eq!(widget.config, WidgetConfig::default());
    }

    #[test]
    fn patch_only_touches_given_fields() {
        let mut widget =
            WidgetDraft::new(WidgetKind::Chart, "Chart", WidgetConfig::for_symbol("NVDA")).place(Position::default());

        WidgetPatch {
            title: Some("NVDA 5m".to_string()),
            ..WidgetPatch::default()
        }
        .apply(&mut widget);

        assert_eq!(widget.title, "NVDA 5m");
        assert_eq!(widget.config.symbol.as_deref(), Some("NVDA"));
    }

    #[test]
    fn live_symbols_are_distinct_and_ordered() {
        let place = |kind, symbol: &str| {
            WidgetDraft::new(kind, symbol, WidgetConfig::for_symbol(symbol)).place(Position::default())
        };
        let dashboard = Dashboard {
            widgets: vec![
                place(WidgetKind::Live, "TSLA"),
                place(WidgetKind::Chart, "NVDA"),
                place(WidgetKind::Live, "AAPL"),
                place(WidgetKind::Live, "TSLA"),
            ],
            theme: Theme::Dark,
        };

        assert_eq!(dashboard.live_symbols(), vec!["TSLA".to_string(), "AAPL".to_string()]);
    }

    #[test]
    fn theme_toggles() {
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
    }
}

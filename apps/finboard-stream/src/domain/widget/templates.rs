//! Built-in dashboard templates.

use super::{Position, WidgetConfig, WidgetDraft, WidgetKind};

/// A named, ready-made widget arrangement.
#[derive(Debug, Clone)]
pub struct DashboardTemplate {
    /// Stable identifier used to load the template.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Widgets with their placement.
    pub widgets: Vec<(WidgetDraft, Position)>,
}

/// Identifiers of every built-in template.
pub const TEMPLATE_IDS: [&str; 3] = ["day-trader", "long-term", "market-overview"];

/// Look up a built-in template by id.
#[must_use]
pub fn find(id: &str) -> Option<DashboardTemplate> {
    match id {
        "day-trader" => Some(day_trader()),
        "long-term" => Some(long_term()),
        "market-overview" => Some(market_overview()),
        _ => None,
    }
}

/// Every built-in template.
#[must_use]
pub fn all() -> Vec<DashboardTemplate> {
    vec![day_trader(), long_term(), market_overview()]
}

fn widget(kind: WidgetKind, title: &str, config: WidgetConfig, position: Position) -> (WidgetDraft, Position) {
    (WidgetDraft::new(kind, title, config), position)
}

fn chart(symbol: &str, interval: &str) -> WidgetConfig {
    WidgetConfig::for_symbol(symbol).with_interval(interval)
}

fn day_trader() -> DashboardTemplate {
    DashboardTemplate {
        id: "day-trader",
        name: "Day Trader",
        description: "Real-time monitoring for active traders",
        widgets: vec![
            widget(WidgetKind::Live, "AAPL Live", WidgetConfig::for_symbol("AAPL"), Position::new(0, 0, 3, 3)),
            widget(WidgetKind::Live, "TSLA Live", WidgetConfig::for_symbol("TSLA"), Position::new(3, 0, 3, 3)),
            widget(WidgetKind::Chart, "NVDA Chart", chart("NVDA", "5"), Position::new(6, 0, 6, 4)),
            widget(WidgetKind::Table, "Watchlist", WidgetConfig::default(), Position::new(0, 3, 6, 4)),
        ],
    }
}

fn long_term() -> DashboardTemplate {
    DashboardTemplate {
        id: "long-term",
        name: "Long-term Investor",
        description: "Track portfolio performance and market trends",
        widgets: vec![
            widget(WidgetKind::Cards, "Portfolio Summary", WidgetConfig::default(), Position::new(0, 0, 12, 3)),
            widget(WidgetKind::Chart, "S&P 500 Trend", chart("SPY", "W"), Position::new(0, 3, 6, 4)),
            widget(WidgetKind::Table, "My Holdings", WidgetConfig::default(), Position::new(6, 3, 6, 4)),
        ],
    }
}

fn market_overview() -> DashboardTemplate {
    DashboardTemplate {
        id: "market-overview",
        name: "Market Overview",
        description: "General market monitoring dashboard",
        widgets: vec![
            widget(WidgetKind::Cards, "Market Status", WidgetConfig::default(), Position::new(0, 0, 12, 3)),
            widget(WidgetKind::Chart, "NASDAQ", chart("QQQ", "D"), Position::new(0, 3, 6, 4)),
            widget(WidgetKind::Chart, "DOW JONES", chart("DIA", "D"), Position::new(6, 3, 6, 4)),
            widget(WidgetKind::Table, "Top Movers", WidgetConfig::default(), Position::new(0, 7, 12, 4)),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_id_resolves() {
        for id in TEMPLATE_IDS {
            let template = find(id).unwrap();
            assert_eq!(template.id, id);
            assert!(!template.widgets.is_empty());
        }
        assert_eq!(all().len(), TEMPLATE_IDS.len());
    }

    #[test]
    fn unknown_template_is_none() {
        assert!(find("swing-trader").is_none());
    }

    #[test]
    fn day_trader_streams_two_symbols() {
        let template = find("day-trader").unwrap();
        let live: Vec<_> = template
            .widgets
            .iter()
            .filter(|(draft, _)| draft.kind.is_streaming())
            .filter_map(|(draft, _)| draft.config.symbol.clone())
            .collect();
        assert_eq!(live, vec!["AAPL".to_string(), "TSLA".to_string()]);
    }
}

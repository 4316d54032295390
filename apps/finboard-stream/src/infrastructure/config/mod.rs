//! Configuration Module
//!
//! Settings for the feed, the quote service, the dashboard and the health
//! server, loaded from environment variables.

mod settings;

pub use settings::{
    ApiToken, AppConfig, ConfigError, DashboardSettings, FeedSettings, QuoteSettings,
    ServerSettings,
};

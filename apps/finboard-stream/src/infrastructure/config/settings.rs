//! Finboard Configuration Settings
//!
//! Configuration types for the stream service, loaded from environment
//! variables. Unparseable numbers fall back to their defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::domain::connection::reconnect::{
    DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_DELAY, ReconnectConfig,
};
use crate::domain::widget::templates;
use crate::infrastructure::finnhub::cache::DEFAULT_CACHE_TTL;
use crate::infrastructure::finnhub::quotes::{
    DEFAULT_HTTP_TIMEOUT, DEFAULT_REST_URL, PLACEHOLDER_TOKEN, QuoteServiceConfig,
};
use crate::infrastructure::finnhub::stream::{DEFAULT_SETTLE_DELAY, StreamConfig};
use crate::infrastructure::finnhub::transport::DEFAULT_WS_URL;
use crate::infrastructure::storage::DEFAULT_DASHBOARD_PATH;

/// Finnhub API key.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    /// Wrap a token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the token is missing or the `demo` placeholder.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.0.is_empty() || self.0 == PLACEHOLDER_TOKEN
    }
}

impl Default for ApiToken {
    fn default() -> Self {
        Self::new(PLACEHOLDER_TOKEN)
    }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_placeholder() {
            f.debug_tuple("ApiToken").field(&self.0).finish()
        } else {
            f.debug_tuple("ApiToken").field(&"[REDACTED]").finish()
        }
    }
}

/// Trade stream settings.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    /// WebSocket endpoint.
    pub ws_url: String,
    /// Delay before each reconnection attempt.
    pub reconnect_delay: Duration,
    /// Reconnection attempts before giving up (0 = unlimited).
    pub max_reconnect_attempts: u32,
    /// Wait after the handshake before replaying subscriptions.
    pub settle_delay: Duration,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_URL.to_string(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

/// REST quote service settings.
#[derive(Debug, Clone)]
pub struct QuoteSettings {
    /// REST base URL.
    pub rest_url: String,
    /// Response cache lifetime.
    pub cache_ttl: Duration,
    /// Per-request timeout.
    pub http_timeout: Duration,
}

impl Default for QuoteSettings {
    fn default() -> Self {
        Self {
            rest_url: DEFAULT_REST_URL.to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

/// Dashboard persistence settings.
#[derive(Debug, Clone)]
pub struct DashboardSettings {
    /// Dashboard JSON file.
    pub path: PathBuf,
    /// Template to load when the stored dashboard has no widgets.
    pub template: Option<String>,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DASHBOARD_PATH),
            template: None,
        }
    }
}

/// Server port settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Health check HTTP port.
    pub health_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { health_port: 8083 }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Finnhub API key.
    pub token: ApiToken,
    /// Trade stream settings.
    pub feed: FeedSettings,
    /// Quote service settings.
    pub quotes: QuoteSettings,
    /// Dashboard settings.
    pub dashboard: DashboardSettings,
    /// Server port settings.
    pub server: ServerSettings,
}

impl AppConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a URL is empty or `FINBOARD_TEMPLATE` names an
    /// unknown template.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a URL is empty or `FINBOARD_TEMPLATE` names an
    /// unknown template.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Lookup(lookup);

        let token = env
            .get("FINNHUB_API_KEY")
            .map_or_else(ApiToken::default, ApiToken::new);

        let feed_defaults = FeedSettings::default();
        let feed = FeedSettings {
            ws_url: env.url("FINBOARD_WS_URL", feed_defaults.ws_url)?,
            reconnect_delay: env.millis("FINBOARD_RECONNECT_DELAY_MS", feed_defaults.reconnect_delay),
            max_reconnect_attempts: env.parse(
                "FINBOARD_MAX_RECONNECT_ATTEMPTS",
                feed_defaults.max_reconnect_attempts,
            ),
            settle_delay: env.millis("FINBOARD_SETTLE_DELAY_MS", feed_defaults.settle_delay),
        };

        let quote_defaults = QuoteSettings::default();
        let quotes = QuoteSettings {
            rest_url: env.url("FINBOARD_REST_URL", quote_defaults.rest_url)?,
            cache_ttl: env.secs("FINBOARD_CACHE_TTL_SECS", quote_defaults.cache_ttl),
            http_timeout: env.secs("FINBOARD_HTTP_TIMEOUT_SECS", quote_defaults.http_timeout),
        };

        let template = env.get("FINBOARD_TEMPLATE").filter(|t| !t.is_empty());
        if let Some(id) = &template
            && templates::find(id).is_none()
        {
            return Err(ConfigError::UnknownTemplate(id.clone()));
        }

        let dashboard = DashboardSettings {
            path: env
                .get("FINBOARD_DASHBOARD_PATH")
                .filter(|p| !p.is_empty())
                .map_or_else(|| DashboardSettings::default().path, PathBuf::from),
            template,
        };

        let server = ServerSettings {
            health_port: env.parse("FINBOARD_HEALTH_PORT", ServerSettings::default().health_port),
        };

        Ok(Self {
            token,
            feed,
            quotes,
            dashboard,
            server,
        })
    }

    /// Stream manager configuration.
    #[must_use]
    pub const fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            reconnect: ReconnectConfig::new(
                self.feed.reconnect_delay,
                self.feed.max_reconnect_attempts,
            ),
            settle_delay: self.feed.settle_delay,
        }
    }

    /// Quote service configuration.
    #[must_use]
    pub fn quote_service_config(&self) -> QuoteServiceConfig {
        QuoteServiceConfig {
            base_url: self.quotes.rest_url.clone(),
            token: Some(self.token.expose().to_string()),
            cache_ttl: self.quotes.cache_ttl,
            timeout: self.quotes.http_timeout,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// `FINBOARD_TEMPLATE` names no built-in template.
    #[error("unknown dashboard template: {0}")]
    UnknownTemplate(String),
}

struct Lookup<F>(F);

impl<F: Fn(&str) -> Option<String>> Lookup<F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    fn parse<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    fn millis(&self, key: &str, default: Duration) -> Duration {
        self.get(key)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map_or(default, Duration::from_millis)
    }

    fn secs(&self, key: &str, default: Duration) -> Duration {
        self.get(key)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map_or(default, Duration::from_secs)
    }

    fn url(&self, key: &str, default: String) -> Result<String, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(v) if v.trim().is_empty() => Err(ConfigError::EmptyValue(key.to_string())),
            Some(v) => Ok(v.trim().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = AppConfig::from_lookup(|_| None).unwrap();

        assert!(config.token.is_placeholder());
        assert_eq!(config.feed.ws_url, "wss://ws.finnhub.io");
        assert_eq!(config.feed.reconnect_delay, Duration::from_millis(3000));
        assert_eq!(config.feed.max_reconnect_attempts, 5);
        assert_eq!(config.feed.settle_delay, Duration::from_millis(100));
        assert_eq!(config.quotes.rest_url, "https://finnhub.io/api/v1");
        assert_eq!(config.quotes.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.quotes.http_timeout, Duration::from_secs(5));
        assert_eq!(config.server.health_port, 8083);
        assert_eq!(config.dashboard.path, PathBuf::from("finboard-dashboard.json"));
        assert!(config.dashboard.template.is_none());
    }

    #[test]
    fn overrides_from_environment() {
        let config = AppConfig::from_lookup(lookup(&[
            ("FINNHUB_API_KEY", "secret-key"),
            ("FINBOARD_RECONNECT_DELAY_MS", "250"),
            ("FINBOARD_MAX_RECONNECT_ATTEMPTS", "2"),
            ("FINBOARD_HEALTH_PORT", "9000"),
            ("FINBOARD_TEMPLATE", "day-trader"),
        ]))
        .unwrap();

        assert!(!config.token.is_placeholder());
        assert_eq!(config.token.expose(), "secret-key");
        assert_eq!(
            config.stream_config().reconnect,
            ReconnectConfig::new(Duration::from_millis(250), 2)
        );
        assert_eq!(config.server.health_port, 9000);
        assert_eq!(config.dashboard.template.as_deref(), Some("day-trader"));
        assert_eq!(
            config.quote_service_config().token.as_deref(),
            Some("secret-key")
        );
    }

    #[test]
    fn unparseable_numbers_fall_back() {
        let config = AppConfig::from_lookup(lookup(&[
            ("FINBOARD_RECONNECT_DELAY_MS", "soon"),
            ("FINBOARD_HEALTH_PORT", "99999"),
        ]))
        .unwrap();

        assert_eq!(config.feed.reconnect_delay, Duration::from_millis(3000));
        assert_eq!(config.server.health_port, 8083);
    }

    #[test]
    fn empty_url_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("FINBOARD_WS_URL", " ")])).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyValue(key) if key == "FINBOARD_WS_URL"));
    }

    #[test]
    fn unknown_template_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("FINBOARD_TEMPLATE", "swing")])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTemplate(id) if id == "swing"));
    }

    #[test]
    fn token_redacted_debug() {
        let token = ApiToken::new("key123");
        let debug = format!("{token:?}");
        assert!(!debug.contains("key123"));
        assert!(debug.contains("[REDACTED]"));
    }
}

//! Finnhub REST Quote Service
//!
//! Point-in-time quotes, company profiles, daily candles and market news.
//!
//! Every response is cached for a short time. Without a real API key the
//! service never touches the network and serves synthesized data; with one,
//! any failure (transport error, timeout, HTTP error status, or a payload
//! that carries no data) falls back to synthesized data as well.
//!
//! # Endpoints
//!
//! - `GET /quote?symbol=`
//! - `GET /stock/profile2?symbol=`
//! - `GET /stock/candle?symbol=&resolution=&from=&to=`
//! - `GET /news?category=`

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use super::cache::{DEFAULT_CACHE_TTL, TtlCache};
use super::synthetic;
use crate::domain::streaming::Symbol;
use crate::infrastructure::metrics::{self, QuoteSource};

/// Default Finnhub REST base URL.
pub const DEFAULT_REST_URL: &str = "https://finnhub.io/api/v1";

/// Default per-request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Token value that means "no API key".
pub const PLACEHOLDER_TOKEN: &str = "demo";

// =============================================================================
// Response Types
// =============================================================================

fn null_as_zero<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Decimal>::deserialize(deserializer)?.unwrap_or_default())
}

/// Point-in-time quote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Current price.
    #[serde(rename = "c", deserialize_with = "null_as_zero")]
    pub current: Decimal,
    /// Change from previous close.
    #[serde(rename = "d", default, deserialize_with = "null_as_zero")]
    pub change: Decimal,
    /// Percent change from previous close.
    #[serde(rename = "dp", default, deserialize_with = "null_as_zero")]
    pub percent_change: Decimal,
    /// Session high.
    #[serde(rename = "h", default, deserialize_with = "null_as_zero")]
    pub high: Decimal,
    /// Session low.
    #[serde(rename = "l", default, deserialize_with = "null_as_zero")]
    pub low: Decimal,
    /// Session open.
    #[serde(rename = "o", default, deserialize_with = "null_as_zero")]
    pub open: Decimal,
    /// Previous close.
    #[serde(rename = "pc", default, deserialize_with = "null_as_zero")]
    pub previous_close: Decimal,
}

impl Quote {
    /// Finnhub answers unknown symbols with an all-zero quote.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.current.is_zero()
    }
}

/// Quote tagged with its symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolQuote {
    /// Symbol.
    pub symbol: Symbol,
    /// Quote.
    #[serde(flatten)]
    pub quote: Quote,
}

/// Company profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompanyProfile {
    /// Company name.
    pub name: String,
    /// Ticker.
    pub ticker: String,
    /// Listing exchange.
    pub exchange: String,
    /// Country of incorporation.
    pub country: String,
    /// Reporting currency.
    pub currency: String,
    /// Market capitalization in millions.
    pub market_capitalization: f64,
    /// Industry classification.
    #[serde(rename = "finnhubIndustry")]
    pub industry: String,
    /// IPO date.
    pub ipo: String,
    /// Logo URL.
    pub logo: String,
    /// Website.
    pub weburl: String,
}

impl CompanyProfile {
    /// Finnhub answers unknown symbols with an empty object.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
    }
}

/// OHLCV candle series, column-oriented as the API returns it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandleSeries {
    /// Close prices.
    #[serde(rename = "c")]
    pub close: Vec<Decimal>,
    /// High prices.
    #[serde(rename = "h")]
    pub high: Vec<Decimal>,
    /// Low prices.
    #[serde(rename = "l")]
    pub low: Vec<Decimal>,
    /// Open prices.
    #[serde(rename = "o")]
    pub open: Vec<Decimal>,
    /// Candle start times, unix seconds.
    #[serde(rename = "t")]
    pub timestamps: Vec<i64>,
    /// Volumes.
    #[serde(rename = "v")]
    pub volume: Vec<Decimal>,
    /// `ok` or `no_data`.
    #[serde(rename = "s")]
    pub status: String,
}

impl CandleSeries {
    /// Whether the API reported data.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    /// Number of candles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether the series has no candles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Most recent close.
    #[must_use]
    pub fn last_close(&self) -> Option<Decimal> {
        self.close.last().copied()
    }
}

/// Market news article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsArticle {
    /// Article id.
    pub id: i64,
    /// News category.
    pub category: String,
    /// Publication time, unix seconds.
    pub datetime: i64,
    /// Headline.
    pub headline: String,
    /// Thumbnail URL.
    pub image: String,
    /// Related symbols.
    pub related: String,
    /// Publisher.
    pub source: String,
    /// Summary.
    pub summary: String,
    /// Article URL.
    pub url: String,
}

// =============================================================================
// Errors
// =============================================================================

/// Quote service error.
///
/// Never returned to callers of the data methods, which fall back to
/// synthesized data; it is logged when a fallback happens.
#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    /// Request failed, timed out, returned an error status or an
    /// undecodable body.
    #[error("quote API request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The response decoded but carried no data.
    #[error("quote API returned no data: {0}")]
    InvalidPayload(&'static str),
}

// =============================================================================
// Service
// =============================================================================

/// Quote service configuration.
#[derive(Debug, Clone)]
pub struct QuoteServiceConfig {
    /// REST base URL, without trailing slash.
    pub base_url: String,
    /// API key. `None`, empty, or `demo` selects synthetic mode.
    pub token: Option<String>,
    /// How long responses stay cached.
    pub cache_ttl: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for QuoteServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_REST_URL.to_string(),
            token: None,
            cache_ttl: DEFAULT_CACHE_TTL,
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

/// Cached Finnhub REST client with synthetic fallback.
pub struct QuoteService {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    quotes: TtlCache<Quote>,
    profiles: TtlCache<CompanyProfile>,
    candles: TtlCache<CandleSeries>,
    news: TtlCache<Vec<NewsArticle>>,
}

impl std::fmt::Debug for QuoteService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuoteService")
            .field("base_url", &self.base_url)
            .field("synthetic", &self.is_synthetic())
            .finish_non_exhaustive()
    }
}

impl QuoteService {
    /// Create a quote service.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: QuoteServiceConfig) -> Result<Self, QuoteError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        let token = config
            .token
            .filter(|t| !t.is_empty() && t != PLACEHOLDER_TOKEN);
        if token.is_none() {
            tracing::info!("No Finnhub API key configured; serving synthetic market data");
        }

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token,
            quotes: TtlCache::new(config.cache_ttl),
            profiles: TtlCache::new(config.cache_ttl),
            candles: TtlCache::new(config.cache_ttl),
            news: TtlCache::new(config.cache_ttl),
        })
    }

    /// Whether the service serves synthesized data only.
    #[must_use]
    pub const fn is_synthetic(&self) -> bool {
        self.token.is_none()
    }

    /// Current quote for `symbol`.
    pub async fn quote(&self, symbol: &str) -> Quote {
        self.resolve(
            &self.quotes,
            format!("quote-{symbol}"),
            "quote",
            move || async move {
                let quote: Quote = self.fetch("/quote", &[("symbol", symbol.to_string())]).await?;
                if quote.is_valid() {
                    Ok(quote)
                } else {
                    Err(QuoteError::InvalidPayload("quote has no current price"))
                }
            },
            move || synthetic::quote(symbol, &mut rand::rng()),
        )
        .await
    }

    /// Company profile for `symbol`.
    pub async fn profile(&self, symbol: &str) -> CompanyProfile {
        self.resolve(
            &self.profiles,
            format!("profile-{symbol}"),
            "profile",
            move || async move {
                let profile: CompanyProfile = self
                    .fetch("/stock/profile2", &[("symbol", symbol.to_string())])
                    .await?;
                if profile.is_valid() {
                    Ok(profile)
                } else {
                    Err(QuoteError::InvalidPayload("profile has no name"))
                }
            },
            move || synthetic::profile(symbol, &mut rand::rng()),
        )
        .await
    }

    /// Candles for `symbol` at `resolution` between `from` and `to` (unix
    /// seconds).
    pub async fn candles(&self, symbol: &str, resolution: &str, from: i64, to: i64) -> CandleSeries {
        self.resolve(
            &self.candles,
            format!("candles-{symbol}-{resolution}-{from}-{to}"),
            "candles",
            move || async move {
                let series: CandleSeries = self
                    .fetch(
                        "/stock/candle",
                        &[
                            ("symbol", symbol.to_string()),
                            ("resolution", resolution.to_string()),
                            ("from", from.to_string()),
                            ("to", to.to_string()),
                        ],
                    )
                    .await?;
                if series.is_ok() {
                    Ok(series)
                } else {
                    Err(QuoteError::InvalidPayload("candle status is not ok"))
                }
            },
            move || {
                synthetic::candles(
                    symbol,
                    synthetic::candle_days(from, to),
                    Utc::now(),
                    &mut rand::rng(),
                )
            },
        )
        .await
    }

    /// Latest market news in `category` (`general`, `forex`, `crypto`,
    /// `merger`).
    ///
    /// There is no synthetic news: synthetic mode and failures both yield an
    /// empty list, which is not cached.
    pub async fn market_news(&self, category: &str) -> Vec<NewsArticle> {
        let key = format!("news-{category}");
        if let Some(hit) = self.news.get(&key) {
            metrics::record_quote_request("news", QuoteSource::Cache);
            return hit;
        }

        if self.is_synthetic() {
            metrics::record_quote_request("news", QuoteSource::Synthetic);
            return Vec::new();
        }

        match self
            .fetch::<Vec<NewsArticle>>("/news", &[("category", category.to_string())])
            .await
        {
            Ok(articles) => {
                metrics::record_quote_request("news", QuoteSource::Upstream);
                self.news.insert(key, articles.clone());
                articles
            }
            Err(e) => {
                tracing::warn!(category, error = %e, "News API failed; returning no articles");
                metrics::record_quote_request("news", QuoteSource::Synthetic);
                Vec::new()
            }
        }
    }

    /// Quotes for several symbols, fetched concurrently, in input order.
    pub async fn quotes(&self, symbols: &[Symbol]) -> Vec<SymbolQuote> {
        let quotes = futures::future::join_all(symbols.iter().map(|s| self.quote(s))).await;
        symbols
            .iter()
            .cloned()
            .zip(quotes)
            .map(|(symbol, quote)| SymbolQuote { symbol, quote })
            .collect()
    }

    async fn resolve<T, F, Fut>(
        &self,
        cache: &TtlCache<T>,
        key: String,
        endpoint: &'static str,
        fetch: F,
        synthesize: impl FnOnce() -> T,
    ) -> T
    where
        T: Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, QuoteError>>,
    {
        if let Some(hit) = cache.get(&key) {
            metrics::record_quote_request(endpoint, QuoteSource::Cache);
            return hit;
        }

        let (data, source) = if self.is_synthetic() {
            (synthesize(), QuoteSource::Synthetic)
        } else {
            match fetch().await {
                Ok(data) => (data, QuoteSource::Upstream),
                Err(e) => {
                    tracing::warn!(endpoint, key = %key, error = %e, "Quote API failed; using synthetic data");
                    (synthesize(), QuoteSource::Synthetic)
                }
            }
        };

        metrics::record_quote_request(endpoint, source);
        cache.insert(key, data.clone());
        data
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, QuoteError> {
        let token = self.token.as_deref().unwrap_or_default();
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .query(params)
            .query(&[("token", token)])
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<T>().await?)
    }
}

//! Market Data Streaming Types
//!
//! Codec-agnostic representation of the data flowing out of the trade feed.
//! Wire formats live in `infrastructure::finnhub::messages` and convert into
//! these types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// A ticker symbol. Case-sensitive: `AAPL` and `aapl` are different keys.
pub type Symbol = String;

/// A single executed trade reported by the upstream feed.
///
/// Trade events are ephemeral: they are handed to every listener of the
/// symbol and then dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradeEvent {
    /// Instrument symbol.
    pub symbol: Symbol,
    /// Execution price.
    pub price: Decimal,
    /// Executed volume.
    pub volume: Decimal,
    /// Exchange timestamp.
    pub timestamp: DateTime<Utc>,
    /// Trade condition codes, if the feed supplied any.
    pub conditions: Vec<String>,
}

impl TradeEvent {
    /// Create a trade event without condition codes.
    #[must_use]
    pub fn new(
        symbol: impl Into<Symbol>,
        price: Decimal,
        volume: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            volume,
            timestamp,
            conditions: Vec::new(),
        }
    }
}

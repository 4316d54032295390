//! Finnhub WebSocket Message Types
//!
//! Wire format types for the Finnhub trade stream.
//!
//! # Inbound
//!
//! - `{"type":"trade","data":[{"s":"AAPL","p":178.5,"v":100,"t":1700000000000,"c":["1"]}]}`
//! - `{"type":"ping"}`
//! - `{"type":"error","msg":"Invalid symbol"}`
//!
//! # Outbound
//!
//! - `{"type":"subscribe","symbol":"AAPL"}`
//! - `{"type":"unsubscribe","symbol":"AAPL"}`
//! - `{"type":"pong"}`
//!
//! # References
//!
//! - [Finnhub WebSocket Trades](https://finnhub.io/docs/api/websocket-trades)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::streaming::{Symbol, TradeEvent};

// =============================================================================
// Inbound Messages
// =============================================================================

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedMessage {
    /// Trade batch.
    Trades {
        /// Well-formed trades, in feed order.
        trades: Vec<TradeMessage>,
        /// Entries of the batch that could not be decoded.
        rejected: usize,
    },
    /// Liveness probe; must be answered with a pong.
    Ping,
    /// Error reported by the feed (bad symbol, bad token, rate limit).
    Error(ErrorMessage),
    /// Any other message type.
    Unknown(String),
}

/// One trade in a trade batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeMessage {
    /// Symbol.
    #[serde(rename = "s")]
    pub symbol: Symbol,
    /// Last price.
    #[serde(rename = "p")]
    pub price: Decimal,
    /// Volume.
    #[serde(rename = "v")]
    pub volume: Decimal,
    /// Timestamp in epoch milliseconds.
    #[serde(rename = "t", with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Trade conditions.
    #[serde(rename = "c", default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<String>>,
}

impl From<TradeMessage> for TradeEvent {
    fn from(msg: TradeMessage) -> Self {
        Self {
            symbol: msg.symbol,
            price: msg.price,
            volume: msg.volume,
            timestamp: msg.timestamp,
            conditions: msg.conditions.unwrap_or_default(),
        }
    }
}

/// Error reported by the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// Human-readable reason.
    #[serde(default)]
    pub msg: String,
}

// =============================================================================
// Outbound Messages
// =============================================================================

/// Control message sent to the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    /// Start receiving trades for a symbol.
    Subscribe {
        /// Symbol.
        symbol: Symbol,
    },
    /// Stop receiving trades for a symbol.
    Unsubscribe {
        /// Symbol.
        symbol: Symbol,
    },
    /// Answer to a ping.
    Pong,
}

impl ControlMessage {
    /// Subscribe request for `symbol`.
    #[must_use]
    pub fn subscribe(symbol: impl Into<Symbol>) -> Self {
        Self::Subscribe {
            symbol: symbol.into(),
        }
    }

    /// Unsubscribe request for `symbol`.
    #[must_use]
    pub fn unsubscribe(symbol: impl Into<Symbol>) -> Self {
        Self::Unsubscribe {
            symbol: symbol.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_messages_match_wire_format() {
        assert_eq!(
            serde_json::to_string(&ControlMessage::subscribe("AAPL")).unwrap(),
            r#"{"type":"subscribe","symbol":"AAPL"}"#
        );
        assert_eq!(
            serde_json::to_string(&ControlMessage::unsubscribe("BINANCE:BTCUSDT")).unwrap(),
            r#"{"type":"unsubscribe","symbol":"BINANCE:BTCUSDT"}"#
        );
        assert_eq!(
            serde_json::to_string(&ControlMessage::Pong).unwrap(),
            r#"{"type":"pong"}"#
        );
    }

    #[test]
    fn trade_message_converts_to_event() {
        let json = r#"{"s":"AAPL","p":178.5,"v":100,"t":1700000000123,"c":["1","12"]}"#;
        let msg: TradeMessage = serde_json::from_str(json).unwrap();
        let event = TradeEvent::from(msg);

        assert_eq!(event.symbol, "AAPL");
        assert_eq!(event.price, Decimal::new(1785, 1));
        assert_eq!(event.volume, Decimal::from(100));
        assert_eq!(event.timestamp.timestamp_millis(), 1_700_000_000_123);
        assert_eq!(event.conditions, vec!["1".to_string(), "12".to_string()]);
    }

    #[test]
    fn null_conditions_are_empty() {
        let json = r#"{"s":"TSLA","p":242.6,"v":0.5,"t":0,"c":null}"#;
        let event = TradeEvent::from(serde_json::from_str::<TradeMessage>(json).unwrap());
        assert!(event.conditions.is_empty());
    }
}

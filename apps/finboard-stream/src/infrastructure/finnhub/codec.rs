//! Feed Codec
//!
//! JSON encoding and decoding for the Finnhub trade stream. Frames are single
//! JSON objects discriminated by their `type` field.

use serde_json::Value;

use super::messages::{ControlMessage, ErrorMessage, FeedMessage, TradeMessage};

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// The frame is valid JSON but not a feed message.
    #[error("invalid message format: {0}")]
    InvalidFormat(String),
}

/// JSON codec for the trade stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct FeedCodec;

impl FeedCodec {
    /// Create a new codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode one text frame.
    ///
    /// Inside a trade batch, entries that fail to decode are skipped and
    /// counted in [`FeedMessage::Trades::rejected`]; the rest of the batch is
    /// kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a JSON object with a string
    /// `type` field.
    pub fn decode(&self, text: &str) -> Result<FeedMessage, CodecError> {
        let mut value: Value = serde_json::from_str(text)?;

        let msg_type = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                CodecError::InvalidFormat(format!(
                    "missing type field: {}",
                    text.chars().take(50).collect::<String>()
                ))
            })?
            .to_string();

        match msg_type.as_str() {
            "trade" => Ok(Self::decode_trades(value.get_mut("data").map(Value::take))),
            "ping" => Ok(FeedMessage::Ping),
            "error" => Ok(FeedMessage::Error(serde_json::from_value::<ErrorMessage>(value)?)),
            _ => Ok(FeedMessage::Unknown(msg_type)),
        }
    }

    fn decode_trades(data: Option<Value>) -> FeedMessage {
        let entries = match data {
            Some(Value::Array(entries)) => entries,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => {
                return FeedMessage::Trades {
                    trades: Vec::new(),
                    rejected: 1,
                };
            }
        };

        let mut trades = Vec::with_capacity(entries.len());
        let mut rejected = 0;
        for entry in entries {
            match serde_json::from_value::<TradeMessage>(entry) {
                Ok(trade) => trades.push(trade),
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping malformed trade entry");
                    rejected += 1;
                }
            }
        }

        FeedMessage::Trades { trades, rejected }
    }

    /// Encode a control message.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode(&self, msg: &ControlMessage) -> Result<String, CodecError> {
        Ok(serde_json::to_string(msg)?)
    }
}

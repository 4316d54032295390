//! Finnhub Adapters
//!
//! - **Trade stream**: reconnecting WebSocket connection with per-symbol
//!   listener fan-out (`stream`, `transport`, `codec`, `messages`)
//! - **Quote service**: cached REST client with synthetic fallback
//!   (`quotes`, `cache`, `synthetic`)

pub mod cache;
pub mod codec;
pub mod messages;
pub mod quotes;
pub mod stream;
pub mod synthetic;
pub mod transport;

pub use cache::TtlCache;
pub use codec::{CodecError, FeedCodec};
pub use messages::{ControlMessage, ErrorMessage, FeedMessage, TradeMessage};
pub use quotes::{
    CandleSeries, CompanyProfile, NewsArticle, Quote, QuoteError, QuoteService,
    QuoteServiceConfig, SymbolQuote,
};
pub use stream::{StreamConfig, StreamManager, SubscriptionHandle, TradeStream};
pub use transport::WebSocketTransport;

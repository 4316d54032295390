//! WebSocket Feed Transport
//!
//! [`FeedTransport`] adapter over `tokio-tungstenite`. Each opened link gets a
//! pump task that copies text frames between the socket and the link,
//! answers protocol-level pings, and closes the socket once the link is
//! dropped.
//!
//! # Stream URL
//!
//! - Production: `wss://ws.finnhub.io?token=<api key>`

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::application::ports::{FeedLink, FeedLinkPeer, FeedTransport, TransportError};

/// Default Finnhub WebSocket endpoint.
pub const DEFAULT_WS_URL: &str = "wss://ws.finnhub.io";

/// WebSocket transport for the Finnhub trade stream.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    url: String,
}

impl WebSocketTransport {
    /// Create a transport for the endpoint at `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    fn authenticated_url(&self, token: &str) -> Result<Url, TransportError> {
        let mut url =
            Url::parse(&self.url).map_err(|e| TransportError::InvalidUrl(format!("{}: {e}", self.url)))?;
        url.query_pairs_mut().append_pair("token", token);
        Ok(url)
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new(DEFAULT_WS_URL)
    }
}

#[async_trait]
impl FeedTransport for WebSocketTransport {
    async fn open(&self, token: &str) -> Result<FeedLink, TransportError> {
        let url = self.authenticated_url(token)?;
        tracing::debug!(url = %self.url, "Opening feed WebSocket");

        let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        let (link, peer) = FeedLink::pair();
        tokio::spawn(pump(ws_stream, peer));
        Ok(link)
    }
}

async fn pump(ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>, mut peer: FeedLinkPeer) {
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            frame = peer.outbound.recv() => {
                if let Some(text) = frame {
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        tracing::warn!(error = %e, "Failed to write to feed socket");
                        break;
                    }
                } else {
                    tracing::debug!("Feed link dropped; closing socket");
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            }
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if peer.inbound.send(text.as_str().to_owned()).is_err() {
                            let _ = write.send(Message::Close(None)).await;
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = write.send(Message::Pong(data)).await {
                            tracing::warn!(error = %e, "Failed to answer socket ping");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(?frame, "Feed sent close frame");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Feed socket error");
                        break;
                    }
                    None => {
                        tracing::info!("Feed socket ended");
                        break;
                    }
                }
            }
        }
    }
}

//! Feed Transport Port (Driven Port)
//!
//! Interface for opening a link to the upstream trade feed. The stream
//! manager only ever sees text frames; socket handling, TLS and protocol
//! pings belong to the adapter.

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Feed transport error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The handshake could not be completed.
    #[error("feed connection failed: {0}")]
    ConnectionFailed(String),

    /// The feed endpoint URL is invalid.
    #[error("invalid feed url: {0}")]
    InvalidUrl(String),
}

/// An open, bidirectional link to the feed.
///
/// Dropping the link closes the underlying connection. The link is lost when
/// [`FeedLink::recv`] returns `None`.
#[derive(Debug)]
pub struct FeedLink {
    outbound: mpsc::UnboundedSender<String>,
    inbound: mpsc::UnboundedReceiver<String>,
}

/// The adapter's side of a [`FeedLink`].
#[derive(Debug)]
pub struct FeedLinkPeer {
    /// Frames the manager sent, to be written to the socket.
    pub outbound: mpsc::UnboundedReceiver<String>,
    /// Frames read from the socket, to be handed to the manager.
    pub inbound: mpsc::UnboundedSender<String>,
}

impl FeedLink {
    /// Create a connected link and peer.
    #[must_use]
    pub fn pair() -> (Self, FeedLinkPeer) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        (
            Self {
                outbound: outbound_tx,
                inbound: inbound_rx,
            },
            FeedLinkPeer {
                outbound: outbound_rx,
                inbound: inbound_tx,
            },
        )
    }

    /// Queue a text frame. Returns `false` if the peer is gone.
    pub fn send(&self, frame: String) -> bool {
        self.outbound.send(frame).is_ok()
    }

    /// Next inbound text frame, or `None` once the link is lost.
    pub async fn recv(&mut self) -> Option<String> {
        self.inbound.recv().await
    }
}

/// Port for connecting to the trade feed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// Open a new link, authenticating with `token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the handshake fails.
    async fn open(&self, token: &str) -> Result<FeedLink, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn link_relays_both_directions() {
        let (mut link, mut peer) = FeedLink::pair();

        assert!(link.send("hello".to_string()));
        assert_eq!(peer.outbound.recv().await.as_deref(), Some("hello"));

        peer.inbound.send("world".to_string()).unwrap();
        assert_eq!(link.recv().await.as_deref(), Some("world"));
    }

    #[tokio::test]
    async fn dropping_peer_loses_link() {
        let (mut link, peer) = FeedLink::pair();
        drop(peer);

        assert!(!link.send("late".to_string()));
        assert_eq!(link.recv().await, None);
    }
}

//! Trade Stream Manager
//!
//! Owns the single connection to the Finnhub trade stream and fans trade
//! events out to per-symbol listeners.
//!
//! # Architecture
//!
//! ```text
//!  StreamManager (Clone) ──commands──► FeedDriver task ──frames──► FeedLink
//!        │                                 │
//!        └──── Arc<Mutex<Registry>> ◄──────┘ (snapshot, dispatch)
//! ```
//!
//! Every public method on [`StreamManager`] returns immediately. Registry
//! changes take effect at once; anything touching the connection is queued
//! to the driver, which is the only place connection state changes. The
//! driver reconciles the symbols subscribed upstream against the registry,
//! so the feed never sees a duplicate subscribe or unsubscribe.

use std::collections::HashSet;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

use super::codec::FeedCodec;
use super::messages::{ControlMessage, FeedMessage, TradeMessage};
use crate::application::ports::{FeedLink, FeedTransport, TransportError};
use crate::domain::connection::reconnect::ReconnectConfig;
use crate::domain::connection::{
    ConnectionAction, ConnectionEvent, ConnectionMachine, ConnectionState,
};
use crate::domain::streaming::{Symbol, TradeEvent};
use crate::domain::subscription::{
    ListenerId, RegistryChange, RegistryStats, SharedListener, SubscriptionRegistry,
};
use crate::infrastructure::metrics::{self, ListenerFailure};

/// Default wait between the handshake completing and replaying subscriptions.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

// =============================================================================
// Configuration
// =============================================================================

/// Stream manager configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Reconnection delay and budget.
    pub reconnect: ReconnectConfig,
    /// Wait after `Open` before replaying registry symbols upstream.
    pub settle_delay: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            reconnect: ReconnectConfig::default(),
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

// =============================================================================
// Stream Manager
// =============================================================================

#[derive(Debug)]
enum Command {
    Connect(String),
    Reconcile(Symbol),
    Disconnect,
}

/// Handle to a running trade stream.
///
/// Cloning is cheap; all clones drive the same connection and registry. The
/// driver task stops when the cancellation token fires or every handle is
/// dropped.
#[derive(Clone)]
pub struct StreamManager {
    registry: Arc<Mutex<SubscriptionRegistry>>,
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
}

impl fmt::Debug for StreamManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamManager")
            .field("state", &self.state())
            .field("registry", &*self.registry.lock())
            .finish()
    }
}

impl StreamManager {
    /// Create a manager and spawn its driver task.
    ///
    /// The manager starts [`ConnectionState::Idle`]; nothing is opened until
    /// [`StreamManager::connect`] supplies a token.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn spawn(
        config: StreamConfig,
        transport: Arc<dyn FeedTransport>,
        cancel: CancellationToken,
    ) -> Self {
        let registry = Arc::new(Mutex::new(SubscriptionRegistry::new()));
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);

        let driver = FeedDriver {
            transport,
            registry: Arc::clone(&registry),
            commands: commands_rx,
            state: state_tx,
            machine: ConnectionMachine::new(config.reconnect),
            codec: FeedCodec::new(),
            settle_delay: config.settle_delay,
            token: None,
            link: None,
            handshake: None,
            replay_at: None,
            retry_at: None,
            upstream: HashSet::new(),
            cancel,
        };
        tokio::spawn(driver.run());

        Self {
            registry,
            commands: commands_tx,
            state: state_rx,
        }
    }

    /// Open the feed connection using `token`.
    ///
    /// No-op while connecting or open. Otherwise starts a handshake with a
    /// fresh reconnect budget; `token` is reused for automatic reconnects.
    pub fn connect(&self, token: impl Into<String>) {
        self.send(Command::Connect(token.into()));
    }

    /// Register `listener` for trades of `symbol`.
    ///
    /// If this is the first listener for the symbol and the connection is
    /// open, the feed subscription is sent right away; otherwise it is sent
    /// on the next open. A manager left idle by [`StreamManager::disconnect`]
    /// reopens with the last token given to [`StreamManager::connect`].
    pub fn subscribe<F>(&self, symbol: impl Into<Symbol>, listener: F) -> SubscriptionHandle
    where
        F: Fn(&TradeEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe_listener(symbol, Arc::new(listener))
    }

    /// Register a shared listener for trades of `symbol`.
    pub fn subscribe_listener(
        &self,
        symbol: impl Into<Symbol>,
        listener: SharedListener,
    ) -> SubscriptionHandle {
        let symbol = symbol.into();
        let (registration, symbol_count) = {
            let mut registry = self.registry.lock();
            let registration = registry.register(symbol.clone(), listener);
            (registration, registry.stats().symbol_count)
        };

        tracing::debug!(symbol = %symbol, listener_id = registration.id, "Listener subscribed");

        if registration.change == RegistryChange::SymbolActivated {
            metrics::set_subscribed_symbols(symbol_count);
            self.send(Command::Reconcile(symbol.clone()));
        }

        SubscriptionHandle {
            manager: self.clone(),
            symbol,
            id: registration.id,
            active: AtomicBool::new(true),
        }
    }

    /// Subscribe to `symbol` as a stream of trade events.
    ///
    /// Dropping the stream unsubscribes. The stream ends if the manager is
    /// disconnected, since that clears every subscription.
    pub fn subscribe_stream(&self, symbol: impl Into<Symbol>) -> TradeStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = self.subscribe(symbol, move |trade: &TradeEvent| {
            tx.send(trade.clone())
                .map_err(|_| anyhow::anyhow!("trade stream receiver dropped"))
        });

        TradeStream {
            inner: UnboundedReceiverStream::new(rx),
            handle,
        }
    }

    /// Remove listener `id` from `symbol`.
    ///
    /// Removing the last listener of a symbol unsubscribes it upstream.
    /// Unknown symbols or ids are ignored.
    pub fn unsubscribe(&self, symbol: &str, id: ListenerId) {
        let (change, symbol_count) = {
            let mut registry = self.registry.lock();
            let change = registry.remove(symbol, id);
            (change, registry.stats().symbol_count)
        };

        if change == RegistryChange::SymbolDeactivated {
            tracing::debug!(symbol, "Last listener removed");
            metrics::set_subscribed_symbols(symbol_count);
            self.send(Command::Reconcile(symbol.to_string()));
        }
    }

    /// Close the connection, cancel pending timers and drop every
    /// subscription.
    pub fn disconnect(&self) {
        let cleared = self.registry.lock().clear();
        metrics::set_subscribed_symbols(0);
        tracing::info!(symbols = cleared.len(), "Disconnect requested");
        self.send(Command::Disconnect);
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver notified on every connection state change.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Registry counts.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        self.registry.lock().stats()
    }

    /// Symbols with at least one listener, sorted.
    #[must_use]
    pub fn active_symbols(&self) -> Vec<Symbol> {
        self.registry.lock().active_symbols()
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::debug!("Feed driver stopped; command dropped");
        }
    }
}

// =============================================================================
// Subscription Handle
// =============================================================================

/// Capability returned by [`StreamManager::subscribe`].
///
/// Dropping the handle does not unsubscribe.
#[derive(Debug)]
pub struct SubscriptionHandle {
    manager: StreamManager,
    symbol: Symbol,
    id: ListenerId,
    active: AtomicBool,
}

impl SubscriptionHandle {
    /// Remove the listener. Calling it again does nothing.
    pub fn unsubscribe(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            self.manager.unsubscribe(&self.symbol, self.id);
        }
    }

    /// Subscribed symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Listener id.
    #[must_use]
    pub const fn id(&self) -> ListenerId {
        self.id
    }

    /// Whether [`SubscriptionHandle::unsubscribe`] has not been called yet.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Trade events for one symbol as a [`Stream`].
#[derive(Debug)]
pub struct TradeStream {
    inner: UnboundedReceiverStream<TradeEvent>,
    handle: SubscriptionHandle,
}

impl TradeStream {
    /// Subscribed symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        self.handle.symbol()
    }
}

impl Stream for TradeStream {
    type Item = TradeEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl Drop for TradeStream {
    fn drop(&mut self) {
        self.handle.unsubscribe();
    }
}

// =============================================================================
// Feed Driver
// =============================================================================

type Handshake = JoinHandle<Result<FeedLink, TransportError>>;

struct FeedDriver {
    transport: Arc<dyn FeedTransport>,
    registry: Arc<Mutex<SubscriptionRegistry>>,
    commands: mpsc::UnboundedReceiver<Command>,
    state: watch::Sender<ConnectionState>,
    machine: ConnectionMachine,
    codec: FeedCodec,
    settle_delay: Duration,
    token: Option<String>,
    link: Option<FeedLink>,
    handshake: Option<Handshake>,
    replay_at: Option<Instant>,
    retry_at: Option<Instant>,
    upstream: HashSet<Symbol>,
    cancel: CancellationToken,
}

impl FeedDriver {
    async fn run(mut self) {
        tracing::debug!("Feed driver started");

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                command = self.commands.recv() => match command {
                    Some(command) => self.on_command(command),
                    None => break,
                },
                result = join_handshake(&mut self.handshake) => self.on_handshake(result),
                frame = recv_frame(&mut self.link) => match frame {
                    Some(text) => self.on_frame(&text),
                    None => self.on_link_lost(),
                },
                () = wait_until(self.replay_at) => {
                    self.replay_at = None;
                    self.replay();
                }
                () = wait_until(self.retry_at) => {
                    self.retry_at = None;
                    metrics::record_reconnect();
                    self.apply(ConnectionEvent::RetryTimerElapsed);
                }
            }
        }

        self.tear_down();
        tracing::debug!("Feed driver stopped");
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Connect(token) => {
                if !self.machine.state().is_active() {
                    self.token = Some(token);
                }
                self.apply(ConnectionEvent::ConnectRequested);
            }
            Command::Reconcile(symbol) => {
                if self.should_open_for(&symbol) {
                    tracing::info!(symbol = %symbol, "Opening feed for new subscription");
                    self.apply(ConnectionEvent::ConnectRequested);
                } else {
                    self.reconcile(&symbol);
                }
            }
            Command::Disconnect => self.apply(ConnectionEvent::DisconnectRequested),
        }
    }

    /// A newly wanted symbol reopens an idle feed once a token is known.
    fn should_open_for(&self, symbol: &str) -> bool {
        self.machine.state() == ConnectionState::Idle
            && self.token.is_some()
            && self.registry.lock().contains(symbol)
    }

    fn on_handshake(&mut self, result: Result<FeedLink, TransportError>) {
        match result {
            Ok(link) => {
                if self.machine.state() != ConnectionState::Connecting {
                    return;
                }
                tracing::info!("Feed connected");
                self.link = Some(link);
                self.upstream.clear();
                self.apply(ConnectionEvent::Opened);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Feed handshake failed");
                self.apply(ConnectionEvent::HandshakeFailed);
            }
        }
    }

    fn on_link_lost(&mut self) {
        tracing::warn!("Feed connection lost");
        self.link = None;
        self.upstream.clear();
        self.replay_at = None;
        self.apply(ConnectionEvent::LinkLost);
    }

    fn on_frame(&mut self, text: &str) {
        match self.codec.decode(text) {
            Ok(FeedMessage::Trades { trades, rejected }) => {
                if rejected > 0 {
                    tracing::warn!(rejected, "Dropped malformed trade entries");
                    metrics::record_malformed(rejected as u64);
                }
                self.dispatch(trades);
            }
            Ok(FeedMessage::Ping) => {
                tracing::trace!("Ping received");
                self.send(&ControlMessage::Pong);
            }
            Ok(FeedMessage::Error(error)) => {
                tracing::warn!(message = %error.msg, "Feed reported an error");
            }
            Ok(FeedMessage::Unknown(message_type)) => {
                tracing::debug!(message_type = %message_type, "Ignoring feed message");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed frame");
                metrics::record_malformed(1);
            }
        }
    }

    // -------------------------------------------------------------------------
    // State machine
    // -------------------------------------------------------------------------

    fn apply(&mut self, event: ConnectionEvent) {
        let Some(action) = self.machine.handle(event) else {
            return;
        };

        match action {
            ConnectionAction::StartHandshake => self.start_handshake(),
            ConnectionAction::ScheduleReplay => {
                self.replay_at = Some(Instant::now() + self.settle_delay);
            }
            ConnectionAction::ScheduleRetry { attempt, delay } => {
                tracing::info!(
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Scheduling feed reconnect"
                );
                self.retry_at = Some(Instant::now() + delay);
            }
            ConnectionAction::GiveUp { attempts } => {
                tracing::error!(
                    attempts,
                    "Feed reconnect budget exhausted; staying disconnected until connect is called"
                );
            }
            ConnectionAction::TearDown => self.tear_down(),
        }

        self.publish_state();
    }

    fn start_handshake(&mut self) {
        self.retry_at = None;
        self.link = None;
        if let Some(stale) = self.handshake.take() {
            stale.abort();
        }

        let transport = Arc::clone(&self.transport);
        let token = self.token.clone().unwrap_or_default();
        tracing::info!("Connecting to feed");
        self.handshake = Some(tokio::spawn(async move { transport.open(&token).await }));
    }

    fn tear_down(&mut self) {
        if let Some(handshake) = self.handshake.take() {
            handshake.abort();
        }
        self.link = None;
        self.replay_at = None;
        self.retry_at = None;
        self.upstream.clear();
    }

    fn publish_state(&self) {
        let state = self.machine.state();
        let changed = self.state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });

        if changed {
            tracing::info!(state = %state, "Feed connection state changed");
            metrics::set_connection_state(state);
        }
    }

    // -------------------------------------------------------------------------
    // Upstream subscriptions
    // -------------------------------------------------------------------------

    fn replay(&mut self) {
        let symbols = self.registry.lock().active_symbols();
        tracing::info!(symbols = symbols.len(), "Replaying subscriptions");
        for symbol in symbols {
            self.reconcile(&symbol);
        }
    }

    fn reconcile(&mut self, symbol: &str) {
        if !self.machine.state().is_open() || self.link.is_none() {
            return;
        }

        let wanted = self.registry.lock().contains(symbol);
        let subscribed = self.upstream.contains(symbol);

        let message = match (wanted, subscribed) {
            (true, false) => ControlMessage::subscribe(symbol),
            (false, true) => ControlMessage::unsubscribe(symbol),
            _ => return,
        };

        if self.send(&message) {
            if wanted {
                tracing::info!(symbol, "Subscribed upstream");
                self.upstream.insert(symbol.to_string());
            } else {
                tracing::info!(symbol, "Unsubscribed upstream");
                self.upstream.remove(symbol);
            }
        }
    }

    fn send(&self, message: &ControlMessage) -> bool {
        let Some(link) = &self.link else {
            return false;
        };

        match self.codec.encode(message) {
            Ok(frame) => {
                let sent = link.send(frame);
                if !sent {
                    tracing::debug!(?message, "Feed link closed; control message dropped");
                }
                sent
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode control message");
                false
            }
        }
    }

    // -------------------------------------------------------------------------
    // Dispatch
    // -------------------------------------------------------------------------

    fn dispatch(&self, trades: Vec<TradeMessage>) {
        metrics::record_trades_received(trades.len() as u64);

        let mut delivered = 0u64;
        for trade in trades {
            let event = TradeEvent::from(trade);
            let listeners = self.registry.lock().snapshot(&event.symbol);

            for listener in listeners {
                match catch_unwind(AssertUnwindSafe(|| listener.on_trade(&event))) {
                    Ok(Ok(())) => delivered += 1,
                    Ok(Err(e)) => {
                        tracing::warn!(symbol = %event.symbol, error = %e, "Trade listener failed");
                        metrics::record_listener_failure(ListenerFailure::Error);
                    }
                    Err(_) => {
                        tracing::error!(symbol = %event.symbol, "Trade listener panicked");
                        metrics::record_listener_failure(ListenerFailure::Panic);
                    }
                }
            }
        }

        metrics::record_trades_dispatched(delivered);
    }
}

async fn join_handshake(handshake: &mut Option<Handshake>) -> Result<FeedLink, TransportError> {
    let Some(task) = handshake.as_mut() else {
        return std::future::pending().await;
    };

    let result = task.await;
    *handshake = None;
    result.unwrap_or_else(|e| {
        Err(TransportError::ConnectionFailed(format!(
            "handshake task failed: {e}"
        )))
    })
}

async fn recv_frame(link: &mut Option<FeedLink>) -> Option<String> {
    match link {
        Some(link) => link.recv().await,
        None => std::future::pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

// =============================================================================
// Tests
// =============================================================================

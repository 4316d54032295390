//! Connection Lifecycle
//!
//! Pure state machine for the single upstream feed connection. The machine
//! performs no I/O: the feed driver feeds it [`ConnectionEvent`]s and carries
//! out the [`ConnectionAction`] it returns (start a handshake, arm a timer,
//! tear the link down).
//!
//! ```text
//!             connect                 opened
//!   Idle ───────────────► Connecting ────────► Open
//!    ▲                    ▲    │                │
//!    │ disconnect         │    │ failed         │ lost
//!    │ (from any state)   │    ▼                │
//!    │          retry     │  Closed ◄───────────┘
//!    │          timer ────┘    │
//!    │                         │ budget spent
//!    │                         ▼
//!    └──────────────────── Exhausted ── connect ──► Connecting
//! ```

pub mod reconnect;

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use self::reconnect::{ReconnectConfig, ReconnectPolicy};

// =============================================================================
// State
// =============================================================================

/// Observable state of the feed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    /// No socket and no pending connect.
    Idle,
    /// Handshake in flight.
    Connecting,
    /// Handshake complete; control messages may be sent.
    Open,
    /// Link dropped or handshake failed; a retry is scheduled.
    Closed {
        /// Which reconnection attempt the pending retry is (1-based).
        retry_attempt: u32,
    },
    /// Reconnect budget spent. Stays here until `connect` is called again.
    Exhausted,
}

impl ConnectionState {
    /// Short label used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed { .. } => "closed",
            Self::Exhausted => "exhausted",
        }
    }

    /// Whether control messages can currently be sent upstream.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Whether the connection is up or on its way up.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }

    /// Numeric code exported as a gauge.
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Connecting => 1,
            Self::Open => 2,
            Self::Closed { .. } => 3,
            Self::Exhausted => 4,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Events and Actions
// =============================================================================

/// Something that happened to the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A caller asked to connect.
    ConnectRequested,
    /// The handshake completed.
    Opened,
    /// The handshake failed.
    HandshakeFailed,
    /// An open link closed or errored.
    LinkLost,
    /// The reconnect delay elapsed.
    RetryTimerElapsed,
    /// A caller asked to disconnect.
    DisconnectRequested,
}

/// What the driver must do in response to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Begin a new handshake.
    StartHandshake,
    /// Arm the settle timer; replay subscriptions when it fires.
    ScheduleReplay,
    /// Arm the retry timer.
    ScheduleRetry {
        /// Reconnection attempt number (1-based).
        attempt: u32,
        /// Delay before the attempt.
        delay: Duration,
    },
    /// Budget spent; stop retrying.
    GiveUp {
        /// Reconnection attempts made before giving up.
        attempts: u32,
    },
    /// Drop the link and every pending timer.
    TearDown,
}

// =============================================================================
// Machine
// =============================================================================

/// Connection state machine with its reconnect budget.
#[derive(Debug)]
pub struct ConnectionMachine {
    state: ConnectionState,
    policy: ReconnectPolicy,
}

impl ConnectionMachine {
    /// Create a machine in [`ConnectionState::Idle`].
    #[must_use]
    pub const fn new(config: ReconnectConfig) -> Self {
        Self {
            state: ConnectionState::Idle,
            policy: ReconnectPolicy::new(config),
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Apply `event`, returning the action to perform, if any.
    ///
    /// Events that make no sense in the current state (a stale handshake
    /// result after a disconnect, a connect while already connecting) are
    /// ignored and return `None`.
    pub const fn handle(&mut self, event: ConnectionEvent) -> Option<ConnectionAction> {
        match (self.state, event) {
            (ConnectionState::Connecting | ConnectionState::Open, ConnectionEvent::ConnectRequested) => {
                None
            }
            (_, ConnectionEvent::ConnectRequested) => {
                self.policy.reset();
                self.state = ConnectionState::Connecting;
                Some(ConnectionAction::StartHandshake)
            }
            (ConnectionState::Connecting, ConnectionEvent::Opened) => {
                self.policy.reset();
                self.state = ConnectionState::Open;
                Some(ConnectionAction::ScheduleReplay)
            }
            (ConnectionState::Connecting, ConnectionEvent::HandshakeFailed)
            | (ConnectionState::Open, ConnectionEvent::LinkLost) => Some(self.schedule_retry()),
            (ConnectionState::Closed { .. }, ConnectionEvent::RetryTimerElapsed) => {
                self.state = ConnectionState::Connecting;
                Some(ConnectionAction::StartHandshake)
            }
            (_, ConnectionEvent::DisconnectRequested) => {
                self.policy.reset();
                self.state = ConnectionState::Idle;
                Some(ConnectionAction::TearDown)
            }
            _ => None,
        }
    }

    const fn schedule_retry(&mut self) -> ConnectionAction {
        if let Some(delay) = self.policy.next_delay() {
            let attempt = self.policy.attempt_count();
            self.state = ConnectionState::Closed {
                retry_attempt: attempt,
            };
            ConnectionAction::ScheduleRetry { attempt, delay }
        } else {
            self.state = ConnectionState::Exhausted;
            ConnectionAction::GiveUp {
                attempts: self.policy.attempt_count(),
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

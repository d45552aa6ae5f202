//! Connection state machine and reconnect backoff.
//!
//! ```text
//! Disconnected -> Connecting -> Authenticating -> Connected
//!                     ^               |              |
//!                     |               v              v
//!                     +---- Reconnecting <---- (connection lost)
//! ```
//!
//! A rejected credential or an explicit disconnect always lands in
//! `Disconnected` without scheduling a retry.

use std::fmt;
use std::time::Duration;

use creatorhub_core::config::ReconnectConfig;

/// Client-side connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport and no retry pending.
    Disconnected,
    /// Opening the transport for a fresh `connect`.
    Connecting,
    /// Transport open, credential sent, awaiting the verdict.
    Authenticating,
    /// Authenticated; operations are sent.
    Connected,
    /// Waiting out the backoff before reconnect `attempt`.
    Reconnecting {
        /// 1-based attempt number.
        attempt: u32,
    },
}

impl ConnectionState {
    /// Whether operations are currently sent to the relay.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Authenticating => write!(f, "authenticating"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting { attempt } => write!(f, "reconnecting (attempt {attempt})"),
        }
    }
}

/// Exponential backoff: `base_delay * 2^(attempt - 1)` for attempts
/// `1..=max_attempts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Attempts before giving up.
    pub max_attempts: u32,
    /// Delay before the first attempt.
    pub base_delay: Duration,
}

impl ReconnectPolicy {
    /// Create a policy.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay before `attempt`, or `None` when the attempt is out of range.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        Some(self.base_delay.saturating_mul(factor))
    }

    /// Every delay the policy will ever schedule, in order.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..=self.max_attempts)
            .filter_map(|attempt| self.delay_for(attempt))
            .collect()
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from(&ReconnectConfig::default())
    }
}

impl From<&ReconnectConfig> for ReconnectPolicy {
    fn from(config: &ReconnectConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
        )
    }
}

/// What to do after the transport was lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Wait `delay`, then make reconnect `attempt`.
    Retry {
        /// 1-based attempt number.
        attempt: u32,
        /// Time to wait first.
        delay: Duration,
    },
    /// The policy is exhausted; stay disconnected until `connect` is called.
    GiveUp {
        /// Attempts that were made.
        attempts: u32,
    },
}

/// Explicit state machine driving the channel.
#[derive(Debug, Clone)]
pub struct ConnectionStateMachine {
    state: ConnectionState,
    attempt: u32,
    policy: ReconnectPolicy,
}

impl ConnectionStateMachine {
    /// Create a machine in `Disconnected`.
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempt: 0,
            policy,
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Reconnect attempts made since the last successful authentication.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// The backoff policy.
    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// A fresh `connect` call. Resets the attempt counter.
    pub fn connect_requested(&mut self) {
        self.attempt = 0;
        self.state = ConnectionState::Connecting;
    }

    /// The transport opened and the credential is on its way.
    pub fn transport_opened(&mut self) {
        self.state = ConnectionState::Authenticating;
    }

    /// The relay accepted the credential.
    pub fn authenticated(&mut self) {
        self.attempt = 0;
        self.state = ConnectionState::Connected;
    }

    /// The relay rejected the credential. Never retried.
    pub fn auth_rejected(&mut self) {
        self.state = ConnectionState::Disconnected;
    }

    /// The transport failed to open or closed unexpectedly.
    pub fn connection_lost(&mut self) -> Backoff {
        let next = self.attempt + 1;
        match self.policy.delay_for(next) {
            Some(delay) => {
                self.attempt = next;
                self.state = ConnectionState::Reconnecting { attempt: next };
                Backoff::Retry {
                    attempt: next,
                    delay,
                }
            }
            None => {
                self.state = ConnectionState::Disconnected;
                Backoff::GiveUp {
                    attempts: self.attempt,
                }
            }
        }
    }

    /// Local `disconnect`. Suppresses further reconnects.
    pub fn disconnect_requested(&mut self) {
        self.attempt = 0;
        self.state = ConnectionState::Disconnected;
    }
}

impl Default for ConnectionStateMachine {
    fn default() -> Self {
        Self::new(ReconnectPolicy::default())
    }
}

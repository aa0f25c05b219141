//! Push socket listener.
//!
//! Keeps an authenticated WebSocket session with the Pushover push service
//! open and runs a [`MessageCallback`] every time the server signals that
//! new messages are waiting. Message bodies never travel over the socket;
//! the callback fetches them over the REST API.
//!
//! # Architecture
//!
//! ```text
//!   listen_with_reconnect (supervisor)
//!         │  retry policy: R → 5s, I/O or callback error → 15s, E/A → stop
//!         ▼
//!   listen (one session)
//!         │  connect + login, read 512-byte chunks, decode bytes
//!         ▼
//!   Connector ──► Connection            MessageCallback
//!   (WsConnector)  read()/close()       check_messages()
//! ```
//!
//! A [`Listener`] is constructed explicitly by the caller and holds the
//! connector, the reconnect policy and the label used in its log lines.
//! Logging goes through the `log` facade; with no logger installed every
//! log call is a no-op.

pub mod connector;
mod session;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod testing;

use anyhow::Result;
use async_trait::async_trait;

pub use connector::{login_line, Connection, Connector, WsConnector};
pub use supervisor::{Decision, ReconnectPolicy};

/// Device credentials used to log in to the push socket.
///
/// Issued by device registration; read-only for the life of a session.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Registered device ID.
    pub device_id: String,
    /// User secret returned by login.
    pub secret: String,
}

impl Credentials {
    /// Create credentials from a device ID and user secret.
    pub fn new(device_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("device_id", &self.device_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Capability invoked when the server signals new messages.
///
/// Implementations fetch and acknowledge pending messages. An error ends
/// the session; the supervisor logs it and reconnects after the error delay.
#[async_trait]
pub trait MessageCallback: Send {
    /// Check for and process any pending messages.
    async fn check_messages(&mut self) -> Result<()>;
}

/// How a session ended.
#[derive(Debug)]
pub enum SessionEnd {
    /// Dial, WebSocket handshake or login write failed. Retriable.
    Connect(anyhow::Error),
    /// Socket read failed or the server closed the stream. Retriable.
    Read(anyhow::Error),
    /// Server sent `R`: rotate the connection.
    ReconnectRequested,
    /// Server sent `E`: permanent error, do not reconnect.
    Permanent,
    /// Server sent `A`: session closed, do not reconnect.
    SessionClosed,
    /// The message callback failed. Retriable.
    Callback(anyhow::Error),
    /// The cancellation token fired.
    Cancelled,
}

impl SessionEnd {
    /// Whether the supervisor reconnects after this end.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Connect(_) | Self::Read(_) | Self::ReconnectRequested | Self::Callback(_)
        )
    }
}

impl std::fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect(e) => write!(f, "error connecting to push socket: {e:#}"),
            Self::Read(e) => write!(f, "error reading from push socket: {e:#}"),
            Self::ReconnectRequested => write!(f, "server requested reconnect"),
            Self::Permanent => write!(f, "permanent error reported by server"),
            Self::SessionClosed => write!(f, "session closed by server"),
            Self::Callback(e) => write!(f, "{e}"),
            Self::Cancelled => write!(f, "listener cancelled"),
        }
    }
}

impl std::error::Error for SessionEnd {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Connect(e) | Self::Read(e) | Self::Callback(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

/// Push socket listener.
pub struct Listener {
    connector: Box<dyn Connector>,
    policy: ReconnectPolicy,
    label: String,
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("policy", &self.policy)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl Default for Listener {
    fn default() -> Self {
        Self::new()
    }
}

impl Listener {
    /// Listener for the Pushover push endpoint with the standard delays.
    #[must_use]
    pub fn new() -> Self {
        Self::with_connector(WsConnector::default())
    }

    /// Listener using a custom connector.
    pub fn with_connector(connector: impl Connector + 'static) -> Self {
        Self {
            connector: Box::new(connector),
            policy: ReconnectPolicy::default(),
            label: "Push".to_string(),
        }
    }

    /// Replace the reconnect policy.
    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the label that prefixes this listener's log lines.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Current reconnect policy.
    pub fn policy(&self) -> ReconnectPolicy {
        self.policy
    }
}

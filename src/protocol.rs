//! Push socket control protocol.
//!
//! Every byte received on the push socket is a complete, independent signal.
//! The decoder keeps no state between bytes, so a read buffer can be decoded
//! byte by byte in receipt order.
//!
//! | Byte | Signal                 | Effect on the session     |
//! |------|------------------------|---------------------------|
//! | `#`  | heartbeat              | none                      |
//! | `!`  | new messages available | run the message callback  |
//! | `R`  | reconnect requested    | end session, reconnect    |
//! | `E`  | permanent error        | end session, stop         |
//! | `A`  | session closed         | end session, stop         |
//! | else | unknown                | logged, ignored           |

/// Heartbeat byte.
pub const HEARTBEAT: u8 = b'#';
/// New messages are waiting to be downloaded.
pub const MESSAGE_AVAILABLE: u8 = b'!';
/// Server asks the client to reconnect.
pub const RECONNECT: u8 = b'R';
/// Permanent error; the client must not reconnect.
pub const PERMANENT_ERROR: u8 = b'E';
/// Session was closed by the server (usually logged in elsewhere).
pub const SESSION_CLOSED: u8 = b'A';

/// Classification of one control byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// Keepalive from the server. Needs no response.
    Heartbeat,
    /// One or more messages are ready to be fetched over the REST API.
    MessageAvailable,
    /// Server-requested connection rotation.
    ReconnectRequested,
    /// Remote-declared unrecoverable error.
    FatalPermanent,
    /// Session forcibly closed by the remote side.
    FatalSession,
    /// Byte with no assigned meaning.
    Unknown(u8),
}

impl ControlSignal {
    /// Decode a single control byte.
    #[must_use]
    pub fn decode(byte: u8) -> Self {
        match byte {
            HEARTBEAT => Self::Heartbeat,
            MESSAGE_AVAILABLE => Self::MessageAvailable,
            RECONNECT => Self::ReconnectRequested,
            PERMANENT_ERROR => Self::FatalPermanent,
            SESSION_CLOSED => Self::FatalSession,
            other => Self::Unknown(other),
        }
    }
}

/// Decode a read buffer into signals, preserving receipt order.
pub fn decode_all(bytes: &[u8]) -> impl Iterator<Item = ControlSignal> + '_ {
    bytes.iter().copied().map(ControlSignal::decode)
}

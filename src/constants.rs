//! Protocol and application constants for pushwire.
//!
//! The push endpoint, origin, login line and control bytes are fixed by the
//! Pushover Open Client protocol. Changing any of them breaks
//! interoperability with the real service.
//!
//! # Categories
//!
//! - **Push socket**: WebSocket endpoint, chunk size, reconnect delays
//! - **REST API**: base URL, request timeout, device registration

use std::time::Duration;

// ============================================================================
// Push socket
// ============================================================================

/// WebSocket endpoint of the Pushover push service.
pub const PUSH_ENDPOINT: &str = "wss://client.pushover.net/push";

/// Origin header sent with the WebSocket handshake.
pub const PUSH_ORIGIN: &str = "http://localhost/";

/// Maximum number of control bytes consumed per physical read.
pub const READ_CHUNK_SIZE: usize = 512;

/// Delay before reconnecting after the server asked us to (`R`).
///
/// This is the normal connection rotation path, not a failure.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Delay before reconnecting after a connect, read or handshake failure.
pub const ERROR_RETRY_DELAY: Duration = Duration::from_secs(15);

// ============================================================================
// REST API
// ============================================================================

/// Base URL of the Pushover Open Client REST API.
pub const DEFAULT_API_URL: &str = "https://api.pushover.net/1";

/// HTTP client request timeout for API calls.
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Operating system code sent when registering a device (`O` = open client).
pub const DEVICE_OS: &str = "O";

/// Maximum length of a device name accepted by the API.
pub const DEVICE_NAME_MAX_LEN: usize = 25;

/// Prefix for generated device names.
pub const DEVICE_NAME_PREFIX: &str = "pushwire";

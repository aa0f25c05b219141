//! Push socket connector.
//!
//! A [`Connector`] dials the push endpoint and performs the login handshake,
//! handing back a [`Connection`] that yields raw control bytes. The session
//! loop only talks to these traits, so tests can drive it with an in-memory
//! transport.
//!
//! # Handshake
//!
//! Immediately after the WebSocket upgrade the client writes exactly one text
//! frame, `login:<device_id>:<secret>\n`. No reply is sent; a rejected login
//! shows up later as an `E`/`A` control byte or a closed socket.

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::Credentials;
use crate::constants::{PUSH_ENDPOINT, PUSH_ORIGIN};
use crate::ws::PushSocket;

/// Build the login line for a device.
#[must_use]
pub fn login_line(credentials: &Credentials) -> String {
    format!("login:{}:{}\n", credentials.device_id, credentials.secret)
}

/// An open, logged-in push connection.
///
/// Owned by exactly one session loop, which reads it sequentially and closes
/// it once on exit.
#[async_trait]
pub trait Connection: Send {
    /// Read control bytes into `buf`, returning how many were written.
    ///
    /// Never returns `Ok(0)`: a closed or ended stream is an error.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Close the connection.
    async fn close(&mut self) -> Result<()>;
}

/// Opens push connections.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Dial the push endpoint and send the login line.
    ///
    /// Dial and login-write failures are both reported as errors; the caller
    /// cannot tell them apart and retries either way.
    async fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Connection>>;
}

/// Production connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
    origin: String,
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new(PUSH_ENDPOINT)
    }
}

impl WsConnector {
    /// Connector for a specific endpoint, with the standard origin.
    ///
    /// Production code uses [`WsConnector::default`]; other endpoints are
    /// for local test servers.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            origin: PUSH_ORIGIN.to_string(),
        }
    }

    /// Endpoint this connector dials.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Connection>> {
        let mut socket = PushSocket::connect(&self.url, &self.origin)
            .await
            .with_context(|| format!("error connecting to {}", self.url))?;

        log::debug!("[Push] Connected to {}", self.url);

        if let Err(e) = socket.send_text(&login_line(credentials)).await {
            if let Err(close_err) = socket.close().await {
                log::debug!("[Push] Error closing after failed login: {:#}", close_err);
            }
            return Err(e.context("error sending login"));
        }

        Ok(Box::new(WsConnection {
            socket,
            pending: Vec::new(),
        }))
    }
}

/// Logged-in WebSocket push connection.
///
/// Data frames are flattened into a byte stream; a frame longer than the
/// caller's buffer is handed out over several reads.
#[derive(Debug)]
struct WsConnection {
    socket: PushSocket,
    pending: Vec<u8>,
}

impl WsConnection {
    fn drain_pending(&mut self, buf: &mut [u8]) -> usize {
        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        n
    }
}

#[async_trait]
impl Connection for WsConnection {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.pending.is_empty() {
            self.pending = self.socket.recv_data().await?;
        }
        Ok(self.drain_pending(buf))
    }

    async fn close(&mut self) -> Result<()> {
        self.socket.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_line_format() {
        let credentials = Credentials::new("device123", "secretXYZ");
        assert_eq!(login_line(&credentials), "login:device123:secretXYZ\n");
    }

    #[test]
    fn test_login_line_accepts_empty_values() {
        let credentials = Credentials::new("", "");
        assert_eq!(login_line(&credentials), "login::\n");
    }

    #[test]
    fn test_default_connector_uses_push_endpoint() {
        let connector = WsConnector::default();
        assert_eq!(connector.url(), "wss://client.pushover.net/push");
        assert_eq!(connector.origin, "http://localhost/");
    }

    #[tokio::test]
    async fn test_connect_unreachable_endpoint_fails() {
        let connector = WsConnector::new("ws://127.0.0.1:1/push");
        let result = connector
            .connect(&Credentials::new("device123", "secretXYZ"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_large_frame_is_split_across_reads() {
        use futures_util::{SinkExt, StreamExt};
        use tokio_tungstenite::tungstenite::Message;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/push", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let login = ws.next().await.unwrap().unwrap();
            ws.send(Message::Binary(vec![b'#'; 600])).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
            login.into_text().unwrap()
        });

        let mut connection = WsConnector::new(url)
            .connect(&Credentials::new("device123", "secretXYZ"))
            .await
            .unwrap();

        let mut buf = [0_u8; crate::constants::READ_CHUNK_SIZE];
        assert_eq!(connection.read(&mut buf).await.unwrap(), 512);
        assert_eq!(connection.read(&mut buf).await.unwrap(), 88);
        connection.close().await.unwrap();

        assert_eq!(server.await.unwrap(), "login:device123:secretXYZ\n");
    }
}

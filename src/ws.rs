//! WebSocket transport for the push socket.
//!
//! The push service only ever sends tiny data frames whose payload bytes are
//! control signals, so [`PushSocket`] exposes the connection as a source of
//! byte chunks rather than as a message stream:
//!
//! - text and binary frames both yield their payload bytes;
//! - pings are answered by `tungstenite` itself and never surface;
//! - a close frame, a protocol error or the end of the stream is an error.
//!
//! The handshake carries the fixed `Origin` header the service requires.

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// One push socket connection.
#[derive(Debug)]
pub struct PushSocket {
    stream: WsStream,
}

impl PushSocket {
    /// Dial `url` with the given `Origin` header.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL or origin is malformed, or the TCP, TLS or
    /// WebSocket handshake fails.
    pub async fn connect(url: &str, origin: &str) -> Result<Self> {
        let mut request = url
            .into_client_request()
            .with_context(|| format!("invalid push URL: {url}"))?;
        let origin = HeaderValue::from_str(origin)
            .with_context(|| format!("invalid origin: {origin:?}"))?;
        request.headers_mut().insert("Origin", origin);

        let (stream, response) = tokio_tungstenite::connect_async(request)
            .await
            .context("WebSocket handshake failed")?;
        log::debug!("[Push] Handshake complete ({})", response.status());

        Ok(Self { stream })
    }

    /// Send one text frame.
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.stream
            .send(Message::Text(text.to_string()))
            .await
            .context("error writing to push socket")
    }

    /// Wait for the next non-empty data frame and return its payload.
    ///
    /// # Errors
    ///
    /// A close frame, a transport error or the end of the stream.
    pub async fn recv_data(&mut self) -> Result<Vec<u8>> {
        loop {
            let message = match self.stream.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => return Err(e).context("error reading from push socket"),
                None => anyhow::bail!("push socket stream ended"),
            };

            match message {
                Message::Text(text) if !text.is_empty() => return Ok(text.into_bytes()),
                Message::Binary(data) if !data.is_empty() => return Ok(data),
                Message::Close(frame) => anyhow::bail!("{}", describe_close(frame.as_ref())),
                // Pings are queued for a pong by tungstenite; nothing else carries signals.
                _ => {}
            }
        }
    }

    /// Send a close frame and flush.
    pub async fn close(&mut self) -> Result<()> {
        self.stream
            .close(None)
            .await
            .context("error closing push socket")
    }
}

fn describe_close(frame: Option<&CloseFrame<'_>>) -> String {
    match frame {
        Some(frame) if frame.reason.is_empty() => {
            format!("push socket closed by server (code {})", u16::from(frame.code))
        }
        Some(frame) => format!(
            "push socket closed by server (code {}: {})",
            u16::from(frame.code),
            frame.reason
        ),
        None => "push socket closed by server".to_string(),
    }
}

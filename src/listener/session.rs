//! One push session: connect, log in, read and dispatch control bytes.

use tokio_util::sync::CancellationToken;

use super::connector::Connection;
use super::{Credentials, Listener, MessageCallback, SessionEnd};
use crate::constants::READ_CHUNK_SIZE;
use crate::protocol::{self, ControlSignal};

impl Listener {
    /// Run a single session until it ends.
    ///
    /// The connection is closed exactly once before this returns, whatever
    /// the outcome. Cancellation is observed while dialing and while waiting
    /// for the next read; a callback already running is allowed to finish.
    pub async fn listen(
        &self,
        credentials: &Credentials,
        callback: &mut dyn MessageCallback,
        cancel: &CancellationToken,
    ) -> SessionEnd {
        let connected = tokio::select! {
            biased;
            () = cancel.cancelled() => return SessionEnd::Cancelled,
            result = self.connector.connect(credentials) => result,
        };

        let mut connection = match connected {
            Ok(connection) => connection,
            Err(e) => return SessionEnd::Connect(e),
        };

        log::debug!("[{}] Logged in to push socket", self.label);

        let end = self.dispatch(connection.as_mut(), callback, cancel).await;

        if let Err(e) = connection.close().await {
            log::debug!("[{}] Error closing push socket: {:#}", self.label, e);
        }

        end
    }

    async fn dispatch(
        &self,
        connection: &mut dyn Connection,
        callback: &mut dyn MessageCallback,
        cancel: &CancellationToken,
    ) -> SessionEnd {
        let mut buf = [0_u8; READ_CHUNK_SIZE];

        loop {
            let n = tokio::select! {
                biased;
                () = cancel.cancelled() => return SessionEnd::Cancelled,
                result = connection.read(&mut buf) => match result {
                    Ok(n) => n,
                    Err(e) => return SessionEnd::Read(e),
                },
            };

            log::debug!(
                "[{}] Received {:?}",
                self.label,
                String::from_utf8_lossy(&buf[..n])
            );

            for signal in protocol::decode_all(&buf[..n]) {
                match signal {
                    ControlSignal::Heartbeat => {}
                    ControlSignal::MessageAvailable => {
                        if let Err(e) = callback.check_messages().await {
                            return SessionEnd::Callback(e);
                        }
                    }
                    ControlSignal::ReconnectRequested => return SessionEnd::ReconnectRequested,
                    ControlSignal::FatalPermanent => return SessionEnd::Permanent,
                    ControlSignal::FatalSession => return SessionEnd::SessionClosed,
                    ControlSignal::Unknown(byte) => {
                        log::warn!(
                            "[{}] Unknown control byte {:?} (0x{:02x})",
                            self.label,
                            char::from(byte),
                            byte
                        );
                    }
                }
            }
        }
    }
}

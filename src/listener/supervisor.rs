//! Reconnect supervisor.
//!
//! Runs sessions back to back and decides, from how each one ended, whether
//! to reconnect and after how long:
//!
//! | Session end                  | Action                        |
//! |------------------------------|-------------------------------|
//! | `R` reconnect requested      | wait `reconnect_delay`, retry |
//! | connect / read failure       | wait `error_delay`, retry     |
//! | callback error               | wait `error_delay`, retry     |
//! | `E` permanent, `A` session   | stop, return error            |
//! | cancelled                    | stop, return `Ok`             |
//!
//! Retriable failures are retried forever; the supervisor is meant to run
//! unattended for the life of the process.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::{Credentials, Listener, MessageCallback, SessionEnd};
use crate::constants::{ERROR_RETRY_DELAY, RECONNECT_DELAY};

/// Delays applied between sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Wait after a server-requested reconnect.
    pub reconnect_delay: Duration,
    /// Wait after a connect, read or callback failure.
    pub error_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            reconnect_delay: RECONNECT_DELAY,
            error_delay: ERROR_RETRY_DELAY,
        }
    }
}

/// What the supervisor does after a session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Sleep, then open a new session.
    Retry(Duration),
    /// Return the session end to the caller as an error.
    Stop,
    /// Return successfully.
    Shutdown,
}

impl ReconnectPolicy {
    /// Classify a session end.
    #[must_use]
    pub fn decide(&self, end: &SessionEnd) -> Decision {
        match end {
            SessionEnd::Cancelled => Decision::Shutdown,
            SessionEnd::ReconnectRequested => Decision::Retry(self.reconnect_delay),
            end if end.is_retriable() => Decision::Retry(self.error_delay),
            _ => Decision::Stop,
        }
    }
}

impl Listener {
    /// Listen until a fatal session end or cancellation.
    ///
    /// Runs one best-effort `check_messages` first so messages that arrived
    /// while offline are picked up; its error is logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns the [`SessionEnd`] that stopped the supervisor: a permanent
    /// or session-closed signal from the server. Callback errors are logged
    /// and retried like I/O failures.
    pub async fn listen_with_reconnect(
        &self,
        credentials: &Credentials,
        callback: &mut dyn MessageCallback,
        cancel: &CancellationToken,
    ) -> Result<(), SessionEnd> {
        if let Err(e) = callback.check_messages().await {
            log::warn!("[{}] Initial message check failed: {:#}", self.label, e);
        }

        loop {
            let end = self.listen(credentials, callback, cancel).await;

            let delay = match self.policy.decide(&end) {
                Decision::Shutdown => {
                    log::info!("[{}] Shutdown requested, stopping listener", self.label);
                    return Ok(());
                }
                Decision::Stop => {
                    log::error!("[{}] Listener stopped: {}", self.label, end);
                    return Err(end);
                }
                Decision::Retry(delay) => delay,
            };

            if matches!(end, SessionEnd::ReconnectRequested) {
                log::info!(
                    "[{}] Reconnecting on request in {}s",
                    self.label,
                    delay.as_secs()
                );
            } else {
                log::error!(
                    "[{}] Error listening to push socket: {:#} (retry in {}s)",
                    self.label,
                    end,
                    delay.as_secs()
                );
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    log::info!("[{}] Shutdown requested, stopping listener", self.label);
                    return Ok(());
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::testing::{CountingCallback, Script, ScriptedConnector};
    use tokio::time::Instant;

    fn credentials() -> Credentials {
        Credentials::new("device123", "secretXYZ")
    }

    #[test]
    fn test_default_policy_delays() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.reconnect_delay, Duration::from_secs(5));
        assert_eq!(policy.error_delay, Duration::from_secs(15));
    }

    #[test]
    fn test_decide_classification() {
        let policy = ReconnectPolicy::default();
        assert_eq!(
            policy.decide(&SessionEnd::ReconnectRequested),
            Decision::Retry(Duration::from_secs(5))
        );
        assert_eq!(
            policy.decide(&SessionEnd::Connect(anyhow::anyhow!("refused"))),
            Decision::Retry(Duration::from_secs(15))
        );
        assert_eq!(
            policy.decide(&SessionEnd::Read(anyhow::anyhow!("reset"))),
            Decision::Retry(Duration::from_secs(15))
        );
        assert_eq!(policy.decide(&SessionEnd::Permanent), Decision::Stop);
        assert_eq!(policy.decide(&SessionEnd::SessionClosed), Decision::Stop);
        assert_eq!(
            policy.decide(&SessionEnd::Callback(anyhow::anyhow!("boom"))),
            Decision::Retry(Duration::from_secs(15))
        );
        assert_eq!(policy.decide(&SessionEnd::Cancelled), Decision::Shutdown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_request_retries_after_short_delay() {
        let connector = ScriptedConnector::new(vec![
            Script::reads(&["#R"]),
            Script::reads(&["A"]),
        ]);
        let log = connector.log();
        let listener = Listener::with_connector(connector);

        let result = listener
            .listen_with_reconnect(
                &credentials(),
                &mut CountingCallback::default(),
                &CancellationToken::new(),
            )
            .await;

        assert!(matches!(result, Err(SessionEnd::SessionClosed)));
        let times = log.connect_times();
        assert_eq!(times.len(), 2);
        assert_eq!(times[1] - times[0], Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_signals_return_without_sleeping() {
        for (bytes, expected) in [("E", "permanent"), ("A", "session")] {
            let connector = ScriptedConnector::new(vec![Script::reads(&[bytes])]);
            let log = connector.log();
            let listener = Listener::with_connector(connector);
            let started = Instant::now();

            let result = listener
                .listen_with_reconnect(
                    &credentials(),
                    &mut CountingCallback::default(),
                    &CancellationToken::new(),
                )
                .await;

            let err = result.expect_err("fatal signal must stop the supervisor");
            assert!(err.to_string().contains(expected));
            assert_eq!(started.elapsed(), Duration::ZERO);
            assert_eq!(log.connect_times().len(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dial_failures_retry_after_long_delay() {
        let connector = ScriptedConnector::new(vec![
            Script::connect_error(),
            Script::connect_error(),
            Script::connect_error(),
            Script::reads(&["E"]),
        ]);
        let log = connector.log();
        let listener = Listener::with_connector(connector);
        let started = Instant::now();

        let result = listener
            .listen_with_reconnect(
                &credentials(),
                &mut CountingCallback::default(),
                &CancellationToken::new(),
            )
            .await;

        assert!(matches!(result, Err(SessionEnd::Permanent)));
        assert_eq!(log.connect_times().len(), 4);
        assert_eq!(started.elapsed(), Duration::from_secs(45));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_failure_retries_after_long_delay() {
        let connector = ScriptedConnector::new(vec![
            Script::reads(&["#"]).then_read_error(),
            Script::reads(&["E"]),
        ]);
        let log = connector.log();
        let listener = Listener::with_connector(connector);

        let result = listener
            .listen_with_reconnect(
                &credentials(),
                &mut CountingCallback::default(),
                &CancellationToken::new(),
            )
            .await;

        assert!(matches!(result, Err(SessionEnd::Permanent)));
        let times = log.connect_times();
        assert_eq!(times[1] - times[0], Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_error_retries_after_long_delay() {
        let connector = ScriptedConnector::new(vec![Script::reads(&["!"]), Script::reads(&["E"])]);
        let log = connector.log();
        let listener = Listener::with_connector(connector);
        let mut callback = CountingCallback::failing("stdout closed");

        let result = listener
            .listen_with_reconnect(&credentials(), &mut callback, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(SessionEnd::Permanent)));
        // Initial check, then the failing `!` in the first session.
        assert_eq!(callback.calls(), 2);
        let times = log.connect_times();
        assert_eq!(times.len(), 2);
        assert_eq!(times[1] - times[0], Duration::from_secs(15));
        assert_eq!(log.close_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_check_runs_before_connecting() {
        let connector = ScriptedConnector::new(vec![Script::reads(&["E"])]);
        let listener = Listener::with_connector(connector);
        let mut callback = CountingCallback::default();

        let _ = listener
            .listen_with_reconnect(&credentials(), &mut callback, &CancellationToken::new())
            .await;

        assert_eq!(callback.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_policy_delays() {
        let connector =
            ScriptedConnector::new(vec![Script::connect_error(), Script::reads(&["E"])]);
        let log = connector.log();
        let listener = Listener::with_connector(connector).with_policy(ReconnectPolicy {
            reconnect_delay: Duration::from_millis(10),
            error_delay: Duration::from_millis(20),
        });

        let _ = listener
            .listen_with_reconnect(
                &credentials(),
                &mut CountingCallback::default(),
                &CancellationToken::new(),
            )
            .await;

        let times = log.connect_times();
        assert_eq!(times[1] - times[0], Duration::from_millis(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_retry_sleep_returns_ok() {
        let connector = ScriptedConnector::new(vec![Script::connect_error()]);
        let log = connector.log();
        let listener = Listener::with_connector(connector);
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            canceller.cancel();
        });

        let result = listener
            .listen_with_reconnect(&credentials(), &mut CountingCallback::default(), &cancel)
            .await;

        assert!(result.is_ok());
        assert_eq!(log.connect_times().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_connected_closes_and_returns_ok() {
        let connector = ScriptedConnector::new(vec![Script::reads(&["#"]).then_hang()]);
        let log = connector.log();
        let listener = Listener::with_connector(connector);
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            canceller.cancel();
        });

        let result = listener
            .listen_with_reconnect(&credentials(), &mut CountingCallback::default(), &cancel)
            .await;

        assert!(result.is_ok());
        assert_eq!(log.close_count(), 1);
    }
}

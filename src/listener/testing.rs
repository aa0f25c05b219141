//! In-memory connector and callback for exercising the session loop and
//! supervisor without a network.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tokio::time::Instant;

use super::connector::{login_line, Connection, Connector};
use super::{Credentials, MessageCallback};

/// Observable side effect, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    /// Connect attempt carrying the login line that would be written.
    Connect(String),
    Read,
    Callback,
    Close,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct CallLog {
    calls: Arc<Mutex<Vec<(Instant, Call)>>>,
}

impl CallLog {
    fn push(&self, call: Call) {
        self.calls.lock().unwrap().push((Instant::now(), call));
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().iter().map(|(_, c)| c.clone()).collect()
    }

    pub(crate) fn close_count(&self) -> usize {
        self.calls().iter().filter(|c| **c == Call::Close).count()
    }

    pub(crate) fn connect_times(&self) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, c)| matches!(c, Call::Connect(_)))
            .map(|(at, _)| *at)
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
enum ScriptEnd {
    ReadError,
    Hang,
}

/// Behaviour of one connection attempt.
#[derive(Debug, Clone)]
pub(crate) struct Script {
    connect_fails: bool,
    reads: VecDeque<Vec<u8>>,
    end: ScriptEnd,
    close_fails: bool,
}

impl Script {
    /// Successful connect that yields `chunks`, one per read, then a read error.
    pub(crate) fn reads(chunks: &[&str]) -> Self {
        Self {
            connect_fails: false,
            reads: chunks.iter().map(|c| c.as_bytes().to_vec()).collect(),
            end: ScriptEnd::ReadError,
            close_fails: false,
        }
    }

    pub(crate) fn connect_error() -> Self {
        Self {
            connect_fails: true,
            ..Self::reads(&[])
        }
    }

    pub(crate) fn then_read_error(mut self) -> Self {
        self.end = ScriptEnd::ReadError;
        self
    }

    pub(crate) fn then_hang(mut self) -> Self {
        self.end = ScriptEnd::Hang;
        self
    }

    pub(crate) fn with_failing_close(mut self) -> Self {
        self.close_fails = true;
        self
    }
}

/// Connector replaying one [`Script`] per connect call.
///
/// Once the scripts run out every further connection reports `E`, so a
/// supervisor under test always terminates.
#[derive(Debug)]
pub(crate) struct ScriptedConnector {
    scripts: Mutex<VecDeque<Script>>,
    log: CallLog,
}

impl ScriptedConnector {
    pub(crate) fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            log: CallLog::default(),
        }
    }

    pub(crate) fn log(&self) -> CallLog {
        self.log.clone()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Connection>> {
        self.log.push(Call::Connect(login_line(credentials)));

        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Script::reads(&["E"]));

        if script.connect_fails {
            anyhow::bail!("connection refused");
        }

        Ok(Box::new(ScriptedConnection {
            script,
            log: self.log.clone(),
        }))
    }
}

struct ScriptedConnection {
    script: Script,
    log: CallLog,
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.log.push(Call::Read);
        match self.script.reads.pop_front() {
            Some(chunk) => {
                buf[..chunk.len()].copy_from_slice(&chunk);
                Ok(chunk.len())
            }
            None => match self.script.end {
                ScriptEnd::ReadError => anyhow::bail!("connection reset"),
                ScriptEnd::Hang => std::future::pending().await,
            },
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.log.push(Call::Close);
        if self.script.close_fails {
            anyhow::bail!("close failed");
        }
        Ok(())
    }
}

/// Callback counting its invocations, optionally failing every time.
#[derive(Debug, Default)]
pub(crate) struct CountingCallback {
    calls: usize,
    failure: Option<String>,
    log: Option<CallLog>,
}

impl CountingCallback {
    pub(crate) fn sharing(log: &CallLog) -> Self {
        Self {
            log: Some(log.clone()),
            ..Self::default()
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls
    }
}

#[async_trait]
impl MessageCallback for CountingCallback {
    async fn check_messages(&mut self) -> Result<()> {
        self.calls += 1;
        if let Some(log) = &self.log {
            log.push(Call::Callback);
        }
        match &self.failure {
            Some(message) => Err(anyhow::anyhow!("{message}")),
            None => Ok(()),
        }
    }
}

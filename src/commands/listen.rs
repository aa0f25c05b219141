//! `pushwire listen` - print messages as they arrive.

use std::io::Write;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::api::{AuthorizedClient, PushoverClient};
use crate::config::Config;
use crate::keyring::StoredCredentials;
use crate::listener::{Listener, MessageCallback};
use crate::output::{Formatter, OutputFormat};

/// Message callback that downloads, acknowledges and prints messages.
///
/// Download and delete failures are logged and swallowed so a flaky API
/// does not tear down the push session. Output failures are returned.
#[derive(Debug)]
pub struct MessagePump<W> {
    client: AuthorizedClient,
    formatter: Formatter,
    out: W,
}

impl<W: Write + Send> MessagePump<W> {
    /// Create a pump writing to `out`.
    pub fn new(client: AuthorizedClient, formatter: Formatter, out: W) -> Self {
        Self {
            client,
            formatter,
            out,
        }
    }

    /// Consume the pump, returning the output sink.
    pub fn into_inner(self) -> W {
        self.out
    }
}

#[async_trait]
impl<W: Write + Send> MessageCallback for MessagePump<W> {
    async fn check_messages(&mut self) -> Result<()> {
        let (download, _) = match self.client.download_and_delete().await {
            Ok(result) => result,
            Err(e) => {
                log::error!("Error fetching messages: {e:#}");
                return Ok(());
            }
        };

        self.formatter
            .write_all(&mut self.out, &download.messages)
            .context("error writing messages")
    }
}

/// Entry point for `pushwire listen`.
///
/// `format` and `template` override the configured defaults.
pub async fn run(
    config: &Config,
    format: Option<OutputFormat>,
    template: Option<String>,
) -> Result<()> {
    let format = format.unwrap_or(config.format);
    let template = template.or_else(|| config.template.clone());
    let formatter = Formatter::new(format, template.as_deref())?;

    let credentials = StoredCredentials::load()?
        .session_credentials()
        .context("no stored credentials, run `pushwire init` first")?;

    let client = AuthorizedClient::new(
        PushoverClient::new(&config.api_url)?,
        credentials.clone(),
    );
    let mut pump = MessagePump::new(client, formatter, std::io::stdout());

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Received Ctrl-C, shutting down");
            ctrl_c.cancel();
        }
    });

    log::info!("Listening for messages as device {}", credentials.device_id);
    Listener::new()
        .listen_with_reconnect(&credentials, &mut pump, &cancel)
        .await?;
    Ok(())
}

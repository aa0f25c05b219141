//! `pushwire init` - log in and register this machine as a device.
//!
//! Prompts for the Pushover account email, password and optional 2FA code,
//! retrying until the login succeeds, then registers a device and stores the
//! user secret and device ID in the keyring.
//!
//! On a terminal the password is read with echo off, through crossterm's raw
//! mode. Piped input is read line by line like every other answer.

use std::io::{BufRead, IsTerminal, Write};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

use crate::api::PushoverClient;
use crate::config::Config;
use crate::constants::{DEVICE_NAME_MAX_LEN, DEVICE_NAME_PREFIX};
use crate::keyring::StoredCredentials;

/// Line-oriented prompts over any reader/writer pair.
#[derive(Debug)]
pub struct Prompter<R, W> {
    input: R,
    output: W,
    hide_secrets: bool,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    /// Wrap an input and an output stream. Secrets are read from `input`.
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            hide_secrets: false,
        }
    }

    /// Read secrets from the controlling terminal with echo off.
    pub fn hiding_secrets(mut self, hide: bool) -> Self {
        self.hide_secrets = hide;
        self
    }

    /// Print `label`, read one line and return it trimmed.
    ///
    /// Fails on end of input so a closed stdin cannot loop forever.
    pub fn ask(&mut self, label: &str) -> Result<String> {
        write!(self.output, "{label}: ")?;
        self.output.flush()?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line)?;
        if read == 0 {
            anyhow::bail!("input closed while waiting for {}", label.to_lowercase());
        }
        Ok(line.trim().to_string())
    }

    /// Like [`ask`](Self::ask), returning `default` for an empty answer.
    pub fn ask_with_default(&mut self, label: &str, default: &str) -> Result<String> {
        let answer = self.ask(&format!("{label} [{default}]"))?;
        if answer.is_empty() {
            Ok(default.to_string())
        } else {
            Ok(answer)
        }
    }

    /// Print `label` and read an answer without echoing it.
    ///
    /// Falls back to a plain line read when secrets are not hidden, e.g. for
    /// piped input.
    pub fn ask_secret(&mut self, label: &str) -> Result<String> {
        if !self.hide_secrets {
            return self.ask(label);
        }

        write!(self.output, "{label}: ")?;
        self.output.flush()?;
        let secret = read_hidden_line();
        writeln!(self.output)?;
        secret
    }

    /// Print a line of status text.
    pub fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{text}")?;
        Ok(())
    }
}

/// Restores cooked mode when dropped.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        enable_raw_mode().context("error disabling terminal echo")?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            log::warn!("Failed to restore terminal mode: {e}");
        }
    }
}

/// Effect of one key press on a hidden answer.
#[derive(Debug, PartialEq, Eq)]
enum SecretKey {
    Continue,
    Submit,
    Cancel,
}

fn apply_secret_key(secret: &mut String, key: &KeyEvent) -> SecretKey {
    if key.kind == KeyEventKind::Release {
        return SecretKey::Continue;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Enter => SecretKey::Submit,
        KeyCode::Esc => SecretKey::Cancel,
        KeyCode::Char('c') if ctrl => SecretKey::Cancel,
        KeyCode::Char('d') if ctrl && secret.is_empty() => SecretKey::Cancel,
        KeyCode::Backspace => {
            secret.pop();
            SecretKey::Continue
        }
        KeyCode::Char(c) if !ctrl => {
            secret.push(c);
            SecretKey::Continue
        }
        _ => SecretKey::Continue,
    }
}

/// Read one line from the terminal in raw mode, so nothing is echoed.
fn read_hidden_line() -> Result<String> {
    let _raw = RawModeGuard::enable()?;
    let mut secret = String::new();
    loop {
        if let Event::Key(key) = event::read().context("error reading from terminal")? {
            match apply_secret_key(&mut secret, &key) {
                SecretKey::Continue => {}
                SecretKey::Submit => return Ok(secret),
                SecretKey::Cancel => anyhow::bail!("input cancelled"),
            }
        }
    }
}

/// Default device name: `pushwire-<hostname>`, with every character outside
/// `[A-Za-z0-9]` replaced by `-` and cut to the length the API accepts.
pub fn default_device_name(host: &str) -> String {
    let host: String = host
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    limit_device_name(&format!("{DEVICE_NAME_PREFIX}-{host}"))
}

/// Cut a device name to [`DEVICE_NAME_MAX_LEN`] characters.
pub fn limit_device_name(name: &str) -> String {
    name.chars().take(DEVICE_NAME_MAX_LEN).collect()
}

/// Local hostname, or `host` when it cannot be read.
fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "host".to_string())
}

/// Run the interactive login and registration flow.
///
/// Returns the credentials to store; nothing is persisted here.
pub async fn login_and_register<R: BufRead, W: Write>(
    client: &PushoverClient,
    prompter: &mut Prompter<R, W>,
    default_name: &str,
) -> Result<StoredCredentials> {
    let secret = loop {
        let email = prompter.ask("Email")?;
        let password = prompter.ask_secret("Password")?;
        let twofa = prompter.ask("2FA code (leave empty if disabled)")?;

        match client.login(&email, &password, &twofa).await {
            Ok(login) => break login.secret,
            Err(e) => {
                log::debug!("Login failed: {e:#}");
                prompter.say(&format!("Login failed: {e:#}"))?;
                prompter.say("Please try again.")?;
            }
        }
    };

    let mut credentials = StoredCredentials::default();
    credentials.set_user_secret(secret.clone());

    let name = limit_device_name(&prompter.ask_with_default("Device name", default_name)?);
    let registration = client
        .register(&secret, &name)
        .await
        .with_context(|| format!("error registering device {name}"))?;

    credentials.set_device_id(registration.id);
    prompter.say(&format!("Registered device {name}"))?;
    Ok(credentials)
}

/// Entry point for `pushwire init`.
pub async fn run(config: &Config) -> Result<()> {
    let client = PushoverClient::new(&config.api_url)?;
    let stdin = std::io::stdin();
    let interactive = stdin.is_terminal();
    let mut prompter =
        Prompter::new(stdin.lock(), std::io::stdout()).hiding_secrets(interactive);

    let default_name = default_device_name(&local_hostname());
    let credentials = login_and_register(&client, &mut prompter, &default_name).await?;

    credentials.save().context("error storing credentials")?;
    prompter.say("Credentials saved. Run `pushwire listen` to receive messages.")?;
    Ok(())
}

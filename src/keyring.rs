//! Credential storage.
//!
//! The user secret and device ID are stored together as one JSON document in
//! a single OS keyring entry (`pushwire/credentials`), so a new build
//! triggers at most one keychain prompt.
//!
//! In test mode (`PUSHWIRE_ENV=test`, or any `cargo test` build) the keyring
//! is never touched; credentials live in `{config_dir}/credentials.json`
//! with mode 0600 instead.
//!
//! # Graceful Degradation
//!
//! Keyring access can fail transiently (locked keychain, binary signature
//! change). Loading retries a few times, distinguishes a missing entry from
//! a locked or denied one, and falls back to empty credentials so the caller
//! can ask the user to run `init` again.

use anyhow::Result;
use keyring::Entry;
use serde::{Deserialize, Serialize};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crate::listener::Credentials;

/// Keyring service name.
const KEYRING_SERVICE: &str = "pushwire";
/// Consolidated keyring entry name.
const KEYRING_CREDENTIALS: &str = "credentials";

/// Number of attempts for keyring access.
const KEYRING_RETRY_ATTEMPTS: u32 = 2;
/// Delay between attempts in milliseconds.
const KEYRING_RETRY_DELAY_MS: u64 = 500;

/// Categorized keyring access errors.
#[derive(Debug)]
pub enum KeyringAccessError {
    /// Keyring is locked and requires user interaction to unlock.
    Locked(String),
    /// Entry does not exist (normal before `init`).
    NotFound,
    /// Access denied, likely due to binary signature change.
    AccessDenied(String),
    /// Data exists but is corrupted or unparseable.
    Corrupted(String),
    /// Other/unknown error.
    Other(String),
}

impl std::fmt::Display for KeyringAccessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Locked(msg) => write!(f, "Keyring locked: {msg}"),
            Self::NotFound => write!(f, "Keyring entry not found"),
            Self::AccessDenied(msg) => write!(f, "Keyring access denied: {msg}"),
            Self::Corrupted(msg) => write!(f, "Keyring data corrupted: {msg}"),
            Self::Other(msg) => write!(f, "Keyring error: {msg}"),
        }
    }
}

impl std::error::Error for KeyringAccessError {}

/// Categorize a keyring error.
fn categorize_keyring_error(err: &keyring::Error) -> KeyringAccessError {
    if matches!(err, keyring::Error::NoEntry) {
        return KeyringAccessError::NotFound;
    }

    let msg = format!("{err:?}");
    let msg_lower = msg.to_lowercase();

    if msg_lower.contains("user interaction") || msg_lower.contains("user canceled") {
        return KeyringAccessError::Locked(msg);
    }

    if msg_lower.contains("denied")
        || msg_lower.contains("codesign")
        || msg_lower.contains("authorization")
        || msg_lower.contains("not allowed")
    {
        return KeyringAccessError::AccessDenied(msg);
    }

    KeyringAccessError::Other(msg)
}

/// Check if keyring should be skipped (any test mode).
fn should_skip_keyring() -> bool {
    #[cfg(test)]
    {
        true
    }

    #[cfg(not(test))]
    {
        crate::env::should_skip_keyring()
    }
}

/// Credentials file path for test mode.
fn credentials_file_path() -> Result<PathBuf> {
    crate::config::Config::config_dir().map(|d| d.join("credentials.json"))
}

/// Credentials persisted between runs.
///
/// `user_secret` is written by `init` after login, `device_id` after device
/// registration; both are required before `listen` can connect.
#[derive(Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct StoredCredentials {
    /// User secret returned by login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_secret: Option<String>,

    /// Registered device ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,

    /// Schema version for future migrations.
    #[serde(default = "default_version")]
    pub version: u8,
}

fn default_version() -> u8 {
    1
}

impl std::fmt::Debug for StoredCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCredentials")
            .field("user_secret", &self.user_secret.as_ref().map(|_| "<redacted>"))
            .field("device_id", &self.device_id)
            .field("version", &self.version)
            .finish()
    }
}

impl StoredCredentials {
    /// Load credentials from keyring (or file in test mode).
    pub fn load() -> Result<Self> {
        if should_skip_keyring() {
            return Self::load_from_file();
        }

        Ok(Self::load_from_keyring_with_retry())
    }

    /// Load from keyring with retry logic for transient failures.
    ///
    /// Returns empty credentials when the keyring stays unavailable.
    fn load_from_keyring_with_retry() -> Self {
        let mut last_error: Option<KeyringAccessError> = None;

        for attempt in 0..KEYRING_RETRY_ATTEMPTS {
            if attempt > 0 {
                log::debug!(
                    "Retrying keyring access (attempt {}/{})",
                    attempt + 1,
                    KEYRING_RETRY_ATTEMPTS
                );
                thread::sleep(Duration::from_millis(KEYRING_RETRY_DELAY_MS));
            }

            match Self::try_load_from_keyring() {
                Ok(creds) => return creds,
                Err(KeyringAccessError::NotFound) => {
                    log::debug!("No credentials found in keyring, returning empty");
                    return Self::default();
                }
                Err(err @ KeyringAccessError::Corrupted(_)) => {
                    log::warn!("{}, returning empty credentials", err);
                    return Self::default();
                }
                Err(err) => {
                    log::debug!("Keyring access attempt {} failed: {}", attempt + 1, err);
                    last_error = Some(err);
                }
            }
        }

        if let Some(err) = &last_error {
            log::warn!(
                "Keyring access failed after {} attempts: {}. \
                 Credentials may need to be re-entered with `pushwire init`.",
                KEYRING_RETRY_ATTEMPTS,
                err
            );

            if matches!(err, KeyringAccessError::AccessDenied(_)) {
                log::info!(
                    "Hint: Binary signature may have changed. \
                     Unlock your keychain or run `pushwire init` again."
                );
            }
        }

        Self::default()
    }

    fn try_load_from_keyring() -> std::result::Result<Self, KeyringAccessError> {
        let entry = Entry::new(KEYRING_SERVICE, KEYRING_CREDENTIALS)
            .map_err(|e| KeyringAccessError::Other(format!("Failed to create entry: {e:?}")))?;

        match entry.get_password() {
            Ok(json) => {
                let creds: Self = serde_json::from_str(&json)
                    .map_err(|e| KeyringAccessError::Corrupted(format!("JSON parse error: {e}")))?;
                log::debug!("Loaded credentials from keyring");
                Ok(creds)
            }
            Err(e) => Err(categorize_keyring_error(&e)),
        }
    }

    fn load_from_file() -> Result<Self> {
        let path = credentials_file_path()?;
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let creds: Self = serde_json::from_str(&content)?;
            log::debug!("Loaded credentials from file (test mode)");
            Ok(creds)
        } else {
            log::debug!("No credentials file found, returning empty");
            Ok(Self::default())
        }
    }

    /// Save credentials to keyring (or file in test mode).
    pub fn save(&self) -> Result<()> {
        if should_skip_keyring() {
            return self.save_to_file();
        }

        let entry = Entry::new(KEYRING_SERVICE, KEYRING_CREDENTIALS)
            .map_err(|e| anyhow::anyhow!("Failed to create keyring entry: {e:?}"))?;

        let json = serde_json::to_string(self)?;
        entry
            .set_password(&json)
            .map_err(|e| anyhow::anyhow!("Failed to store credentials in keyring: {e:?}"))?;

        log::info!("Saved credentials to OS keyring");
        Ok(())
    }

    fn save_to_file(&self) -> Result<()> {
        let path = credentials_file_path()?;
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)?;

        #[cfg(unix)]
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;

        log::debug!("Saved credentials to file (test mode)");
        Ok(())
    }

    /// Delete stored credentials.
    pub fn delete() -> Result<()> {
        if should_skip_keyring() {
            let path = credentials_file_path()?;
            if path.exists() {
                fs::remove_file(&path)?;
            }
            return Ok(());
        }

        let entry = Entry::new(KEYRING_SERVICE, KEYRING_CREDENTIALS)
            .map_err(|e| anyhow::anyhow!("Failed to create keyring entry: {e:?}"))?;

        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {}
            Err(e) => anyhow::bail!("Failed to delete credentials from keyring: {e:?}"),
        }
        log::info!("Deleted credentials from OS keyring");
        Ok(())
    }

    /// Set the user secret.
    pub fn set_user_secret(&mut self, secret: String) {
        self.user_secret = Some(secret);
    }

    /// Set the registered device ID.
    pub fn set_device_id(&mut self, device_id: String) {
        self.device_id = Some(device_id);
    }

    /// Push socket credentials, when both halves are present and non-empty.
    pub fn session_credentials(&self) -> Option<Credentials> {
        match (self.device_id.as_deref(), self.user_secret.as_deref()) {
            (Some(device_id), Some(secret)) if !device_id.is_empty() && !secret.is_empty() => {
                Some(Credentials::new(device_id, secret))
            }
            _ => None,
        }
    }
}

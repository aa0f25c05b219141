//! Pushwire - Pushover Open Client listener.
//!
//! Keeps a WebSocket session with the Pushover push service open, reacts to
//! its one-byte control signals, and downloads, acknowledges and prints
//! messages over the REST API whenever the server says new ones are waiting.
//!
//! # Architecture
//!
//! - **Listener** - connector, session loop and reconnect supervisor
//! - **Protocol** - control byte decoding
//! - **API** - REST client for login, registration, download and delete
//! - **Output** - JSON, text and template formatters
//!
//! # Modules
//!
//! - [`listener`] - Push session and reconnect supervisor
//! - [`api`] - Pushover REST client
//! - [`config`] - Configuration loading/saving
//! - [`keyring`] - Credential storage

pub mod api;
pub mod commands;
pub mod listener;
pub mod output;
pub mod protocol;
pub mod ws;

pub mod config;
pub mod constants;
pub mod env;
pub mod keyring;

// Re-export commonly used types
pub use api::{AuthorizedClient, Message, PushoverClient};
pub use config::Config;
pub use listener::{Credentials, Listener, MessageCallback, ReconnectPolicy, SessionEnd};
pub use output::{Formatter, OutputFormat};
pub use protocol::ControlSignal;

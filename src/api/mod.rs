//! Pushover Open Client REST API.
//!
//! The push socket only says "something is waiting"; the message bodies are
//! fetched and acknowledged here:
//!
//! - `POST /users/login.json` - exchange email/password for a user secret
//! - `POST /devices.json` - register this client as a device
//! - `GET /messages.json` - download pending messages
//! - `POST /devices/<id>/update_highest_message.json` - delete up to an id
//!
//! # Modules
//!
//! - [`client`] - HTTP client
//! - [`types`] - Response types

pub mod client;
pub mod types;

pub use client::{AuthorizedClient, PushoverClient};
pub use types::{
    ApiResponse, ApiStatus, DeleteResponse, Device, DownloadResponse, LoginResponse, Message,
    RegistrationResponse, User,
};

//! Pushover Open Client API response types.
//!
//! Every response carries a `status` (1 = success) and a `request` id, plus
//! an `errors` field on failure. The error payload is either a list of
//! strings or an object of per-field lists depending on the endpoint, so it
//! is kept as raw JSON.

use serde::{Deserialize, Serialize};

/// Status block shared by every API response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiStatus {
    /// 1 on success, anything else on failure.
    #[serde(default)]
    pub status: i64,
    /// Request identifier, useful when reporting problems.
    #[serde(default)]
    pub request: String,
    /// Error details, present on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
}

impl ApiStatus {
    /// Whether the API reported success.
    pub fn is_valid(&self) -> bool {
        self.status == 1
    }

    /// Fail with a descriptive error unless the API reported success.
    pub fn ensure_valid(&self, action: &str) -> anyhow::Result<()> {
        if self.is_valid() {
            return Ok(());
        }
        let errors = self
            .errors
            .as_ref()
            .map_or_else(|| "none".to_string(), ToString::to_string);
        anyhow::bail!(
            "error {}: status: {}, request: {}, errors: {}",
            action,
            self.status,
            self.request,
            errors
        )
    }
}

/// Types that embed an [`ApiStatus`].
pub trait ApiResponse {
    /// The response's status block.
    fn api_status(&self) -> &ApiStatus;
}

macro_rules! impl_api_response {
    ($($ty:ty),* $(,)?) => {
        $(impl ApiResponse for $ty {
            fn api_status(&self) -> &ApiStatus {
                &self.status
            }
        })*
    };
}

impl_api_response!(LoginResponse, RegistrationResponse, DownloadResponse, DeleteResponse);

/// Response from `POST /users/login.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    /// User key.
    #[serde(default)]
    pub id: String,
    /// User secret used for every other call.
    #[serde(default)]
    pub secret: String,
    /// Status block.
    #[serde(flatten)]
    pub status: ApiStatus,
}

/// Response from `POST /devices.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationResponse {
    /// Newly registered device ID.
    #[serde(default)]
    pub id: String,
    /// Status block.
    #[serde(flatten)]
    pub status: ApiStatus,
}

/// Response from `GET /messages.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadResponse {
    /// Pending messages, oldest first.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Account details.
    #[serde(default)]
    pub user: User,
    /// Device settings.
    #[serde(default)]
    pub device: Device,
    /// Status block.
    #[serde(flatten)]
    pub status: ApiStatus,
}

impl DownloadResponse {
    /// Highest message id in the response, or 0 when empty.
    ///
    /// Acknowledging this id deletes every message up to and including it.
    pub fn max_id(&self) -> i64 {
        self.messages.iter().map(|m| m.id).max().unwrap_or(0).max(0)
    }
}

/// Response from `POST /devices/<id>/update_highest_message.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteResponse {
    /// Status block.
    #[serde(flatten)]
    pub status: ApiStatus,
}

/// A downloaded message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    /// Message id, increasing per device.
    pub id: i64,
    /// Message id as a string.
    pub id_str: String,
    /// Message body.
    pub message: String,
    /// Name of the sending application.
    pub app: String,
    /// Sending application id.
    pub aid: i64,
    /// Sending application id as a string.
    pub aid_str: String,
    /// Icon name of the sending application.
    pub icon: String,
    /// Unix timestamp the message was sent.
    pub date: i64,
    /// Priority, -2 to 2.
    pub priority: i64,
    /// Whether an emergency-priority message was acknowledged.
    pub acked: i64,
    /// Unique message id across all devices.
    pub umid: i64,
    /// Unique message id as a string.
    pub umid_str: String,
    /// Message title.
    pub title: String,
    /// Unix timestamp the message was dispatched.
    pub dispatched_date: i64,
    /// Supplementary URL.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
    /// Unix timestamp the message was queued, when delayed.
    #[serde(skip_serializing_if = "is_zero")]
    pub queued_date: i64,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

/// Account details returned with a download.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    /// Quiet hours are active.
    pub quiet_hours: bool,
    /// Android license.
    pub is_android_licensed: bool,
    /// iOS license.
    pub is_ios_licensed: bool,
    /// Desktop license.
    pub is_desktop_licensed: bool,
    /// Account email.
    pub email: String,
    /// Unix timestamp of account creation.
    pub created_at: i64,
    /// First email alias.
    pub first_email_alias: Option<String>,
}

/// Device settings returned with a download.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Device {
    /// Device name.
    pub name: String,
    /// End-to-end encryption enabled.
    pub encryption_enabled: bool,
    /// Default sound.
    pub default_sound: String,
    /// Always use the default sound.
    pub always_use_default_sound: bool,
    /// Default high priority sound.
    pub default_high_priority_sound: String,
    /// Always use the default high priority sound.
    pub always_use_default_high_priority_sound: bool,
    /// Dismissal sync enabled.
    pub dismissal_sync_enabled: bool,
}

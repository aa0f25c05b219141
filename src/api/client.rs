//! HTTP client for the Pushover Open Client API.
//!
//! [`PushoverClient`] covers the unauthenticated calls (login, device
//! registration) and the raw message calls. [`AuthorizedClient`] binds a
//! registered device's [`Credentials`] to a client for the download and
//! acknowledge cycle driven by the listener callback.

use anyhow::{Context, Result};
use reqwest::multipart::Form;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::types::{
    ApiResponse, DeleteResponse, DownloadResponse, LoginResponse, RegistrationResponse,
};
use crate::constants::{self, DEFAULT_API_URL, DEVICE_OS};
use crate::listener::Credentials;

/// Client for the Pushover Open Client REST API.
#[derive(Debug, Clone)]
pub struct PushoverClient {
    client: Client,
    api_url: String,
}

impl Default for PushoverClient {
    fn default() -> Self {
        Self::with_client(Client::new(), DEFAULT_API_URL)
    }
}

impl PushoverClient {
    /// Creates a client for the given API base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(api_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(constants::HTTP_REQUEST_TIMEOUT)
            .build()
            .context("error creating HTTP client")?;

        Ok(Self::with_client(client, api_url))
    }

    /// Creates a client with a pre-configured HTTP client.
    pub fn with_client(client: Client, api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self { client, api_url }
    }

    /// Returns the API base URL.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }

    /// Logs in with email and password, returning the user secret.
    ///
    /// `twofa` is only sent when non-empty.
    pub async fn login(&self, email: &str, password: &str, twofa: &str) -> Result<LoginResponse> {
        let mut form = Form::new()
            .text("email", email.to_string())
            .text("password", password.to_string());
        if !twofa.is_empty() {
            form = form.text("twofa", twofa.to_string());
        }

        let response = self
            .client
            .post(self.endpoint("users/login.json"))
            .multipart(form)
            .send()
            .await
            .context("error sending login request")?;

        parse_response(response, "logging in").await
    }

    /// Registers this client as a new open-client device.
    pub async fn register(&self, secret: &str, name: &str) -> Result<RegistrationResponse> {
        let form = Form::new()
            .text("secret", secret.to_string())
            .text("name", name.to_string())
            .text("os", DEVICE_OS);

        let response = self
            .client
            .post(self.endpoint("devices.json"))
            .multipart(form)
            .send()
            .await
            .context("error sending registration request")?;

        let registration: RegistrationResponse = parse_response(response, "registering").await?;
        log::info!("Registered device {} as {}", name, registration.id);
        Ok(registration)
    }

    /// Downloads every pending message for a device.
    pub async fn download_messages(
        &self,
        secret: &str,
        device_id: &str,
    ) -> Result<DownloadResponse> {
        let response = self
            .client
            .get(self.endpoint("messages.json"))
            .query(&[("secret", secret), ("device_id", device_id)])
            .send()
            .await
            .context("error sending download request")?;

        let download: DownloadResponse = parse_response(response, "downloading").await?;
        log::debug!("Downloaded {} message(s)", download.messages.len());
        Ok(download)
    }

    /// Deletes every message up to and including `highest_id`.
    pub async fn delete_messages(
        &self,
        secret: &str,
        device_id: &str,
        highest_id: i64,
    ) -> Result<DeleteResponse> {
        let form = Form::new()
            .text("secret", secret.to_string())
            .text("message", highest_id.to_string());

        let response = self
            .client
            .post(self.endpoint(&format!(
                "devices/{device_id}/update_highest_message.json"
            )))
            .multipart(form)
            .send()
            .await
            .context("error sending delete request")?;

        let deleted: DeleteResponse = parse_response(response, "deleting messages").await?;
        log::debug!("Deleted messages up to {}", highest_id);
        Ok(deleted)
    }
}

/// Read a response body, checking the HTTP status and the API status.
async fn parse_response<T>(response: Response, action: &str) -> Result<T>
where
    T: DeserializeOwned + ApiResponse,
{
    let status = response.status();
    let body = response
        .text()
        .await
        .context("error reading response body")?;

    if status != StatusCode::OK {
        anyhow::bail!("error {}: {} - {}", action, status, body);
    }

    let parsed: T = serde_json::from_str(&body)
        .with_context(|| format!("error parsing response while {action}"))?;
    parsed.api_status().ensure_valid(action)?;

    Ok(parsed)
}

/// API client bound to a registered device.
#[derive(Debug, Clone)]
pub struct AuthorizedClient {
    client: PushoverClient,
    credentials: Credentials,
}

impl AuthorizedClient {
    /// Bind credentials to a client.
    pub fn new(client: PushoverClient, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
        }
    }

    /// Device credentials.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Downloads pending messages for this device.
    pub async fn download(&self) -> Result<DownloadResponse> {
        self.client
            .download_messages(&self.credentials.secret, &self.credentials.device_id)
            .await
    }

    /// Deletes messages up to and including `highest_id`.
    pub async fn delete_messages(&self, highest_id: i64) -> Result<DeleteResponse> {
        self.client
            .delete_messages(
                &self.credentials.secret,
                &self.credentials.device_id,
                highest_id,
            )
            .await
    }

    /// Downloads pending messages, then acknowledges them.
    ///
    /// The delete call is skipped when nothing was downloaded. If the delete
    /// fails the downloaded messages are not returned, so they will be
    /// delivered again on the next download.
    pub async fn download_and_delete(
        &self,
    ) -> Result<(DownloadResponse, Option<DeleteResponse>)> {
        let download = self.download().await?;
        if download.messages.is_empty() {
            return Ok((download, None));
        }

        let deleted = self.delete_messages(download.max_id()).await?;
        Ok((download, Some(deleted)))
    }
}

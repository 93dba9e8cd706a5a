//! HTTP client for the device-sync endpoint.

use bizsync_core::util::{compact_text, is_http_url, normalize_text_option};
use bizsync_core::{Action, PeerDevice, SyncBatch, SyncReport, SyncRequest, SyncResponse};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::CliError;
use crate::identity::DeviceIdentity;

const DEVICE_SYNC_PATH: &str = "/v1/device-sync";

#[derive(Debug, Clone)]
pub struct DeviceClient {
    endpoint: String,
    identity: DeviceIdentity,
    client: reqwest::Client,
}

impl DeviceClient {
    pub fn new(api_url: &str, identity: DeviceIdentity) -> Result<Self, CliError> {
        Ok(Self {
            endpoint: device_sync_endpoint(api_url)?,
            identity,
            client: reqwest::Client::builder().build()?,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub const fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub async fn register(&self) -> Result<(), CliError> {
        self.expect_ack(Action::Register).await
    }

    pub async fn unregister(&self) -> Result<(), CliError> {
        self.expect_ack(Action::Unregister).await
    }

    pub async fn discover(&self) -> Result<Vec<PeerDevice>, CliError> {
        match self.send(Action::Discover, None).await? {
            SyncResponse::Devices { devices } => Ok(devices),
            other => Err(unexpected(Action::Discover, &other)),
        }
    }

    pub async fn sync(&self, batch: SyncBatch) -> Result<SyncReport, CliError> {
        match self.send(Action::Sync, Some(batch)).await? {
            SyncResponse::Report(report) => Ok(report),
            other => Err(unexpected(Action::Sync, &other)),
        }
    }

    async fn expect_ack(&self, action: Action) -> Result<(), CliError> {
        match self.send(action, None).await? {
            SyncResponse::Ack { success: true } => Ok(()),
            other => Err(unexpected(action, &other)),
        }
    }

    async fn send(&self, action: Action, data: Option<SyncBatch>) -> Result<SyncResponse, CliError> {
        let request = SyncRequest {
            action: action.as_str().to_string(),
            device_id: self.identity.device_id.clone(),
            device_name: self.identity.device_name.clone(),
            data,
        };
        tracing::debug!(action = action.as_str(), endpoint = %self.endpoint, "Sending device request");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CliError::Api(parse_api_error(status, &body)));
        }

        Ok(response.json::<SyncResponse>().await?)
    }
}

fn unexpected(action: Action, response: &SyncResponse) -> CliError {
    CliError::UnexpectedResponse {
        action: action.as_str(),
        body: serde_json::to_string(response).unwrap_or_default(),
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

pub fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.error.or(payload.message) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

/// Accepts a bare base URL or one that already ends with the sync path
pub fn device_sync_endpoint(api_url: &str) -> Result<String, CliError> {
    let base = normalize_text_option(Some(api_url.to_string()))
        .ok_or_else(|| CliError::Config("API URL must not be empty".to_string()))?;
    if !is_http_url(&base) {
        return Err(CliError::Config(
            "API URL must include http:// or https://".to_string(),
        ));
    }

    let base = base.trim_end_matches('/');
    if base.ends_with(DEVICE_SYNC_PATH) {
        Ok(base.to_string())
    } else {
        Ok(format!("{base}{DEVICE_SYNC_PATH}"))
    }
}

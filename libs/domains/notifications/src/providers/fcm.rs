//! Firebase Cloud Messaging (HTTP v1) push sender.

use super::{ChannelSender, SendReceipt};
use crate::error::{NotificationError, NotificationResult};
use crate::models::{Channel, NotificationMessage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

/// FCM API configuration.
#[derive(Debug, Clone)]
pub struct FcmConfig {
    /// Firebase project the messages are sent through.
    pub project_id: String,
    /// OAuth2 bearer token with the `firebase.messaging` scope.
    pub access_token: String,
    /// API base URL (defaults to production).
    pub api_url: String,
    /// Ask FCM to validate without delivering.
    pub validate_only: bool,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl FcmConfig {
    /// Create a new FCM configuration.
    pub fn new(project_id: String, access_token: String) -> Self {
        Self {
            project_id,
            access_token,
            api_url: "https://fcm.googleapis.com/v1".to_string(),
            validate_only: false,
            timeout: Duration::from_secs(10),
        }
    }

    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self, NotificationError> {
        let project_id = std::env::var("FCM_PROJECT_ID")
            .map_err(|_| NotificationError::ConfigError("FCM_PROJECT_ID not set".to_string()))?;
        let access_token = std::env::var("FCM_ACCESS_TOKEN")
            .map_err(|_| NotificationError::ConfigError("FCM_ACCESS_TOKEN not set".to_string()))?;

        let mut config = Self::new(project_id, access_token);
        if let Ok(api_url) = std::env::var("FCM_API_URL") {
            config.api_url = api_url.trim_end_matches('/').to_string();
        }
        if let Ok(value) = std::env::var("FCM_VALIDATE_ONLY") {
            config.validate_only = value == "true" || value == "1";
        }
        Ok(config)
    }

    /// Builder method to set validate-only mode.
    pub fn with_validate_only(mut self, validate_only: bool) -> Self {
        self.validate_only = validate_only;
        self
    }

    pub fn send_url(&self) -> String {
        format!("{}/projects/{}/messages:send", self.api_url, self.project_id)
    }
}

/// Push sender backed by FCM.
pub struct FcmSender {
    config: FcmConfig,
    client: Client,
}

impl FcmSender {
    pub fn new(config: FcmConfig) -> NotificationResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NotificationError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    /// Create a sender from environment variables.
    pub fn from_env() -> NotificationResult<Self> {
        Self::new(FcmConfig::from_env()?)
    }

    pub fn config(&self) -> &FcmConfig {
        &self.config
    }
}

// FCM v1 request/response structures

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    validate_only: bool,
    message: FcmMessage<'a>,
}

#[derive(Debug, Serialize)]
struct FcmMessage<'a> {
    token: &'a str,
    notification: FcmNotification<'a>,
    data: FcmData<'a>,
}

#[derive(Debug, Serialize)]
struct FcmNotification<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct FcmData<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    click_action: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    status: Option<String>,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
}

fn build_request<'a>(
    address: &'a str,
    message: &'a NotificationMessage,
    validate_only: bool,
) -> SendRequest<'a> {
    SendRequest {
        validate_only,
        message: FcmMessage {
            token: address,
            notification: FcmNotification {
                title: &message.title,
                body: &message.body,
            },
            data: FcmData {
                kind: &message.data.kind,
                click_action: &message.data.click_action,
            },
        },
    }
}

/// Turn an FCM error response into a provider failure.
///
/// The code is the FCM `errorCode` detail when present, then the Google
/// status string, then the HTTP status.
fn provider_error(status: reqwest::StatusCode, body: &str) -> NotificationError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let code = envelope
                .error
                .details
                .iter()
                .find_map(|d| d.error_code.clone())
                .or(envelope.error.status)
                .unwrap_or_else(|| status.as_u16().to_string());
            NotificationError::send_failed(code, envelope.error.message)
        }
        Err(_) => NotificationError::send_failed(status.as_u16().to_string(), body.to_string()),
    }
}

#[async_trait]
impl ChannelSender for FcmSender {
    fn channel(&self) -> Channel {
        Channel::Push
    }

    fn name(&self) -> &'static str {
        "FCM"
    }

    async fn send(
        &self,
        address: &str,
        message: &NotificationMessage,
    ) -> NotificationResult<SendReceipt> {
        debug!(
            project = %self.config.project_id,
            validate_only = self.config.validate_only,
            "Sending push via FCM"
        );

        let request = build_request(address, message, self.config.validate_only);

        let response = self
            .client
            .post(self.config.send_url())
            .bearer_auth(&self.config.access_token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let err = provider_error(status, &body);
            error!(status = %status, error = %err, "FCM rejected push");
            return Err(err);
        }

        let message_id = serde_json::from_str::<SendResponse>(&body)
            .ok()
            .and_then(|r| r.name);

        info!(message_id = ?message_id, "Push accepted by FCM");

        Ok(SendReceipt { message_id })
    }
}

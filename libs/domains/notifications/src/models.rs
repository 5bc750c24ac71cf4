//! Data models for the notifications domain.

use crate::error::{NotificationError, NotificationResult};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use strum::{AsRefStr, Display, EnumString};

// ============================================================================
// Channels
// ============================================================================

/// Delivery mechanism with its own sender and per-user address.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Channel {
    /// Mobile push through Firebase Cloud Messaging.
    Push,
    /// Plain email.
    Email,
}

impl Channel {
    /// Every channel the dispatcher knows about.
    pub const ALL: [Channel; 2] = [Channel::Push, Channel::Email];

    /// Field in the user settings document that enables this channel.
    pub fn preference_field(&self) -> &'static str {
        match self {
            Channel::Push => "pushNotifications",
            Channel::Email => "emailNotifications",
        }
    }

    /// Field in the user tokens document that holds this channel's address.
    pub fn address_field(&self) -> &'static str {
        match self {
            Channel::Push => "fcmToken",
            Channel::Email => "email",
        }
    }

    /// Click action attached to every message sent on this channel.
    pub fn click_action(&self) -> &'static str {
        match self {
            Channel::Push => "FLUTTER_NOTIFICATION_CLICK",
            Channel::Email => "OPEN_NOTIFICATION",
        }
    }
}

// ============================================================================
// Inbound events
// ============================================================================

/// A notification record was created for a user.
///
/// Identifiers are validated by [`NotificationEvent::validate`]; content
/// fields are optional and defaulted when the message is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub notification_id: String,
    /// Category tag, `"general"` when absent.
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub body: Option<String>,
}

impl NotificationEvent {
    /// Create an event with no content fields set.
    pub fn new(user_id: impl Into<String>, notification_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            notification_id: notification_id.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Reject events that cannot be routed to a user.
    pub fn validate(&self) -> NotificationResult<()> {
        if self.user_id.trim().is_empty() {
            return Err(NotificationError::MalformedEvent(
                "missing userId".to_string(),
            ));
        }
        if self.notification_id.trim().is_empty() {
            return Err(NotificationError::MalformedEvent(
                "missing notificationId".to_string(),
            ));
        }
        Ok(())
    }
}

/// Content of a created notification document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NotificationContent {
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub body: Option<String>,
}

/// Payload delivered by the ingestion trigger.
///
/// Either the created document (path + data) or an already flattened event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum NotificationCreated {
    Document {
        document: String,
        /// `null` and absent both read as empty content.
        #[serde(default)]
        data: Option<NotificationContent>,
    },
    Event(NotificationEvent),
}

impl NotificationCreated {
    /// Resolve the trigger payload into an event.
    pub fn into_event(self) -> NotificationResult<NotificationEvent> {
        match self {
            NotificationCreated::Document { document, data } => {
                let (user_id, notification_id) = parse_document_path(&document)?;
                let data = data.unwrap_or_default();
                Ok(NotificationEvent {
                    user_id,
                    notification_id,
                    kind: data.kind,
                    title: data.title,
                    body: data.body,
                })
            }
            NotificationCreated::Event(event) => Ok(event),
        }
    }
}

/// Extract `(userId, notificationId)` from
/// `user_notifications/{userId}/notifications/{notificationId}`.
///
/// Fully qualified Firestore names (`projects/.../documents/...`) are accepted.
pub fn parse_document_path(path: &str) -> NotificationResult<(String, String)> {
    let relative = path
        .rsplit_once("/documents/")
        .map(|(_, rest)| rest)
        .unwrap_or(path)
        .trim_matches('/');

    let segments: Vec<&str> = relative.split('/').collect();
    match segments.as_slice() {
        ["user_notifications", user_id, "notifications", notification_id]
            if !user_id.is_empty() && !notification_id.is_empty() =>
        {
            Ok((user_id.to_string(), notification_id.to_string()))
        }
        _ => Err(NotificationError::MalformedEvent(format!(
            "unexpected document path '{}'",
            path
        ))),
    }
}

/// Strings pass through, any other JSON value reads as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        _ => None,
    })
}

// ============================================================================
// Store snapshots
// ============================================================================

/// Point-in-time read of a user's channel flags.
///
/// A channel missing from the snapshot is disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferenceSnapshot {
    flags: HashMap<Channel, bool>,
}

impl PreferenceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set a channel flag.
    pub fn with(mut self, channel: Channel, enabled: bool) -> Self {
        self.flags.insert(channel, enabled);
        self
    }

    /// Build a snapshot from raw settings document fields.
    ///
    /// `true` and `1` (any case, surrounding whitespace ignored) enable a
    /// channel; every other value disables it.
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let raw: HashMap<String, String> = fields
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
            .collect();

        let flags = Channel::ALL
            .iter()
            .filter_map(|channel| {
                raw.get(channel.preference_field()).map(|value| {
                    let value = value.trim();
                    let enabled = value.eq_ignore_ascii_case("true") || value == "1";
                    (*channel, enabled)
                })
            })
            .collect();

        Self { flags }
    }

    pub fn is_enabled(&self, channel: Channel) -> bool {
        self.flags.get(&channel).copied().unwrap_or(false)
    }
}

/// Point-in-time read of a user's address on one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSnapshot {
    address: String,
}

impl TokenSnapshot {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Blank addresses make the channel unreachable.
    pub fn is_usable(&self) -> bool {
        !self.address.trim().is_empty()
    }
}

// ============================================================================
// Plans and outcomes
// ============================================================================

/// Fully rendered message handed to a channel sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationMessage {
    pub title: String,
    pub body: String,
    pub data: MessageData,
}

/// Structured payload travelling with the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageData {
    #[serde(rename = "type")]
    pub kind: String,
    pub click_action: String,
}

/// Why a channel was not attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SkipReason {
    /// Preferences missing, or the channel flag is off.
    Disabled,
    /// No usable address stored for the channel.
    NoAddress,
}

/// Decision for one channel of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchPlan {
    /// Send `message` to `address`. Address and title are never empty.
    Deliver {
        channel: Channel,
        address: String,
        message: NotificationMessage,
    },
    Skipped {
        channel: Channel,
        reason: SkipReason,
    },
}

impl DispatchPlan {
    pub fn channel(&self) -> Channel {
        match self {
            DispatchPlan::Deliver { channel, .. } | DispatchPlan::Skipped { channel, .. } => {
                *channel
            }
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, DispatchPlan::Skipped { .. })
    }
}

/// Category of a failed delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    /// Provider answered with an error code.
    Provider { code: String },
    /// Provider unreachable.
    Transport,
    /// Address rejected before sending.
    InvalidAddress,
    /// Sender is misconfigured.
    Configuration,
    Internal,
}

impl FailureKind {
    /// Low-cardinality label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            FailureKind::Provider { .. } => "provider",
            FailureKind::Transport => "transport",
            FailureKind::InvalidAddress => "invalid_address",
            FailureKind::Configuration => "configuration",
            FailureKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Provider { code } => write!(f, "provider:{}", code),
            other => write!(f, "{}", other.label()),
        }
    }
}

impl From<&NotificationError> for FailureKind {
    fn from(err: &NotificationError) -> Self {
        match err {
            NotificationError::SendFailed { code, .. } => FailureKind::Provider { code: code.clone() },
            NotificationError::Transport(_) | NotificationError::StoreUnavailable(_) => {
                FailureKind::Transport
            }
            NotificationError::InvalidAddress(_) => FailureKind::InvalidAddress,
            NotificationError::ConfigError(_) => FailureKind::Configuration,
            NotificationError::MalformedEvent(_) | NotificationError::Internal(_) => {
                FailureKind::Internal
            }
        }
    }
}

/// Terminal result of one channel for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Sent {
        #[serde(skip_serializing_if = "Option::is_none")]
        receipt: Option<String>,
    },
    Skipped {
        reason: SkipReason,
    },
    Failed {
        error: FailureKind,
    },
}

impl OutcomeStatus {
    pub fn tag(&self) -> &'static str {
        match self {
            OutcomeStatus::Sent { .. } => "sent",
            OutcomeStatus::Skipped { .. } => "skipped",
            OutcomeStatus::Failed { .. } => "failed",
        }
    }
}

/// Outcome of one channel, as logged and returned by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    pub channel: Channel,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl DispatchOutcome {
    pub fn sent(channel: Channel, receipt: Option<String>) -> Self {
        Self {
            channel,
            status: OutcomeStatus::Sent { receipt },
        }
    }

    pub fn skipped(channel: Channel, reason: SkipReason) -> Self {
        Self {
            channel,
            status: OutcomeStatus::Skipped { reason },
        }
    }

    pub fn failed(channel: Channel, error: FailureKind) -> Self {
        Self {
            channel,
            status: OutcomeStatus::Failed { error },
        }
    }
}

/// What the ingestion trigger gets back for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchReport {
    Dispatched {
        notification_id: String,
        outcomes: Vec<DispatchOutcome>,
    },
    Aborted {
        reason: String,
    },
}

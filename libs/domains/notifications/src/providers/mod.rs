//! Channel sender implementations.
//!
//! This module contains the `ChannelSender` trait and one implementation
//! per delivery channel.

mod fcm;
mod smtp;

pub use fcm::{FcmConfig, FcmSender};
pub use smtp::{SmtpConfig, SmtpSender};

use crate::error::NotificationResult;
use crate::models::{Channel, NotificationMessage};
use async_trait::async_trait;

/// Provider acknowledgement for an accepted message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendReceipt {
    /// Provider-specific message ID for tracking.
    pub message_id: Option<String>,
}

/// Delivers rendered messages on one channel.
///
/// Implementations own their provider's retry and timeout policy; the
/// dispatcher calls `send` once per plan.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// Channel this sender delivers on.
    fn channel(&self) -> Channel;

    /// Provider name for logging.
    fn name(&self) -> &'static str;

    /// Deliver `message` to `address`.
    async fn send(
        &self,
        address: &str,
        message: &NotificationMessage,
    ) -> NotificationResult<SendReceipt>;
}

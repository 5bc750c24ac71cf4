//! Channel sender construction per environment.

use core_config::Environment;
use domain_notifications::{
    Channel, ChannelSender, FcmConfig, FcmSender, NotificationResult, SmtpConfig, SmtpSender,
};
use std::sync::Arc;

/// FCM settings, dry-run by default outside production.
pub fn fcm_config(environment: &Environment) -> NotificationResult<FcmConfig> {
    let config = FcmConfig::from_env()?;
    if environment.is_development() && std::env::var("FCM_VALIDATE_ONLY").is_err() {
        return Ok(config.with_validate_only(true));
    }
    Ok(config)
}

/// SMTP settings: MailHog in development, `SMTP_*` in production.
pub fn smtp_config(environment: &Environment) -> NotificationResult<SmtpConfig> {
    if environment.is_production() {
        SmtpConfig::from_env()
    } else {
        Ok(SmtpConfig::mailhog())
    }
}

pub fn build_sender(
    channel: Channel,
    environment: &Environment,
) -> NotificationResult<Arc<dyn ChannelSender>> {
    let sender: Arc<dyn ChannelSender> = match channel {
        Channel::Push => Arc::new(FcmSender::new(fcm_config(environment)?)?),
        Channel::Email => Arc::new(SmtpSender::new(smtp_config(environment)?)?),
    };
    Ok(sender)
}

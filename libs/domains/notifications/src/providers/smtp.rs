//! SMTP email sender using lettre.
//!
//! Delivers the rendered notification as a plain text email. In development
//! this points at MailHog/Mailpit.

use super::{ChannelSender, SendReceipt};
use crate::error::{NotificationError, NotificationResult};
use crate::models::{Channel, NotificationMessage};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, error, info};

/// SMTP configuration.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// Sender email address.
    pub from_email: String,
    /// Sender display name.
    pub from_name: String,
    /// Optional for dev servers like Mailpit.
    pub username: Option<String>,
    pub password: Option<String>,
    /// False for local dev servers.
    pub use_tls: bool,
}

impl SmtpConfig {
    pub fn new(host: String, port: u16, from_email: String, from_name: String) -> Self {
        Self {
            host,
            port,
            from_email,
            from_name,
            username: None,
            password: None,
            use_tls: false,
        }
    }

    /// Configuration for MailHog/Mailpit, overridable through `SMTP_*`.
    pub fn mailhog() -> Self {
        Self {
            host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("SMTP_PORT")
                .unwrap_or_else(|_| "1025".to_string())
                .parse()
                .unwrap_or(1025),
            from_email: std::env::var("SMTP_FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@localhost".to_string()),
            from_name: std::env::var("SMTP_FROM_NAME").unwrap_or_else(|_| "FitWise Dev".to_string()),
            username: std::env::var("SMTP_USERNAME").ok(),
            password: std::env::var("SMTP_PASSWORD").ok(),
            use_tls: std::env::var("SMTP_USE_TLS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }

    /// Production configuration. Host and sender address are required.
    pub fn from_env() -> NotificationResult<Self> {
        let host = std::env::var("SMTP_HOST")
            .map_err(|_| NotificationError::ConfigError("SMTP_HOST not set".to_string()))?;
        let from_email = std::env::var("SMTP_FROM_EMAIL")
            .map_err(|_| NotificationError::ConfigError("SMTP_FROM_EMAIL not set".to_string()))?;
        let port = match std::env::var("SMTP_PORT") {
            Ok(raw) => raw.parse().map_err(|_| {
                NotificationError::ConfigError(format!("SMTP_PORT is not a port: {}", raw))
            })?,
            Err(_) => 587,
        };
        let from_name = std::env::var("SMTP_FROM_NAME").unwrap_or_else(|_| "FitWise".to_string());

        let mut config = Self::new(host, port, from_email, from_name).with_tls(true);
        if let (Ok(username), Ok(password)) =
            (std::env::var("SMTP_USERNAME"), std::env::var("SMTP_PASSWORD"))
        {
            config = config.with_credentials(username, password);
        }
        Ok(config)
    }

    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    pub fn with_credentials(mut self, username: String, password: String) -> Self {
        self.username = Some(username);
        self.password = Some(password);
        self
    }
}

/// Email channel sender.
pub struct SmtpSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    config: SmtpConfig,
}

impl SmtpSender {
    pub fn new(config: SmtpConfig) -> NotificationResult<Self> {
        let transport = Self::build_transport(&config)?;
        let from: Mailbox = format!("{} <{}>", config.from_name, config.from_email)
            .parse()
            .map_err(|e| NotificationError::ConfigError(format!("Invalid from address: {}", e)))?;
        Ok(Self {
            transport,
            from,
            config,
        })
    }

    /// Create a sender configured for MailHog/Mailpit.
    pub fn mailhog() -> NotificationResult<Self> {
        Self::new(SmtpConfig::mailhog())
    }

    fn build_transport(config: &SmtpConfig) -> NotificationResult<AsyncSmtpTransport<Tokio1Executor>> {
        let credentials = match (&config.username, &config.password) {
            (Some(username), Some(password)) => {
                Some(Credentials::new(username.clone(), password.clone()))
            }
            _ => None,
        };

        let transport = if config.use_tls {
            let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| NotificationError::ConfigError(format!("Failed to create SMTP relay: {}", e)))?
                .port(config.port);
            if let Some(credentials) = credentials {
                builder = builder.credentials(credentials);
            }
            builder.build()
        } else {
            let mut builder =
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host).port(config.port);
            if let Some(credentials) = credentials {
                builder = builder.credentials(credentials);
            }
            builder.build()
        };

        Ok(transport)
    }

    /// Build the email for one recipient.
    fn build_message(&self, address: &str, message: &NotificationMessage) -> NotificationResult<Message> {
        let to: Mailbox = address
            .trim()
            .parse()
            .map_err(|e| NotificationError::InvalidAddress(format!("'{}': {}", address, e)))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&message.title)
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| NotificationError::Internal(format!("Failed to build email message: {}", e)))
    }
}

#[async_trait]
impl ChannelSender for SmtpSender {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    fn name(&self) -> &'static str {
        "SMTP"
    }

    async fn send(
        &self,
        address: &str,
        message: &NotificationMessage,
    ) -> NotificationResult<SendReceipt> {
        debug!(
            host = %self.config.host,
            port = %self.config.port,
            kind = %message.data.kind,
            "Sending email via SMTP"
        );

        let email = self.build_message(address, message)?;

        let response = self.transport.send(email).await.map_err(|e| {
            error!(error = %e, "Failed to send email via SMTP");
            if e.is_permanent() {
                let code = e
                    .status()
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| "permanent".to_string());
                NotificationError::send_failed(code, e.to_string())
            } else {
                NotificationError::Transport(format!("SMTP send failed: {}", e))
            }
        })?;

        let message_id = response.message().next().map(|s| s.to_string());

        info!(message_id = ?message_id, "Email accepted by SMTP server");

        Ok(SendReceipt { message_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageData;

    fn message() -> NotificationMessage {
        NotificationMessage {
            title: "Workout reminder".to_string(),
            body: "Time to move!".to_string(),
            data: MessageData {
                kind: "reminder".to_string(),
                click_action: "OPEN_NOTIFICATION".to_string(),
            },
        }
    }

    #[test]
    fn test_smtp_config_with_tls() {
        let config = SmtpConfig::new(
            "smtp.example.com".to_string(),
            587,
            "noreply@example.com".to_string(),
            "FitWise".to_string(),
        )
        .with_tls(true)
        .with_credentials("user".to_string(), "pass".to_string());

        assert!(config.use_tls);
        assert_eq!(config.username, Some("user".to_string()));
        assert_eq!(config.password, Some("pass".to_string()));
    }

    #[tokio::test]
    async fn test_build_message_rejects_invalid_address() {
        let sender = SmtpSender::new(SmtpConfig::new(
            "localhost".to_string(),
            1025,
            "noreply@localhost".to_string(),
            "FitWise Dev".to_string(),
        ))
        .unwrap();

        let err = sender.build_message("not an address", &message()).unwrap_err();
        assert!(matches!(err, NotificationError::InvalidAddress(_)));

        assert!(sender.build_message("runner@example.com", &message()).is_ok());
    }

    #[tokio::test]
    async fn test_sender_channel() {
        let sender = SmtpSender::new(SmtpConfig::new(
            "localhost".to_string(),
            1025,
            "noreply@localhost".to_string(),
            "FitWise Dev".to_string(),
        ))
        .unwrap();

        assert_eq!(sender.channel(), Channel::Email);
        assert_eq!(sender.name(), "SMTP");
    }
}

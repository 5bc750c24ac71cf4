//! Redis-backed preference and token stores.
//!
//! Layout, one hash per user and document:
//!
//! ```text
//! user_settings:{userId}   pushNotifications=true  emailNotifications=false
//! user_tokens:{userId}     fcmToken=<token>        email=<address>
//! ```

use super::{PreferenceStore, TokenStore};
use crate::error::NotificationResult;
use crate::models::{Channel, PreferenceSnapshot, TokenSnapshot};
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use tracing::debug;

/// Key prefixes for the settings and token hashes.
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    pub preferences_prefix: String,
    pub tokens_prefix: String,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            preferences_prefix: "user_settings".to_string(),
            tokens_prefix: "user_tokens".to_string(),
        }
    }
}

impl RedisStoreConfig {
    pub fn preferences_key(&self, user_id: &str) -> String {
        format!("{}:{}", self.preferences_prefix, user_id)
    }

    pub fn tokens_key(&self, user_id: &str) -> String {
        format!("{}:{}", self.tokens_prefix, user_id)
    }
}

/// Reads both stores from Redis hashes.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    config: RedisStoreConfig,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager, config: RedisStoreConfig) -> Self {
        Self { conn, config }
    }

    /// Open a managed connection to `url`.
    pub async fn connect(url: &str, config: RedisStoreConfig) -> NotificationResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self::new(conn, config))
    }

    pub fn config(&self) -> &RedisStoreConfig {
        &self.config
    }
}

#[async_trait]
impl PreferenceStore for RedisStore {
    async fn get(&self, user_id: &str) -> NotificationResult<Option<PreferenceSnapshot>> {
        let mut conn = self.conn.clone();
        let key = self.config.preferences_key(user_id);

        let fields: HashMap<String, String> = conn.hgetall(&key).await?;
        debug!(key = %key, field_count = fields.len(), "Read user settings");

        if fields.is_empty() {
            return Ok(None);
        }
        Ok(Some(PreferenceSnapshot::from_fields(fields)))
    }
}

#[async_trait]
impl TokenStore for RedisStore {
    async fn get(
        &self,
        user_id: &str,
        channel: Channel,
    ) -> NotificationResult<Option<TokenSnapshot>> {
        let mut conn = self.conn.clone();
        let key = self.config.tokens_key(user_id);

        let address: Option<String> = conn.hget(&key, channel.address_field()).await?;
        debug!(key = %key, channel = %channel, found = address.is_some(), "Read user token");

        Ok(address
            .map(TokenSnapshot::new)
            .filter(TokenSnapshot::is_usable))
    }
}

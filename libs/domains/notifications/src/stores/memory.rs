//! In-process store for local runs and tests.

use super::{PreferenceStore, TokenStore};
use crate::error::NotificationResult;
use crate::models::{Channel, PreferenceSnapshot, TokenSnapshot};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Documents {
    preferences: HashMap<String, PreferenceSnapshot>,
    tokens: HashMap<(String, Channel), TokenSnapshot>,
}

/// Holds preference and token snapshots in memory.
///
/// Clones share the same data, so one instance can serve as both stores.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    documents: Arc<RwLock<Documents>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a user's preferences.
    pub async fn set_preferences(&self, user_id: impl Into<String>, snapshot: PreferenceSnapshot) {
        self.documents
            .write()
            .await
            .preferences
            .insert(user_id.into(), snapshot);
    }

    /// Store a user's address for a channel.
    pub async fn set_token(
        &self,
        user_id: impl Into<String>,
        channel: Channel,
        address: impl Into<String>,
    ) {
        self.documents
            .write()
            .await
            .tokens
            .insert((user_id.into(), channel), TokenSnapshot::new(address));
    }

    /// Forget everything stored for a user.
    pub async fn remove_user(&self, user_id: &str) {
        let mut documents = self.documents.write().await;
        documents.preferences.remove(user_id);
        documents.tokens.retain(|(user, _), _| user != user_id);
    }
}

#[async_trait]
impl PreferenceStore for InMemoryStore {
    async fn get(&self, user_id: &str) -> NotificationResult<Option<PreferenceSnapshot>> {
        Ok(self.documents.read().await.preferences.get(user_id).cloned())
    }
}

#[async_trait]
impl TokenStore for InMemoryStore {
    async fn get(
        &self,
        user_id: &str,
        channel: Channel,
    ) -> NotificationResult<Option<TokenSnapshot>> {
        Ok(self
            .documents
            .read()
            .await
            .tokens
            .get(&(user_id.to_string(), channel))
            .cloned())
    }
}

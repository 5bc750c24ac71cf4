//! Read-only ports onto the external preference and token stores.
//!
//! Both stores are owned by another system. The dispatcher reads them fresh
//! for every event and never writes.

mod memory;
mod redis_store;

pub use memory::InMemoryStore;
pub use redis_store::{RedisStore, RedisStoreConfig};

use crate::error::NotificationResult;
use crate::models::{Channel, PreferenceSnapshot, TokenSnapshot};
use async_trait::async_trait;

/// Per-user channel flags.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Read the user's flags. `Ok(None)` means the user has no settings record.
    async fn get(&self, user_id: &str) -> NotificationResult<Option<PreferenceSnapshot>>;
}

/// Per-user, per-channel delivery addresses.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Read the user's address for `channel`. `Ok(None)` means none stored.
    async fn get(&self, user_id: &str, channel: Channel)
        -> NotificationResult<Option<TokenSnapshot>>;
}

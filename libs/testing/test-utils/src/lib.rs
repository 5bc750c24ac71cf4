//! Shared test utilities for domain testing
//!
//! This crate provides reusable test infrastructure for the domain crates:
//! - `TestRedis`: Redis container with automatic cleanup (feature: "redis")
//! - `TestDataBuilder`: Deterministic user and notification identifiers
//!
//! # Usage
//!
//! Add `features = ["redis"]` to your dev-dependencies:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { workspace = true, features = ["redis"] }
//! ```
//!
//! Then in your tests:
//!
//! ```rust,ignore
//! use test_utils::{TestDataBuilder, TestRedis};
//! use redis::AsyncCommands;
//!
//! #[tokio::test]
//! async fn my_redis_test() {
//!     let redis = TestRedis::new().await;
//!     let mut conn = redis.connection();
//!     let builder = TestDataBuilder::from_test_name("my_redis_test");
//!
//!     let key = format!("user_settings:{}", builder.user_id());
//!     conn.hset::<_, _, _, ()>(&key, "pushNotifications", "true").await.unwrap();
//! }
//! ```

#[cfg(feature = "redis")]
mod redis;

#[cfg(feature = "redis")]
pub use self::redis::TestRedis;

/// Builder for test identifiers with deterministic values
///
/// Store keys are derived from user IDs, so tests sharing one Redis
/// container stay isolated as long as each test uses its own name.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_dispatch_push");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// User identifier, as the document store would hand it out
    pub fn user_id(&self) -> String {
        format!("test-user-{:016x}", self.seed)
    }

    /// Notification identifier, unique per `suffix`
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::new(1);
    /// assert_eq!(builder.notification_id("first"), "test-notification-0000000000000001-first");
    /// ```
    pub fn notification_id(&self, suffix: &str) -> String {
        format!("test-notification-{:016x}-{}", self.seed, suffix)
    }

    /// Device token for a push channel
    pub fn device_token(&self) -> String {
        format!("test-token-{:016x}", self.seed)
    }
}

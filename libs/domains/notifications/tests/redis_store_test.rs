//! Integration tests for the Redis-backed stores
//!
//! These tests use real Redis via testcontainers to ensure the hash layout
//! is read the way the settings and token documents are written.
//! They need a Docker daemon: `cargo test -- --ignored`.

use domain_notifications::*;
use redis::AsyncCommands;
use test_utils::{TestDataBuilder, TestRedis};

#[tokio::test]
#[ignore = "requires Docker for testcontainers"]
async fn test_reads_preferences_and_tokens() {
    let redis = TestRedis::new().await;
    let mut conn = redis.connection();
    let builder = TestDataBuilder::from_test_name("redis_reads");
    let user_id = builder.user_id();

    conn.hset_multiple::<_, _, _, ()>(
        format!("user_settings:{}", user_id),
        &[("pushNotifications", "true"), ("emailNotifications", "false")],
    )
    .await
    .unwrap();
    conn.hset::<_, _, _, ()>(format!("user_tokens:{}", user_id), "fcmToken", "abc123")
        .await
        .unwrap();

    let store = RedisStore::connect(redis.connection_string(), RedisStoreConfig::default())
        .await
        .unwrap();

    let prefs = PreferenceStore::get(&store, &user_id).await.unwrap().unwrap();
    assert!(prefs.is_enabled(Channel::Push));
    assert!(!prefs.is_enabled(Channel::Email));

    let token = TokenStore::get(&store, &user_id, Channel::Push).await.unwrap();
    assert_eq!(token.unwrap().address(), "abc123");
    assert!(TokenStore::get(&store, &user_id, Channel::Email)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
#[ignore = "requires Docker for testcontainers"]
async fn test_missing_documents_read_as_absent() {
    let redis = TestRedis::new().await;
    let mut conn = redis.connection();
    let builder = TestDataBuilder::from_test_name("redis_absent");
    let user_id = builder.user_id();

    conn.hset::<_, _, _, ()>(format!("user_tokens:{}", user_id), "fcmToken", "")
        .await
        .unwrap();

    let store = RedisStore::connect(redis.connection_string(), RedisStoreConfig::default())
        .await
        .unwrap();

    assert!(PreferenceStore::get(&store, &user_id).await.unwrap().is_none());
    assert!(TokenStore::get(&store, &user_id, Channel::Push)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
#[ignore = "requires Docker for testcontainers"]
async fn test_dispatch_against_redis() {
    let redis = TestRedis::new().await;
    let mut conn = redis.connection();
    let config = RedisStoreConfig {
        preferences_prefix: "test:settings".to_string(),
        tokens_prefix: "test:tokens".to_string(),
    };

    conn.hset::<_, _, _, ()>("test:settings:u1", "pushNotifications", "false")
        .await
        .unwrap();
    conn.hset::<_, _, _, ()>("test:tokens:u1", "fcmToken", "abc123")
        .await
        .unwrap();

    let store = RedisStore::connect(redis.connection_string(), config)
        .await
        .unwrap();
    let coordinator =
        DispatchCoordinator::new(store.clone(), store, DispatchDecisionEngine::default())
            .with_sender(std::sync::Arc::new(
                FcmSender::new(FcmConfig::new("unused".to_string(), "unused".to_string()))
                    .unwrap(),
            ));

    let outcomes = coordinator
        .dispatch(&NotificationEvent::new("u1", "n1"))
        .await
        .unwrap();

    assert_eq!(
        outcomes,
        vec![DispatchOutcome::skipped(Channel::Push, SkipReason::Disabled)]
    );
}

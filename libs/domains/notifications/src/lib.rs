//! Notifications Domain
//!
//! Dispatches a created notification record to the user's delivery channels.
//!
//! # Features
//!
//! - Per-user channel flags and per-channel addresses, read fresh per event
//! - Pure decision step with safe defaults (skip instead of mis-deliver)
//! - Concurrent fan-out with per-channel failure isolation
//! - FCM push and SMTP email senders
//! - Outcome logging and Prometheus counters
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  Ingestion trigger  │  ← at-least-once, unordered
//! └──────────┬──────────┘
//!            │ NotificationEvent
//! ┌──────────▼──────────┐     ┌──────────────────────────┐
//! │ DispatchCoordinator │ ──▶ │ PreferenceStore/TokenStore│
//! └──────────┬──────────┘     └──────────────────────────┘
//!            │ per channel
//! ┌──────────▼──────────┐
//! │DispatchDecisionEngine│  ← pure: skip(disabled|no-address) or deliver
//! └──────────┬──────────┘
//!            │ DispatchPlan
//! ┌──────────▼──────────┐
//! │    ChannelSender    │  ← FCM, SMTP
//! └─────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_notifications::{
//!     DispatchCoordinator, DispatchDecisionEngine, FcmSender, RedisStore, RedisStoreConfig,
//! };
//! use std::sync::Arc;
//!
//! let store = RedisStore::connect("redis://localhost:6379", RedisStoreConfig::default()).await?;
//! let coordinator = DispatchCoordinator::new(store.clone(), store, DispatchDecisionEngine::default())
//!     .with_sender(Arc::new(FcmSender::from_env()?));
//!
//! let outcomes = coordinator.dispatch(&event).await?;
//! ```

pub mod coordinator;
pub mod decision;
pub mod error;
pub mod metrics;
pub mod models;
pub mod providers;
pub mod stores;

// Re-export commonly used types
pub use coordinator::{DispatchCoordinator, NotificationListener};
pub use decision::{DEFAULT_KIND, DEFAULT_TITLE, DispatchDecisionEngine};
pub use error::{NotificationError, NotificationResult};
pub use models::{
    Channel, DispatchOutcome, DispatchPlan, DispatchReport, FailureKind, MessageData,
    NotificationContent, NotificationCreated, NotificationEvent, NotificationMessage,
    OutcomeStatus, PreferenceSnapshot, SkipReason, TokenSnapshot,
};
pub use providers::{ChannelSender, FcmConfig, FcmSender, SendReceipt, SmtpConfig, SmtpSender};
pub use stores::{InMemoryStore, PreferenceStore, RedisStore, RedisStoreConfig, TokenStore};

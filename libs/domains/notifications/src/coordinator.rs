//! Per-event dispatch pipeline.
//!
//! For every configured channel: read snapshots, decide, send. Store reads
//! for all channels run concurrently, then every delivery runs concurrently.
//! Store failures read as absent snapshots and sender failures become
//! `failed` outcomes, so one channel can never stop another.

use crate::decision::DispatchDecisionEngine;
use crate::error::NotificationResult;
use crate::metrics::DispatchMetrics;
use crate::models::{
    Channel, DispatchOutcome, DispatchPlan, DispatchReport, FailureKind, NotificationEvent,
    OutcomeStatus, PreferenceSnapshot, TokenSnapshot,
};
use crate::providers::ChannelSender;
use crate::stores::{PreferenceStore, TokenStore};
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::join_all;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Inbound port called by the ingestion trigger once per created record.
///
/// Delivery is at-least-once, so implementations must tolerate duplicates.
#[async_trait]
pub trait NotificationListener: Send + Sync {
    async fn on_notification_created(&self, event: NotificationEvent) -> DispatchReport;
}

/// Fans one event out to every registered channel sender.
pub struct DispatchCoordinator<P: PreferenceStore, T: TokenStore> {
    preferences: Arc<P>,
    tokens: Arc<T>,
    senders: Vec<Arc<dyn ChannelSender>>,
    engine: DispatchDecisionEngine,
    metrics: DispatchMetrics,
}

impl<P: PreferenceStore, T: TokenStore> DispatchCoordinator<P, T> {
    /// Create a coordinator with no senders registered.
    pub fn new(preferences: P, tokens: T, engine: DispatchDecisionEngine) -> Self {
        Self::with_arcs(Arc::new(preferences), Arc::new(tokens), engine)
    }

    /// Create a coordinator with Arc-wrapped stores.
    pub fn with_arcs(preferences: Arc<P>, tokens: Arc<T>, engine: DispatchDecisionEngine) -> Self {
        Self {
            preferences,
            tokens,
            senders: Vec::new(),
            engine,
            metrics: DispatchMetrics::new(),
        }
    }

    /// Register a sender. Replaces any sender already registered for its channel.
    pub fn with_sender(mut self, sender: Arc<dyn ChannelSender>) -> Self {
        let channel = sender.channel();
        self.senders.retain(|existing| existing.channel() != channel);
        self.senders.push(sender);
        self
    }

    /// Channels that get an outcome for every event.
    pub fn channels(&self) -> Vec<Channel> {
        self.senders.iter().map(|s| s.channel()).collect()
    }

    pub fn engine(&self) -> &DispatchDecisionEngine {
        &self.engine
    }

    /// Dispatch one event to every registered channel.
    ///
    /// Returns one outcome per channel. The only error is
    /// [`crate::NotificationError::MalformedEvent`], in which case no store
    /// is read and nothing is sent.
    pub async fn dispatch(
        &self,
        event: &NotificationEvent,
    ) -> NotificationResult<Vec<DispatchOutcome>> {
        let started = Instant::now();

        if let Err(err) = event.validate() {
            error!(
                user_id = %event.user_id,
                notification_id = %event.notification_id,
                error = %err,
                "Dropping notification event"
            );
            self.metrics.aborted();
            return Err(err);
        }

        let (preferences, tokens) = tokio::join!(
            self.read_preferences(event),
            join_all(
                self.senders
                    .iter()
                    .map(|sender| self.read_token(event, sender.channel()))
            )
        );

        let outcomes = join_all(self.senders.iter().zip(tokens).map(|(sender, token)| {
            let plan = self.engine.decide(
                sender.channel(),
                event,
                preferences.as_ref(),
                token.as_ref(),
            );
            self.execute(event, sender.as_ref(), plan)
        }))
        .await;

        self.metrics.dispatch_duration(started.elapsed());
        Ok(outcomes)
    }

    async fn read_preferences(&self, event: &NotificationEvent) -> Option<PreferenceSnapshot> {
        match self.preferences.get(&event.user_id).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(
                    user_id = %event.user_id,
                    notification_id = %event.notification_id,
                    error = %err,
                    "Preference store unavailable, treating preferences as absent"
                );
                None
            }
        }
    }

    async fn read_token(&self, event: &NotificationEvent, channel: Channel) -> Option<TokenSnapshot> {
        match self.tokens.get(&event.user_id, channel).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(
                    user_id = %event.user_id,
                    notification_id = %event.notification_id,
                    channel = %channel,
                    error = %err,
                    "Token store unavailable, treating address as absent"
                );
                None
            }
        }
    }

    async fn execute(
        &self,
        event: &NotificationEvent,
        sender: &dyn ChannelSender,
        plan: DispatchPlan,
    ) -> DispatchOutcome {
        let outcome = match plan {
            DispatchPlan::Skipped { channel, reason } => DispatchOutcome::skipped(channel, reason),
            DispatchPlan::Deliver {
                channel,
                address,
                message,
            } => match AssertUnwindSafe(async { sender.send(&address, &message).await })
                .catch_unwind()
                .await
            {
                Ok(Ok(receipt)) => DispatchOutcome::sent(channel, receipt.message_id),
                Ok(Err(err)) => {
                    warn!(
                        user_id = %event.user_id,
                        notification_id = %event.notification_id,
                        channel = %channel,
                        provider = sender.name(),
                        error = %err,
                        "Channel sender returned an error"
                    );
                    DispatchOutcome::failed(channel, FailureKind::from(&err))
                }
                Err(_) => {
                    warn!(
                        user_id = %event.user_id,
                        notification_id = %event.notification_id,
                        channel = %channel,
                        provider = sender.name(),
                        "Channel sender panicked"
                    );
                    DispatchOutcome::failed(channel, FailureKind::Internal)
                }
            },
        };

        log_outcome(event, &outcome);
        self.metrics.outcome(&outcome);
        outcome
    }
}

fn log_outcome(event: &NotificationEvent, outcome: &DispatchOutcome) {
    match &outcome.status {
        OutcomeStatus::Sent { receipt } => info!(
            user_id = %event.user_id,
            notification_id = %event.notification_id,
            channel = %outcome.channel,
            outcome = "sent",
            receipt = ?receipt,
            "Notification sent"
        ),
        OutcomeStatus::Skipped { reason } => info!(
            user_id = %event.user_id,
            notification_id = %event.notification_id,
            channel = %outcome.channel,
            outcome = "skipped",
            reason = %reason,
            "Notification skipped"
        ),
        OutcomeStatus::Failed { error } => warn!(
            user_id = %event.user_id,
            notification_id = %event.notification_id,
            channel = %outcome.channel,
            outcome = "failed",
            error = %error,
            "Notification failed"
        ),
    }
}

#[async_trait]
impl<P: PreferenceStore, T: TokenStore> NotificationListener for DispatchCoordinator<P, T> {
    async fn on_notification_created(&self, event: NotificationEvent) -> DispatchReport {
        match self.dispatch(&event).await {
            Ok(outcomes) => DispatchReport::Dispatched {
                notification_id: event.notification_id,
                outcomes,
            },
            Err(err) => DispatchReport::Aborted {
                reason: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotificationError;
    use crate::models::{SkipReason, TokenSnapshot};
    use crate::providers::{MockChannelSender, SendReceipt};
    use crate::stores::{MockPreferenceStore, MockTokenStore};

    fn reminder() -> NotificationEvent {
        NotificationEvent::new("u1", "n1")
            .with_title("Workout reminder")
            .with_body("Time to move!")
            .with_kind("reminder")
    }

    fn preferences(snapshot: Option<PreferenceSnapshot>) -> MockPreferenceStore {
        let mut store = MockPreferenceStore::new();
        store
            .expect_get()
            .returning(move |_| Ok(snapshot.clone()));
        store
    }

    fn tokens(push: Option<&'static str>, email: Option<&'static str>) -> MockTokenStore {
        let mut store = MockTokenStore::new();
        store.expect_get().returning(move |_, channel| {
            let address = match channel {
                Channel::Push => push,
                Channel::Email => email,
            };
            Ok(address.map(TokenSnapshot::new))
        });
        store
    }

    fn accepting_sender(channel: Channel) -> MockChannelSender {
        let mut sender = MockChannelSender::new();
        sender.expect_channel().return_const(channel);
        sender.expect_name().return_const("mock");
        sender.expect_send().returning(|_, _| {
            Ok(SendReceipt {
                message_id: Some("msg-1".to_string()),
            })
        });
        sender
    }

    fn silent_sender(channel: Channel) -> MockChannelSender {
        let mut sender = MockChannelSender::new();
        sender.expect_channel().return_const(channel);
        sender.expect_name().return_const("mock");
        sender.expect_send().never();
        sender
    }

    #[tokio::test]
    async fn test_workout_reminder_is_sent() {
        let mut sender = MockChannelSender::new();
        sender.expect_channel().return_const(Channel::Push);
        sender.expect_name().return_const("mock");
        sender.expect_send().times(1).returning(|address, message| {
            assert_eq!(address, "abc123");
            assert_eq!(message.title, "Workout reminder");
            assert_eq!(message.body, "Time to move!");
            assert_eq!(message.data.kind, "reminder");
            Ok(SendReceipt::default())
        });

        let coordinator = DispatchCoordinator::new(
            preferences(Some(PreferenceSnapshot::new().with(Channel::Push, true))),
            tokens(Some("abc123"), None),
            DispatchDecisionEngine::default(),
        )
        .with_sender(Arc::new(sender));

        let outcomes = coordinator.dispatch(&reminder()).await.unwrap();

        assert_eq!(outcomes, vec![DispatchOutcome::sent(Channel::Push, None)]);
    }

    #[tokio::test]
    async fn test_disabled_channel_never_calls_sender() {
        let coordinator = DispatchCoordinator::new(
            preferences(Some(PreferenceSnapshot::new().with(Channel::Push, false))),
            tokens(Some("abc123"), None),
            DispatchDecisionEngine::default(),
        )
        .with_sender(Arc::new(silent_sender(Channel::Push)));

        let outcomes = coordinator.dispatch(&reminder()).await.unwrap();

        assert_eq!(
            outcomes,
            vec![DispatchOutcome::skipped(Channel::Push, SkipReason::Disabled)]
        );
    }

    #[tokio::test]
    async fn test_missing_address_is_skipped() {
        let coordinator = DispatchCoordinator::new(
            preferences(Some(PreferenceSnapshot::new().with(Channel::Push, true))),
            tokens(None, None),
            DispatchDecisionEngine::default(),
        )
        .with_sender(Arc::new(silent_sender(Channel::Push)));

        let outcomes = coordinator.dispatch(&reminder()).await.unwrap();

        assert_eq!(
            outcomes,
            vec![DispatchOutcome::skipped(Channel::Push, SkipReason::NoAddress)]
        );
    }

    #[tokio::test]
    async fn test_preference_store_outage_skips_every_channel() {
        let mut prefs = MockPreferenceStore::new();
        prefs
            .expect_get()
            .returning(|_| Err(NotificationError::StoreUnavailable("connection refused".into())));

        let coordinator = DispatchCoordinator::new(
            prefs,
            tokens(Some("abc123"), Some("runner@example.com")),
            DispatchDecisionEngine::default(),
        )
        .with_sender(Arc::new(silent_sender(Channel::Push)))
        .with_sender(Arc::new(silent_sender(Channel::Email)));

        let outcomes = coordinator.dispatch(&reminder()).await.unwrap();

        assert_eq!(outcomes.len(), 2);
        for outcome in outcomes {
            assert_eq!(
                outcome.status,
                OutcomeStatus::Skipped {
                    reason: SkipReason::Disabled
                }
            );
        }
    }

    #[tokio::test]
    async fn test_token_store_outage_reads_as_no_address() {
        let mut token_store = MockTokenStore::new();
        token_store
            .expect_get()
            .returning(|_, _| Err(NotificationError::StoreUnavailable("timeout".into())));

        let coordinator = DispatchCoordinator::new(
            preferences(Some(PreferenceSnapshot::new().with(Channel::Push, true))),
            token_store,
            DispatchDecisionEngine::default(),
        )
        .with_sender(Arc::new(silent_sender(Channel::Push)));

        let outcomes = coordinator.dispatch(&reminder()).await.unwrap();

        assert_eq!(
            outcomes,
            vec![DispatchOutcome::skipped(Channel::Push, SkipReason::NoAddress)]
        );
    }

    #[tokio::test]
    async fn test_failing_channel_does_not_block_others() {
        let mut failing = MockChannelSender::new();
        failing.expect_channel().return_const(Channel::Push);
        failing.expect_name().return_const("mock");
        failing
            .expect_send()
            .times(1)
            .returning(|_, _| Err(NotificationError::send_failed("UNAVAILABLE", "try later")));

        let coordinator = DispatchCoordinator::new(
            preferences(Some(
                PreferenceSnapshot::new()
                    .with(Channel::Push, true)
                    .with(Channel::Email, true),
            )),
            tokens(Some("abc123"), Some("runner@example.com")),
            DispatchDecisionEngine::default(),
        )
        .with_sender(Arc::new(failing))
        .with_sender(Arc::new(accepting_sender(Channel::Email)));

        let outcomes = coordinator.dispatch(&reminder()).await.unwrap();

        assert_eq!(
            outcomes,
            vec![
                DispatchOutcome::failed(
                    Channel::Push,
                    FailureKind::Provider {
                        code: "UNAVAILABLE".to_string()
                    }
                ),
                DispatchOutcome::sent(Channel::Email, Some("msg-1".to_string())),
            ]
        );
    }

    struct PanickingSender;

    #[async_trait]
    impl ChannelSender for PanickingSender {
        fn channel(&self) -> Channel {
            Channel::Push
        }

        fn name(&self) -> &'static str {
            "panicking"
        }

        async fn send(
            &self,
            _address: &str,
            _message: &crate::models::NotificationMessage,
        ) -> NotificationResult<SendReceipt> {
            panic!("provider sdk bug")
        }
    }

    #[tokio::test]
    async fn test_panicking_sender_does_not_take_down_other_channels() {
        let coordinator = DispatchCoordinator::new(
            preferences(Some(
                PreferenceSnapshot::new()
                    .with(Channel::Push, true)
                    .with(Channel::Email, true),
            )),
            tokens(Some("abc123"), Some("runner@example.com")),
            DispatchDecisionEngine::default(),
        )
        .with_sender(Arc::new(PanickingSender))
        .with_sender(Arc::new(accepting_sender(Channel::Email)));

        let outcomes = coordinator.dispatch(&reminder()).await.unwrap();

        assert_eq!(
            outcomes,
            vec![
                DispatchOutcome::failed(Channel::Push, FailureKind::Internal),
                DispatchOutcome::sent(Channel::Email, Some("msg-1".to_string())),
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_event_is_aborted_before_reading_stores() {
        let mut prefs = MockPreferenceStore::new();
        prefs.expect_get().never();
        let mut token_store = MockTokenStore::new();
        token_store.expect_get().never();

        let coordinator =
            DispatchCoordinator::new(prefs, token_store, DispatchDecisionEngine::default())
                .with_sender(Arc::new(silent_sender(Channel::Push)));

        let result = coordinator.dispatch(&NotificationEvent::new("", "n1")).await;

        assert!(matches!(result, Err(NotificationError::MalformedEvent(_))));
    }

    #[tokio::test]
    async fn test_repeated_dispatch_yields_identical_outcomes() {
        let coordinator = DispatchCoordinator::new(
            preferences(Some(PreferenceSnapshot::new().with(Channel::Push, true))),
            tokens(Some("abc123"), None),
            DispatchDecisionEngine::default(),
        )
        .with_sender(Arc::new(accepting_sender(Channel::Push)))
        .with_sender(Arc::new(silent_sender(Channel::Email)));

        let first = coordinator.dispatch(&reminder()).await.unwrap();
        let second = coordinator.dispatch(&reminder()).await.unwrap();

        assert_eq!(first, second);
        let tags: Vec<_> = first.iter().map(|o| o.status.tag()).collect();
        assert_eq!(tags, vec!["sent", "skipped"]);
    }

    #[tokio::test]
    async fn test_with_sender_replaces_same_channel() {
        let coordinator = DispatchCoordinator::new(
            preferences(None),
            tokens(None, None),
            DispatchDecisionEngine::default(),
        )
        .with_sender(Arc::new(silent_sender(Channel::Push)))
        .with_sender(Arc::new(silent_sender(Channel::Email)))
        .with_sender(Arc::new(silent_sender(Channel::Push)));

        assert_eq!(coordinator.channels(), vec![Channel::Email, Channel::Push]);
    }

    #[tokio::test]
    async fn test_listener_reports() {
        let coordinator = DispatchCoordinator::new(
            preferences(None),
            tokens(None, None),
            DispatchDecisionEngine::default(),
        )
        .with_sender(Arc::new(silent_sender(Channel::Push)));

        let report = coordinator.on_notification_created(reminder()).await;
        assert_eq!(
            report,
            DispatchReport::Dispatched {
                notification_id: "n1".to_string(),
                outcomes: vec![DispatchOutcome::skipped(Channel::Push, SkipReason::Disabled)],
            }
        );

        let report = coordinator
            .on_notification_created(NotificationEvent::new("u1", ""))
            .await;
        assert!(matches!(report, DispatchReport::Aborted { .. }));
    }
}

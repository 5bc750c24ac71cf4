//! Pure per-channel dispatch decision.
//!
//! Given an event and the snapshots read for one channel, decide whether
//! the channel is delivered and render the message. Missing or odd
//! snapshot data always resolves to a skip, never to an error.

use crate::models::{
    Channel, DispatchPlan, MessageData, NotificationEvent, NotificationMessage,
    PreferenceSnapshot, SkipReason, TokenSnapshot,
};

/// Title used when the event carries none.
pub const DEFAULT_TITLE: &str = "FitWise";

/// Category used when the event carries none.
pub const DEFAULT_KIND: &str = "general";

/// Decides and renders, without side effects.
#[derive(Debug, Clone)]
pub struct DispatchDecisionEngine {
    default_title: String,
}

impl Default for DispatchDecisionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE)
    }
}

impl DispatchDecisionEngine {
    /// Create an engine with a product title fallback.
    ///
    /// A blank fallback is replaced with [`DEFAULT_TITLE`] so a delivered
    /// plan never carries an empty title.
    pub fn new(default_title: impl Into<String>) -> Self {
        let default_title = default_title.into();
        let default_title = if default_title.trim().is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            default_title
        };
        Self { default_title }
    }

    pub fn default_title(&self) -> &str {
        &self.default_title
    }

    /// Decide the plan for `channel`.
    ///
    /// Rules, in order: preferences absent or flag off → `disabled`;
    /// token absent or blank → `no-address`; otherwise deliver.
    pub fn decide(
        &self,
        channel: Channel,
        event: &NotificationEvent,
        preferences: Option<&PreferenceSnapshot>,
        token: Option<&TokenSnapshot>,
    ) -> DispatchPlan {
        let enabled = preferences.is_some_and(|prefs| prefs.is_enabled(channel));
        if !enabled {
            return DispatchPlan::Skipped {
                channel,
                reason: SkipReason::Disabled,
            };
        }

        let Some(token) = token.filter(|t| t.is_usable()) else {
            return DispatchPlan::Skipped {
                channel,
                reason: SkipReason::NoAddress,
            };
        };

        DispatchPlan::Deliver {
            channel,
            address: token.address().to_string(),
            message: self.render(channel, event),
        }
    }

    /// Build the message for `channel`, applying content defaults.
    pub fn render(&self, channel: Channel, event: &NotificationEvent) -> NotificationMessage {
        NotificationMessage {
            title: non_empty(event.title.as_deref())
                .unwrap_or(&self.default_title)
                .to_string(),
            body: event.body.clone().unwrap_or_default(),
            data: MessageData {
                kind: non_empty(event.kind.as_deref())
                    .unwrap_or(DEFAULT_KIND)
                    .to_string(),
                click_action: channel.click_action().to_string(),
            },
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reminder() -> NotificationEvent {
        NotificationEvent::new("u1", "n1")
            .with_title("Workout reminder")
            .with_body("Time to move!")
            .with_kind("reminder")
    }

    fn push_enabled() -> PreferenceSnapshot {
        PreferenceSnapshot::new().with(Channel::Push, true)
    }

    #[test]
    fn test_missing_preferences_is_disabled_even_with_token() {
        let engine = DispatchDecisionEngine::default();
        let token = TokenSnapshot::new("abc123");

        let plan = engine.decide(Channel::Push, &reminder(), None, Some(&token));

        assert_eq!(
            plan,
            DispatchPlan::Skipped {
                channel: Channel::Push,
                reason: SkipReason::Disabled
            }
        );
    }

    #[test]
    fn test_flag_false_or_absent_is_disabled() {
        let engine = DispatchDecisionEngine::default();
        let token = TokenSnapshot::new("abc123");

        let off = PreferenceSnapshot::new().with(Channel::Push, false);
        let other_channel_only = PreferenceSnapshot::new().with(Channel::Email, true);

        for prefs in [off, other_channel_only] {
            let plan = engine.decide(Channel::Push, &reminder(), Some(&prefs), Some(&token));
            assert!(matches!(
                plan,
                DispatchPlan::Skipped {
                    reason: SkipReason::Disabled,
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_enabled_without_address_is_no_address() {
        let engine = DispatchDecisionEngine::default();
        let prefs = push_enabled();

        for token in [None, Some(TokenSnapshot::new("")), Some(TokenSnapshot::new(" "))] {
            let plan = engine.decide(Channel::Push, &reminder(), Some(&prefs), token.as_ref());
            assert_eq!(
                plan,
                DispatchPlan::Skipped {
                    channel: Channel::Push,
                    reason: SkipReason::NoAddress
                }
            );
        }
    }

    #[test]
    fn test_delivers_workout_reminder() {
        let engine = DispatchDecisionEngine::default();
        let token = TokenSnapshot::new("abc123");

        let plan = engine.decide(Channel::Push, &reminder(), Some(&push_enabled()), Some(&token));

        let DispatchPlan::Deliver {
            channel,
            address,
            message,
        } = plan
        else {
            panic!("expected a delivery plan");
        };
        assert_eq!(channel, Channel::Push);
        assert_eq!(address, "abc123");
        assert_eq!(message.title, "Workout reminder");
        assert_eq!(message.body, "Time to move!");
        assert_eq!(message.data.kind, "reminder");
        assert_eq!(message.data.click_action, "FLUTTER_NOTIFICATION_CLICK");
    }

    #[test]
    fn test_defaults_for_missing_content() {
        let engine = DispatchDecisionEngine::default();
        let message = engine.render(Channel::Push, &NotificationEvent::new("u1", "n1"));

        assert_eq!(message.title, "FitWise");
        assert_eq!(message.body, "");
        assert_eq!(message.data.kind, "general");
    }

    #[test]
    fn test_empty_title_and_type_fall_back() {
        let engine = DispatchDecisionEngine::new("Acme");
        let event = NotificationEvent::new("u1", "n1")
            .with_title("")
            .with_kind("")
            .with_body("");

        let message = engine.render(Channel::Email, &event);

        assert_eq!(message.title, "Acme");
        assert_eq!(message.data.kind, "general");
        assert_eq!(message.data.click_action, "OPEN_NOTIFICATION");
        assert_eq!(message.body, "");
    }

    #[test]
    fn test_blank_default_title_is_replaced() {
        let engine = DispatchDecisionEngine::new("   ");
        assert_eq!(engine.default_title(), DEFAULT_TITLE);
    }

    #[test]
    fn test_decide_is_deterministic() {
        let engine = DispatchDecisionEngine::default();
        let token = TokenSnapshot::new("abc123");
        let prefs = push_enabled();

        let first = engine.decide(Channel::Push, &reminder(), Some(&prefs), Some(&token));
        let second = engine.decide(Channel::Push, &reminder(), Some(&prefs), Some(&token));

        assert_eq!(first, second);
    }
}

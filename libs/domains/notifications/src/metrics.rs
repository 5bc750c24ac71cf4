//! Prometheus metrics for notification dispatch.

use crate::models::{DispatchOutcome, OutcomeStatus};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::time::Duration;
use tracing::info;

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder.
///
/// Call this once at startup. Subsequent calls return the same handle.
pub fn init_metrics() -> Result<&'static PrometheusHandle, BuildError> {
    PROMETHEUS_HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new().install_recorder()?;
        info!("Prometheus metrics initialized");
        Ok(handle)
    })
}

/// Render metrics in Prometheus text format (empty before `init_metrics`).
pub fn render_metrics() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|h| h.render())
        .unwrap_or_default()
}

/// Dispatch metrics helper.
#[derive(Clone, Default)]
pub struct DispatchMetrics;

impl DispatchMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Count one channel outcome.
    pub fn outcome(&self, outcome: &DispatchOutcome) {
        let reason = match &outcome.status {
            OutcomeStatus::Sent { .. } => String::new(),
            OutcomeStatus::Skipped { reason } => reason.to_string(),
            OutcomeStatus::Failed { error } => error.label().to_string(),
        };

        counter!(
            "notification_dispatch_outcomes_total",
            "channel" => outcome.channel.to_string(),
            "outcome" => outcome.status.tag(),
            "reason" => reason
        )
        .increment(1);
    }

    /// Count an event dropped before any channel was considered.
    pub fn aborted(&self) {
        counter!("notification_dispatch_aborted_total").increment(1);
    }

    /// Record how long one event took end to end.
    pub fn dispatch_duration(&self, duration: Duration) {
        histogram!("notification_dispatch_duration_seconds").record(duration.as_secs_f64());
    }
}

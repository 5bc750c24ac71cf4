//! Push Worker Service
//!
//! Hosts the notification-created trigger and fans each record out to the
//! user's enabled channels.
//!
//! ## Architecture
//!
//! ```text
//! POST /events/notification-created
//!   ↓ (NotificationCreated → NotificationEvent)
//! DispatchCoordinator<RedisStore, RedisStore>
//!   ↓ (per channel: flags + address from Redis)
//! FcmSender / SmtpSender
//! ```
//!
//! ## Endpoints
//!
//! - `POST /events/notification-created`: always 202, body is the dispatch report
//! - `GET /health`: liveness with name and version
//! - `GET /metrics`: Prometheus text format

pub mod config;
pub mod handlers;
pub mod senders;

use config::WorkerConfig;
use core_config::{app_info, Environment, FromEnv};
use domain_notifications::metrics::init_metrics;
use domain_notifications::{ChannelSender, DispatchCoordinator, DispatchDecisionEngine, RedisStore};
use eyre::{Result, WrapErr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

/// Wire the coordinator with one sender per configured channel.
pub fn build_coordinator(
    store: RedisStore,
    config: &WorkerConfig,
    environment: &Environment,
) -> Result<DispatchCoordinator<RedisStore, RedisStore>> {
    let engine = DispatchDecisionEngine::new(config.default_title.clone());
    let mut coordinator = DispatchCoordinator::new(store.clone(), store, engine);

    for channel in &config.channels {
        let sender = senders::build_sender(*channel, environment)
            .wrap_err_with(|| format!("Failed to configure {} sender", channel))?;
        info!(channel = %channel, provider = sender.name(), "Channel sender ready");
        coordinator = coordinator.with_sender(sender);
    }

    Ok(coordinator)
}

/// Run the push worker
///
/// 1. Installs error reporting, tracing and the Prometheus recorder
/// 2. Loads [`WorkerConfig`] and connects to Redis
/// 3. Builds a sender per configured channel
/// 4. Serves HTTP until SIGINT/SIGTERM
///
/// # Errors
///
/// Returns an error if configuration is missing or invalid, Redis is
/// unreachable, a channel sender cannot be configured, or the port cannot
/// be bound.
pub async fn run() -> Result<()> {
    core_config::tracing::install_color_eyre();

    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    init_metrics().wrap_err("Failed to install Prometheus recorder")?;

    let app_info = app_info!();
    info!(name = %app_info.name, version = %app_info.version, environment = ?environment, "Starting push worker");

    let config = WorkerConfig::from_env().wrap_err("Failed to load worker configuration")?;
    info!(
        port = config.port,
        channels = ?config.channels,
        preferences_prefix = %config.store.preferences_prefix,
        tokens_prefix = %config.store.tokens_prefix,
        "Worker configuration loaded"
    );

    info!("Connecting to Redis...");
    let store = RedisStore::connect(&config.redis_url, config.store.clone())
        .await
        .wrap_err("Failed to connect to Redis")?;
    info!("Connected to Redis successfully");

    let coordinator = build_coordinator(store, &config, &environment)?;
    let app = handlers::router(Arc::new(coordinator), app_info);

    let addr = config.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind to {}", addr))?;
    info!(addr = %addr, "Push worker listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("Push worker server failed")?;

    info!("Push worker stopped");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
///
/// A handler that cannot be installed is logged and never fires.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal, shutting down gracefully"),
        _ = terminate => info!("Received SIGTERM signal, shutting down gracefully"),
    }
}

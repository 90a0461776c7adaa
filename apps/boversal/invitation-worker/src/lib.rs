//! Invitation Worker Service
//!
//! ```text
//! Redis Stream (meeting-created)
//!   ↓ (Consumer Group: utility-service-group)
//! StreamWorker<MeetingCreatedEvent, InvitationProcessor>
//!   ↓ one send per attendee, then commit
//! SMTP
//! ```
//!
//! Consuming needs both `BROKER_URL` and `SMTP_HOST`. With either unset the
//! process only serves health endpoints and reports the feature as disabled.

pub mod config;

use core_config::{Environment, FromEnv, app_info};
use database::RetryConfig;
use domain_notifications::{InvitationProcessor, MeetingCreatedEvent, SmtpProvider, TemplateEngine};
use eyre::{Result, WrapErr};
use std::sync::Arc;
use stream_worker::{
    HealthState, RedisCheck, StreamWorker, TaskHandle, metrics, serve_health, shutdown_signal,
};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::InvitationWorkerConfig;

/// Run the invitation worker until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the broker stays
/// unreachable through the startup retries.
pub async fn run() -> Result<()> {
    core_config::tracing::install_color_eyre();
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);
    metrics::init_metrics();

    let app_info = app_info!();
    info!(name = %app_info.name, version = %app_info.version, environment = ?environment, "Starting invitation worker");

    let config = InvitationWorkerConfig::from_env().wrap_err("Failed to load configuration")?;
    let mut health = HealthState::new(app_info.name, app_info.version);

    let handle: Option<TaskHandle> = match (&config.broker_url, config.smtp.clone()) {
        (Some(url), Some(smtp)) => {
            let redis = database::redis::connect_with_retry(url, RetryConfig::startup())
                .await
                .wrap_err("Failed to connect to the broker")?;
            health = health.with_check(RedisCheck::new(redis.clone()));

            let provider = SmtpProvider::new(smtp).wrap_err("Failed to build SMTP provider")?;
            let templates = TemplateEngine::new().wrap_err("Failed to load email templates")?;
            let processor = InvitationProcessor::new(Arc::new(provider), Arc::new(templates))
                .with_concurrency(config.fanout_concurrency);

            info!(
                stream = %config.worker.stream_name,
                group = %config.worker.consumer_group,
                consumer = %config.worker.consumer_name,
                fanout_concurrency = config.fanout_concurrency,
                "Invitation consumer configured"
            );
            Some(
                StreamWorker::<MeetingCreatedEvent, _>::from_redis(
                    redis,
                    Arc::new(processor),
                    config.worker.clone(),
                )
                .spawn(),
            )
        }
        (broker, smtp) => {
            if broker.is_none() {
                warn!("BROKER_URL not set, meeting invitations are disabled");
                health = health.with_disabled("broker");
            }
            if smtp.is_none() {
                warn!("SMTP_HOST not set, meeting invitations are disabled");
                health = health.with_disabled("mail");
            }
            None
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
        let _ = shutdown_tx.send(true);
    });

    let addr = config.health.address();
    let health_server = tokio::spawn({
        let shutdown = shutdown_rx.clone();
        async move {
            if let Err(e) = serve_health(&addr, health, shutdown).await {
                error!(error = %e, "Health server failed");
            }
        }
    });

    let mut shutdown = shutdown_rx;
    let _ = shutdown.wait_for(|stop| *stop).await;

    // lets the in-flight message finish its fan-out and commit
    if let Some(handle) = handle {
        handle
            .stop()
            .await
            .wrap_err("Invitation consumer did not stop cleanly")?;
    }
    let _ = health_server.await;

    info!("Invitation worker stopped");
    Ok(())
}

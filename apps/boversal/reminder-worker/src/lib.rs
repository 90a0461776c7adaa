//! Reminder Worker Service
//!
//! Runs the reminder poller as a background task next to a health server.
//!
//! ```text
//! every REMINDER_POLL_INTERVAL_SECS
//!   ↓
//! ReminderPoller::tick
//!   ├─ notification pass → SMTP → reminders.is_email_sent
//!   └─ expiry pass → reminders.is_expired
//! ```
//!
//! Without `SMTP_HOST` the poller runs expiry only: no emails are sent and
//! `/ready` reports mail as disabled.

pub mod config;

use async_trait::async_trait;
use core_config::{Environment, FromEnv, app_info};
use database::RetryConfig;
use database::postgres::{DatabaseConnection, check_health, connect_with_retry, run_migrations};
use domain_notifications::{SmtpProvider, TemplateEngine};
use domain_reminders::{PgReminderStore, ReminderPoller};
use eyre::{Result, WrapErr};
use std::sync::Arc;
use stream_worker::{HealthState, ReadinessCheck, metrics, serve_health, shutdown_signal};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::ReminderWorkerConfig;

/// Readiness check running `SELECT 1`.
struct PostgresCheck {
    db: DatabaseConnection,
}

#[async_trait]
impl ReadinessCheck for PostgresCheck {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn check(&self) -> Result<(), String> {
        check_health(&self.db).await.map_err(|e| e.to_string())
    }
}

/// Run the reminder worker until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns an error if configuration is invalid, PostgreSQL stays unreachable
/// through the startup retries, or migrations fail.
pub async fn run() -> Result<()> {
    core_config::tracing::install_color_eyre();
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);
    metrics::init_metrics();

    let app_info = app_info!();
    info!(name = %app_info.name, version = %app_info.version, environment = ?environment, "Starting reminder worker");

    let config = ReminderWorkerConfig::from_env().wrap_err("Failed to load configuration")?;

    let db = connect_with_retry(config.postgres.clone(), RetryConfig::startup())
        .await
        .wrap_err("Failed to connect to PostgreSQL")?;
    if config.run_migrations {
        run_migrations::<migration::Migrator>(&db, app_info.name)
            .await
            .wrap_err("Failed to run migrations")?;
    }

    let mut health = HealthState::new(app_info.name, app_info.version)
        .with_check(PostgresCheck { db: db.clone() });

    let store = Arc::new(PgReminderStore::new(db));
    let poller = match config.smtp {
        Some(smtp) => {
            let provider = SmtpProvider::new(smtp).wrap_err("Failed to build SMTP provider")?;
            let templates = TemplateEngine::new().wrap_err("Failed to load email templates")?;
            ReminderPoller::new(store, Arc::new(provider), Arc::new(templates), config.poller)
        }
        None => {
            warn!("SMTP_HOST not set, reminder emails are disabled; expiry still runs");
            health = health.with_disabled("mail");
            ReminderPoller::expiry_only(store, config.poller)
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

    let handle = poller.spawn();

    let mut shutdown = shutdown_rx;
    let _ = shutdown.wait_for(|stop| *stop).await;

    handle
        .stop()
        .await
        .wrap_err("Reminder poller did not stop cleanly")?;
    let _ = health_server.await;

    info!("Reminder worker stopped");
    Ok(())
}

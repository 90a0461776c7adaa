//! Start/stop lifecycle for long-running background tasks.
//!
//! A task is spawned with its own stop signal and owns everything it needs.
//! Stopping sets the signal and waits, so work in flight finishes first.

use crate::error::StreamError;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Handle to a spawned background task.
pub struct TaskHandle {
    name: String,
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl TaskHandle {
    /// Spawn `task` with a fresh stop signal.
    ///
    /// The task's error, if any, is logged when it ends.
    pub fn spawn<F, Fut, E>(name: impl Into<String>, task: F) -> Self
    where
        F: FnOnce(watch::Receiver<bool>) -> Fut,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let name = name.into();
        let (stop_tx, stop_rx) = watch::channel(false);
        let fut = task(stop_rx);

        let task_name = name.clone();
        let join = tokio::spawn(async move {
            match fut.await {
                Ok(()) => info!(task = %task_name, "Background task finished"),
                Err(e) => error!(task = %task_name, error = %e, "Background task failed"),
            }
        });

        info!(task = %name, "Background task started");
        Self {
            name,
            stop_tx,
            join,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Signal the task to stop and wait for it.
    pub async fn stop(self) -> Result<(), StreamError> {
        let Self {
            name,
            stop_tx,
            join,
        } = self;

        // the task may already be gone, which is fine
        let _ = stop_tx.send(true);
        join.await
            .map_err(|e| StreamError::Internal(format!("task '{}' aborted: {}", name, e)))?;

        info!(task = %name, "Background task stopped");
        Ok(())
    }
}

/// Sleep for `delay` unless shutdown is requested first.
///
/// Returns `true` when the caller should stop.
pub async fn sleep_or_shutdown(shutdown: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    if *shutdown.borrow() {
        return true;
    }

    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
    }
}

/// Wait for Ctrl+C or SIGTERM.
pub async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Received Ctrl+C, shutting down");
            }
            _ = terminate.recv() => info!("Received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C, shutting down");
    }

    Ok(())
}

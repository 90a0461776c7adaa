//! Prometheus metrics for publishers, consumers and background tasks

use crate::error::ErrorCategory;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::time::Duration;
use tracing::{info, warn};

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialize Prometheus metrics
///
/// Call this once at startup. Subsequent calls are no-ops. If another
/// recorder is already installed the failure is logged and metrics stay local.
pub fn init_metrics() {
    if PROMETHEUS_HANDLE.get().is_some() {
        return;
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROMETHEUS_HANDLE.set(handle).is_ok() {
                info!("Prometheus metrics initialized");
            }
        }
        Err(e) => warn!(error = %e, "Failed to install Prometheus recorder"),
    }
}

/// Get the Prometheus handle for rendering metrics
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// Render metrics in Prometheus format
pub fn render_metrics() -> String {
    prometheus_handle().map(|h| h.render()).unwrap_or_default()
}

/// Per-stream metrics helper
#[derive(Clone)]
pub struct StreamMetrics {
    stream_name: String,
    processor_name: String,
}

impl StreamMetrics {
    pub fn new(stream_name: impl Into<String>, processor_name: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            processor_name: processor_name.into(),
        }
    }

    pub fn message_received(&self, redelivered: bool) {
        counter!(
            "stream_worker_messages_received_total",
            "stream" => self.stream_name.clone(),
            "processor" => self.processor_name.clone(),
            "redelivered" => redelivered.to_string()
        )
        .increment(1);
    }

    pub fn message_processed(&self, duration: Duration) {
        histogram!(
            "stream_worker_message_duration_seconds",
            "stream" => self.stream_name.clone(),
            "processor" => self.processor_name.clone()
        )
        .record(duration.as_secs_f64());
    }

    pub fn message_committed(&self) {
        counter!(
            "stream_worker_messages_committed_total",
            "stream" => self.stream_name.clone(),
            "processor" => self.processor_name.clone()
        )
        .increment(1);
    }

    /// Unparseable message dropped and committed
    pub fn message_poison(&self) {
        counter!(
            "stream_worker_messages_poison_total",
            "stream" => self.stream_name.clone(),
            "processor" => self.processor_name.clone()
        )
        .increment(1);
    }

    pub fn processing_failed(&self, category: ErrorCategory) {
        counter!(
            "stream_worker_processing_errors_total",
            "stream" => self.stream_name.clone(),
            "processor" => self.processor_name.clone(),
            "category" => category.as_str()
        )
        .increment(1);
    }

    /// Poll, commit or subscribe failed
    pub fn broker_error(&self, operation: &'static str) {
        counter!(
            "stream_worker_broker_errors_total",
            "stream" => self.stream_name.clone(),
            "operation" => operation
        )
        .increment(1);
    }

    pub fn published(&self) {
        counter!(
            "stream_producer_published_total",
            "stream" => self.stream_name.clone()
        )
        .increment(1);
    }

    pub fn publish_deduplicated(&self) {
        counter!(
            "stream_producer_deduplicated_total",
            "stream" => self.stream_name.clone()
        )
        .increment(1);
    }

    pub fn publish_failed(&self, category: ErrorCategory) {
        counter!(
            "stream_producer_failed_total",
            "stream" => self.stream_name.clone(),
            "category" => category.as_str()
        )
        .increment(1);
    }
}

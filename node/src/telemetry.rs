// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use std::sync::OnceLock;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub const EVENTS_APPENDED: &str = "eventsync_events_appended_total";
pub const EVENTS_DEDUPLICATED: &str = "eventsync_events_deduplicated_total";
pub const EVENTS_DELIVERED: &str = "eventsync_events_delivered_total";
pub const EVENTS_SUPPRESSED: &str = "eventsync_events_suppressed_total";
pub const EVENTS_UNDECRYPTABLE: &str = "eventsync_events_undecryptable_total";
pub const BATCHES_DELIVERED: &str = "eventsync_batches_delivered_total";
pub const RECOVERY_DURATION: &str = "eventsync_recovery_duration_seconds";

/// Initialize telemetry (logs + metrics). Safe to call more than once; only
/// the first call installs anything.
pub fn init_telemetry() {
    // 1. Initialize Tracing (Logs)
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "eventsync_node=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    // 2. Initialize Metrics (Prometheus)
    if PROM_HANDLE.get().is_some() {
        return;
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROM_HANDLE.set(handle).is_err() {
                tracing::warn!("Prometheus handle already set. Telemetry re-initialized?");
            }
        }
        Err(e) => {
            tracing::warn!("Failed to install Prometheus recorder: {}", e);
            return;
        }
    }

    metrics::describe_counter!(EVENTS_APPENDED, "Events made durable in a journal");
    metrics::describe_counter!(EVENTS_DEDUPLICATED, "Redelivered events dropped by the deduplication ledger");
    metrics::describe_counter!(EVENTS_DELIVERED, "Events handed to consumers");
    metrics::describe_counter!(EVENTS_SUPPRESSED, "Events dropped by the self-channel filter");
    metrics::describe_counter!(EVENTS_UNDECRYPTABLE, "Encrypted events replaced by an undecryptable marker");
    metrics::describe_counter!(BATCHES_DELIVERED, "Non-empty batches handed to consumers");
    metrics::describe_histogram!(RECOVERY_DURATION, "Time taken to replay a journal on open");
}

/// Get the Prometheus handle to render metrics
pub fn get_metrics() -> String {
    if let Some(handle) = PROM_HANDLE.get() {
        handle.render()
    } else {
        "# metrics not initialized".to_string()
    }
}

use std::net::SocketAddr;

use crate::model::LifecycleEvent;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: availability checks issued.
pub const CONFLICT_CHECKS_TOTAL: &str = "tessera_conflict_checks_total";

/// Counter: check results discarded because a newer check superseded them.
pub const CONFLICT_CHECKS_STALE_TOTAL: &str = "tessera_conflict_checks_stale_total";

/// Counter: conflicting bookings reported to users.
pub const CONFLICTS_FOUND_TOTAL: &str = "tessera_conflicts_found_total";

/// Histogram: availability check latency in seconds.
pub const CHECK_DURATION_SECONDS: &str = "tessera_conflict_check_duration_seconds";

/// Counter: booking requests persisted.
pub const BOOKINGS_SUBMITTED_TOTAL: &str = "tessera_bookings_submitted_total";

/// Counter: status transitions applied. Labels: status.
pub const STATUS_TRANSITIONS_TOTAL: &str = "tessera_status_transitions_total";

/// Counter: store faults observed by the checker (fail-open path).
pub const STORE_ERRORS_TOTAL: &str = "tessera_store_errors_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Histogram: ledger group-commit flush duration in seconds.
pub const LEDGER_FLUSH_DURATION_SECONDS: &str = "tessera_ledger_flush_duration_seconds";

/// Histogram: ledger group-commit batch size (events per flush).
pub const LEDGER_FLUSH_BATCH_SIZE: &str = "tessera_ledger_flush_batch_size";

/// Install the Prometheus metrics exporter on the given port. No-op if the
/// port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

/// Short label for a lifecycle event, for metric labels and log fields.
pub fn event_label(event: &LifecycleEvent) -> &'static str {
    match event {
        LifecycleEvent::Requested(_) => "requested",
        LifecycleEvent::Approved(_) => "approved",
        LifecycleEvent::Rejected(_) => "rejected",
        LifecycleEvent::Cancelled(_) => "cancelled",
    }
}

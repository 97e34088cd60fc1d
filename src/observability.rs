use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: join requests. Labels: outcome (going/confirmed/pending/waitlisted).
pub const JOINS_TOTAL: &str = "sideout_joins_total";

/// Counter: cancellations.
pub const CANCELLATIONS_TOTAL: &str = "sideout_cancellations_total";

/// Counter: waitlist promotions triggered by cancellation.
pub const PROMOTIONS_TOTAL: &str = "sideout_promotions_total";

/// Counter: deadline settlements that actually ran (not no-ops).
pub const SETTLEMENTS_TOTAL: &str = "sideout_settlements_total";

/// Counter: administrator reorders.
pub const REORDERS_TOTAL: &str = "sideout_reorders_total";

/// Histogram: pending claims processed per settlement.
pub const SETTLE_PENDING_SIZE: &str = "sideout_settle_pending_size";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

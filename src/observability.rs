use std::net::SocketAddr;

use crate::config::Config;
use crate::engine::EngineError;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: booking requests. Labels: outcome.
pub const BOOKING_REQUESTS_TOTAL: &str = "bayline_booking_requests_total";

/// Counter: overlaps detected. Labels: stage (pre_lock, post_lock, storage).
pub const BOOKING_CONFLICTS_TOTAL: &str = "bayline_booking_conflicts_total";

/// Counter: cancellations accepted.
pub const BOOKINGS_CANCELLED_TOTAL: &str = "bayline_bookings_cancelled_total";

/// Counter: bookings whose service fee was waived for a puzzle streak.
pub const FEES_WAIVED_TOTAL: &str = "bayline_fees_waived_total";

/// Counter: payment failures that rolled back a persisted booking.
pub const PAYMENT_ROLLBACKS_TOTAL: &str = "bayline_payment_rollbacks_total";

/// Histogram: week availability computation time in seconds.
pub const WEEK_QUERY_DURATION_SECONDS: &str = "bayline_week_query_duration_seconds";

// ── USE metrics (resource utilization) ──────────────────────────

/// Histogram: time spent waiting for the booking lock in seconds.
pub const LOCK_WAIT_SECONDS: &str = "bayline_lock_wait_seconds";

/// Counter: booking lock acquisitions that timed out.
pub const LOCK_TIMEOUTS_TOTAL: &str = "bayline_lock_timeouts_total";

/// Install the fmt subscriber and, if a port is configured, the Prometheus
/// exporter. Safe to call more than once; later subscriber installs are ignored.
pub fn init(config: &Config) {
    let _ = tracing_subscriber::fmt().try_init();

    let Some(port) = config.metrics_port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    match metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
    {
        Ok(()) => tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics"),
        Err(e) => tracing::warn!("failed to install Prometheus exporter: {e}"),
    }
}

/// Map a booking outcome to a short label for metrics.
pub fn outcome_label(result: &Result<(), &EngineError>) -> &'static str {
    match result {
        Ok(()) => "created",
        Err(EngineError::NotFound(_)) => "not_found",
        Err(EngineError::SchedulingConflict(_)) => "conflict",
        Err(EngineError::OutsideAvailability { .. }) => "unavailable",
        Err(EngineError::LockTimeout) => "lock_timeout",
        Err(EngineError::Validation(_)) => "invalid",
        Err(EngineError::DependencyUnsatisfied(_)) => "no_payable_account",
        Err(EngineError::NotOwner { .. }) => "not_owner",
        Err(EngineError::PastBooking(_)) => "past",
        Err(EngineError::PaymentFailed(_)) => "payment_failed",
        Err(EngineError::Store(_)) => "store_error",
    }
}

//! Prometheus metrics collection for callwatch.
//!
//! Exposed on the health HTTP endpoint. Tracks exchange throughput, error
//! classes and notification activity.

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

/// Total FastAGI exchanges accepted.
pub static EXCHANGES_TOTAL: OnceLock<IntCounter> = OnceLock::new();

/// Exchanges that failed, by error code.
pub static EXCHANGE_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Notifications sent, by action (post or update).
pub static NOTIFICATIONS_SENT: OnceLock<IntCounterVec> = OnceLock::new();

/// Call records currently held in the registry.
pub static TRACKED_CALLS: OnceLock<IntGauge> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Must be called once at startup before any metrics are recorded.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            let m = $init.expect(concat!(stringify!($metric), " creation failed"));
            if let Err(e) = r.register(Box::new(m.clone())) {
                tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
            }
            let _ = $metric.set(m);
        };
    }

    register!(
        EXCHANGES_TOTAL,
        IntCounter::new("callwatch_exchanges_total", "FastAGI exchanges accepted")
    );
    register!(
        EXCHANGE_ERRORS,
        IntCounterVec::new(
            Opts::new("callwatch_exchange_errors_total", "Failed exchanges by error code"),
            &["code"]
        )
    );
    register!(
        NOTIFICATIONS_SENT,
        IntCounterVec::new(
            Opts::new("callwatch_notifications_total", "Slack notifications by action"),
            &["action"]
        )
    );
    register!(
        TRACKED_CALLS,
        IntGauge::new("callwatch_tracked_calls", "Call records held in the registry")
    );
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// Recording helpers are no-ops until init() runs, so unit tests don't have
// to set up the registry.

pub fn record_exchange() {
    if let Some(c) = EXCHANGES_TOTAL.get() {
        c.inc();
    }
}

pub fn record_exchange_error(code: &str) {
    if let Some(c) = EXCHANGE_ERRORS.get() {
        c.with_label_values(&[code]).inc();
    }
}

pub fn record_notification(action: &str) {
    if let Some(c) = NOTIFICATIONS_SENT.get() {
        c.with_label_values(&[action]).inc();
    }
}

pub fn record_tracked_calls(count: usize) {
    if let Some(g) = TRACKED_CALLS.get() {
        g.set(count as i64);
    }
}

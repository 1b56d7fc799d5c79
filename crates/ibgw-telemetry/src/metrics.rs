//! Prometheus metrics for the gateway pool.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration
//! failure means duplicate metric names, a fatal configuration error
//! that should crash at startup rather than fail silently. These
//! panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_int_gauge_vec, CounterVec, Encoder, IntGaugeVec, TextEncoder,
};

/// Gateway instances by lifecycle state.
/// Labels: status (starting/running/stopped/failed)
static GATEWAYS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "ibgw_gateways",
        "Gateway instances by lifecycle state",
        &["status"]
    )
    .unwrap()
});

/// Total reconnect attempts across all tenants.
static RECONNECT_ATTEMPTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "ibgw_reconnect_attempts_total",
        "Total protocol reconnect attempts",
        &["tenant"]
    )
    .unwrap()
});

/// Instances that failed before their connection became live.
static STARTUP_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "ibgw_startup_failures_total",
        "Gateway instances that hit the startup deadline or a runtime error",
        &["tenant", "reason"]
    )
    .unwrap()
});

/// Credential resolutions that took the fallback path.
static CREDENTIAL_FALLBACKS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "ibgw_credential_fallbacks_total",
        "Credential resolutions that degraded to the fallback identifier",
        &["tenant", "reason"]
    )
    .unwrap()
});

/// Metrics facade. All methods are no-fail and safe to call from any task.
pub struct Metrics;

impl Metrics {
    /// Record an instance entering a lifecycle state.
    pub fn gateway_entered(status: &str) {
        GATEWAYS_BY_STATUS.with_label_values(&[status]).inc();
    }

    /// Record an instance leaving a lifecycle state.
    pub fn gateway_left(status: &str) {
        GATEWAYS_BY_STATUS.with_label_values(&[status]).dec();
    }

    pub fn reconnect_attempt(tenant: &str) {
        RECONNECT_ATTEMPTS_TOTAL.with_label_values(&[tenant]).inc();
    }

    pub fn startup_failure(tenant: &str, reason: &str) {
        STARTUP_FAILURES_TOTAL
            .with_label_values(&[tenant, reason])
            .inc();
    }

    pub fn credential_fallback(tenant: &str, reason: &str) {
        CREDENTIAL_FALLBACKS_TOTAL
            .with_label_values(&[tenant, reason])
            .inc();
    }

    /// Render all registered metrics in the Prometheus text format.
    pub fn gather() -> String {
        let encoder = TextEncoder::new();
        let families = prometheus::gather();
        let mut buffer = Vec::new();
        if encoder.encode(&families, &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

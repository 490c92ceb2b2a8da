use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder};

// Prometheus metrics (default registry)
pub static CACHE_HITS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "billing_settings_cache_hits_total",
        "Resolved-settings cache hits",
        &["concern"]
    )
    .expect("register cache_hits_total")
});

pub static CACHE_MISSES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "billing_settings_cache_misses_total",
        "Resolved-settings cache misses",
        &["concern"]
    )
    .expect("register cache_misses_total")
});

pub static CACHE_ERRORS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "billing_settings_cache_errors_total",
        "Cache backend failures that fell through to direct resolution"
    )
    .expect("register cache_errors_total")
});

pub static SETTINGS_WRITTEN_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "billing_settings_written_total",
        "Setting entries persisted by upserts"
    )
    .expect("register settings_written_total")
});

pub static SETTINGS_REJECTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "billing_settings_rejected_total",
        "Setting entries dropped by the key/value allow-list"
    )
    .expect("register settings_rejected_total")
});

pub static ORPHANS_DELETED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "billing_brand_orphans_deleted_total",
        "Replaced brand asset files removed from storage"
    )
    .expect("register orphans_deleted_total")
});

pub static BEST_EFFORT_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "billing_best_effort_failures_total",
        "Swallowed failures of non-critical operations",
        &["operation"]
    )
    .expect("register best_effort_failures_total")
});

/// Render the default registry in the Prometheus text format.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    if encoder.encode(&prometheus::gather(), &mut buf).is_err() {
        return String::new();
    }
    String::from_utf8(buf).unwrap_or_default()
}

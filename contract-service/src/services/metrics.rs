//! Metrics module for contract-service.
//! Provides Prometheus metrics for edit processing and event delivery.

use once_cell::sync::Lazy;
use prometheus::{
    histogram_opts, opts, register_histogram, register_int_counter_vec, Encoder, Histogram,
    IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

/// Edit processing duration histogram
pub static EDIT_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(histogram_opts!(
        "contract_edit_duration_seconds",
        "Contract edit processing duration",
        vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25]
    ))
    .expect("Failed to register EDIT_DURATION")
});

/// Contract edits counter
pub static EDITS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Bridge credits upserted counter
pub static BRIDGE_CREDITS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Outbound events counter
pub static EVENTS_EMITTED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Low-balance alerts counter
pub static LOW_BALANCE_ALERTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Call once at startup.
pub fn init_metrics() {
    EDITS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "contract_edits_total",
                "Total contract edits by outcome"
            ),
            &["outcome"]
        )
        .expect("Failed to register EDITS_TOTAL")
    });

    BRIDGE_CREDITS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "contract_bridge_credits_total",
                "Total bridge credits upserted by product"
            ),
            &["product_id"]
        )
        .expect("Failed to register BRIDGE_CREDITS_TOTAL")
    });

    EVENTS_EMITTED_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "contract_events_emitted_total",
                "Total outbound webhook events by type and status"
            ),
            &["event_type", "status"]
        )
        .expect("Failed to register EVENTS_EMITTED_TOTAL")
    });

    LOW_BALANCE_ALERTS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "contract_low_balance_alerts_total",
                "Total low-balance alerts by customer"
            ),
            &["customer_id"]
        )
        .expect("Failed to register LOW_BALANCE_ALERTS_TOTAL")
    });

    // Force initialization of lazy statics
    let _ = &*EDIT_DURATION;
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .expect("Failed to encode metrics");
    String::from_utf8(buffer).expect("Failed to convert metrics to string")
}

/// Record a processed edit.
pub fn record_edit(outcome: &str) {
    if let Some(counter) = EDITS_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

/// Record a bridge credit upsert.
pub fn record_bridge_credit(product_id: &str) {
    if let Some(counter) = BRIDGE_CREDITS_TOTAL.get() {
        counter.with_label_values(&[product_id]).inc();
    }
}

/// Record an outbound event delivery attempt.
pub fn record_event_emitted(event_type: &str, status: &str) {
    if let Some(counter) = EVENTS_EMITTED_TOTAL.get() {
        counter.with_label_values(&[event_type, status]).inc();
    }
}

/// Record a low-balance alert.
pub fn record_low_balance_alert(customer_id: &str) {
    if let Some(counter) = LOW_BALANCE_ALERTS_TOTAL.get() {
        counter.with_label_values(&[customer_id]).inc();
    }
}

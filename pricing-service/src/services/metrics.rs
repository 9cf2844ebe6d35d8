//! Metrics module for pricing-service.
//! Provides Prometheus counters for validation outcomes and bill item generation.

use once_cell::sync::Lazy;
use prometheus::{
    histogram_opts, opts, register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec,
    IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

use crate::error::{ErrorKind, PricingError};

/// Repository lookup duration histogram
pub static LOOKUP_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        histogram_opts!(
            "pricing_lookup_duration_seconds",
            "Repository lookup duration"
        ),
        &["lookup"]
    )
    .expect("Failed to register LOOKUP_DURATION")
});

/// Price validations by operation and outcome
pub static PRICE_VALIDATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Discount validations by operation and outcome
pub static DISCOUNT_VALIDATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Generated bill items by product type
pub static BILL_ITEMS_GENERATED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Safe to call more than once.
pub fn init_metrics() {
    PRICE_VALIDATIONS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "pricing_price_validations_total",
                "Total price validations by operation and outcome"
            ),
            &["operation", "outcome"]
        )
        .expect("Failed to register PRICE_VALIDATIONS_TOTAL")
    });

    DISCOUNT_VALIDATIONS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "pricing_discount_validations_total",
                "Total discount validations by operation and outcome"
            ),
            &["operation", "outcome"]
        )
        .expect("Failed to register DISCOUNT_VALIDATIONS_TOTAL")
    });

    BILL_ITEMS_GENERATED_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "pricing_bill_items_generated_total",
                "Total bill items priced for generation by product type"
            ),
            &["product_type"]
        )
        .expect("Failed to register BILL_ITEMS_GENERATED_TOTAL")
    });
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %err, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Outcome label of a validation result.
pub fn outcome_label<T>(result: &Result<T, PricingError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(err) => match err.kind() {
            ErrorKind::FailedPrecondition => "failed_precondition",
            ErrorKind::Internal => "internal",
        },
    }
}

/// Record a price validation.
pub fn record_price_validation(operation: &str, outcome: &str) {
    if let Some(counter) = PRICE_VALIDATIONS_TOTAL.get() {
        counter.with_label_values(&[operation, outcome]).inc();
    }
}

/// Record a discount validation.
pub fn record_discount_validation(operation: &str, outcome: &str) {
    if let Some(counter) = DISCOUNT_VALIDATIONS_TOTAL.get() {
        counter.with_label_values(&[operation, outcome]).inc();
    }
}

/// Record a generated bill item.
pub fn record_bill_item_generated(product_type: &str) {
    if let Some(counter) = BILL_ITEMS_GENERATED_TOTAL.get() {
        counter.with_label_values(&[product_type]).inc();
    }
}

//! pricing-service: order billing price, discount and tax reconciliation.
//!
//! [`PriceService`] checks the amounts claimed on bill items against product
//! prices, pro-rating ratios and adjustments, and prices upcoming bill items.
//! [`DiscountService`] checks claimed discounts against their persisted
//! definitions and eligibility rules.
pub mod error;
pub mod models;
pub mod services;

use service_core::config::Config;
use service_core::observability::init_tracing;

pub use error::{ErrorKind, PricingError};
pub use services::{
    DiscountPriceCalculator, DiscountService, PriceService, TaxPriceCalculator,
};

/// Price service running on a Postgres connection of the caller's transaction.
pub type PgPriceService = PriceService<sqlx::PgConnection>;

/// Discount service running on a Postgres connection of the caller's transaction.
pub type PgDiscountService = DiscountService<sqlx::PgConnection>;

/// Install tracing and register metrics. Call once at startup.
pub fn init_observability(config: &Config) {
    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );
    services::init_metrics();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_observability_is_repeatable() {
        let config = Config {
            service_name: "pricing-service".to_string(),
            log_level: "debug".to_string(),
            otlp_endpoint: None,
        };
        init_observability(&config);
        init_observability(&config);

        services::metrics::record_bill_item_generated("PRODUCT_TYPE_FEE");
        assert!(services::get_metrics().contains("pricing_bill_items_generated_total"));
    }
}

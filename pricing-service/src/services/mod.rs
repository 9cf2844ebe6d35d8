//! Services module for pricing-service.

pub mod amount;
pub mod discount;
pub mod metrics;
pub mod price;
pub mod repository;
pub mod tax;

pub use discount::{calculate_discount_price, DiscountPriceCalculator, DiscountService};
pub use metrics::{get_metrics, init_metrics};
pub use price::{
    validate_adjustment_price, validate_adjustment_price_for_cancel_order, PriceService,
};
pub use repository::{
    DiscountRepository, ProductDiscountRepository, ProductPriceRepository,
    UserDiscountTagRepository,
};
pub use tax::TaxPriceCalculator;

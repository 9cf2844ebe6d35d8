//! Domain models for pricing-service.

mod billing;
mod discount;
mod order;
mod product;
mod tax;

use thiserror::Error;

pub use billing::{
    BillItem, BillingItemDescription, BillingRatio, BillingSchedulePeriod, CourseItem,
    UpcomingBillItem,
};
pub use discount::{Discount, DiscountAmountType, DiscountType, ProductDiscount, UserDiscountTag};
pub use order::{BillingItemData, DiscountBillItem, Order, OrderItem, OrderItemData};
pub use product::{Package, PackageInfo, PriceType, Product, ProductPrice, ProductType, QuantityType};
pub use tax::{Tax, TaxCategory};

/// Returned when an external enum string has no matching variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

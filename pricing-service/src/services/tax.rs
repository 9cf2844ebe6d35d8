//! Tax calculation seam.

use crate::error::PricingError;
use crate::models::{BillItem, Tax};

/// Applies a tax policy to a price and stamps the tax fields of `bill_item`.
///
/// Returns the tax-adjusted final price.
pub trait TaxPriceCalculator: Send + Sync {
    fn calculate_tax_price(
        &self,
        tax: &Tax,
        price: f32,
        bill_item: &mut BillItem,
    ) -> Result<f32, PricingError>;
}

//! Money arithmetic shared by the price and discount checks.
//!
//! Claimed amounts are `f32`; persisted amounts are `Decimal`. Comparisons
//! between the two happen at two decimal places.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::DiscountAmountType;

/// Largest difference at which two claimed amounts are still equal.
pub const AMOUNT_TOLERANCE: f32 = 0.01;

pub fn decimal_to_f32(value: Decimal) -> f32 {
    value.to_f32().unwrap_or_default()
}

/// `None` for NaN or infinite values.
pub fn f32_to_decimal(value: f32) -> Option<Decimal> {
    Decimal::from_f32(value)
}

/// Tolerance comparison of two amounts.
pub fn compare_amount_value(left: f32, right: f32) -> bool {
    (left - right).abs() < AMOUNT_TOLERANCE
}

/// Compares a persisted amount with a claimed one, both rounded to cents.
pub fn is_equal_decimal_and_f32(persisted: Decimal, claimed: f32) -> bool {
    match f32_to_decimal(claimed) {
        Some(claimed) => round_cents(persisted) == round_cents(claimed),
        None => false,
    }
}

/// Discount amount for `price`: a percentage of it, or `value` itself.
pub fn discount_amount_for(price: f32, amount_type: Option<DiscountAmountType>, value: f32) -> f32 {
    match amount_type {
        Some(DiscountAmountType::Percentage) => price * value / 100.0,
        _ => value,
    }
}

fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

//! Billing period, pro-rating ratio and bill item models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{DiscountAmountType, ProductType, QuantityType, TaxCategory};

/// Fraction of a billing period that is actually owed.
///
/// A zero numerator or denominator means the period contributes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingRatio {
    pub numerator: i32,
    pub denominator: i32,
}

impl BillingRatio {
    /// The whole period.
    pub const FULL: BillingRatio = BillingRatio {
        numerator: 1,
        denominator: 1,
    };

    pub fn new(numerator: i32, denominator: i32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.numerator == 0 || self.denominator == 0
    }

    pub fn is_full(&self) -> bool {
        !self.is_zero() && self.numerator == self.denominator
    }

    /// `amount * numerator / denominator`, or 0 for a zero ratio.
    pub fn apply(&self, amount: f32) -> f32 {
        if self.is_zero() {
            return 0.0;
        }
        amount * self.numerator as f32 / self.denominator as f32
    }

    /// `amount * denominator / numerator`, or 0 for a zero ratio.
    pub fn invert(&self, amount: f32) -> f32 {
        if self.is_zero() {
            return 0.0;
        }
        amount * self.denominator as f32 / self.numerator as f32
    }
}

/// One cycle of a billing schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingSchedulePeriod {
    pub billing_schedule_period_id: String,
    pub billing_schedule_id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// Persisted bill item.
///
/// Read as the previous cycle when computing adjustments, and filled in when
/// the next cycle is generated. The default value stands for "nothing billed".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillItem {
    pub order_id: String,
    pub student_id: String,
    pub product_id: String,
    pub billing_schedule_period_id: Option<String>,
    pub billing_date: Option<DateTime<Utc>>,
    pub price: Decimal,
    pub final_price: Decimal,
    pub product_pricing: Option<Decimal>,
    pub adjustment_price: Option<Decimal>,
    pub billing_ratio_numerator: Option<i32>,
    pub billing_ratio_denominator: Option<i32>,
    pub discount_id: Option<String>,
    pub discount_amount_type: Option<DiscountAmountType>,
    pub discount_amount_value: Option<Decimal>,
    pub discount_amount: Option<Decimal>,
    pub raw_discount_amount: Option<Decimal>,
    pub tax_id: Option<String>,
    pub tax_category: Option<TaxCategory>,
    pub tax_percentage: Option<Decimal>,
    pub tax_amount: Option<Decimal>,
}

/// Next-cycle bill item scheduled for generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpcomingBillItem {
    pub order_id: String,
    pub product_id: String,
    pub billing_schedule_period_id: String,
    pub billing_date: DateTime<Utc>,
}

/// Course included in a package, with its booked slots or weight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseItem {
    pub course_id: String,
    pub course_name: String,
    pub weight: Option<i32>,
    pub slot: Option<i32>,
}

/// Description of the product being billed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingItemDescription {
    pub product_id: String,
    pub product_name: String,
    pub product_type: ProductType,
    pub quantity_type: Option<QuantityType>,
    #[serde(default)]
    pub course_items: Vec<CourseItem>,
}

impl BillingItemDescription {
    /// Quantity owed for the package: summed course weights or slots.
    /// `None` when the sum does not fit in an `i32`.
    pub fn owed_quantity(&self) -> Option<i32> {
        let per_course = |item: &CourseItem| match self.quantity_type {
            Some(QuantityType::CourseWeight) => item.weight.unwrap_or_default(),
            Some(QuantityType::Slot) | Some(QuantityType::SlotPerWeek) => item.slot.unwrap_or_default(),
            None => 0,
        };
        self.course_items
            .iter()
            .try_fold(0i32, |total, item| total.checked_add(per_course(item)))
    }
}

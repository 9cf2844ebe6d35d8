//! Discount model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ParseEnumError;

/// Discount category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscountType {
    #[serde(rename = "DISCOUNT_TYPE_REGULAR")]
    Regular,
    #[serde(rename = "DISCOUNT_TYPE_COMBO")]
    Combo,
    #[serde(rename = "DISCOUNT_TYPE_SIBLING")]
    Sibling,
    #[serde(rename = "DISCOUNT_TYPE_EMPLOYEE_FULL_TIME")]
    EmployeeFullTime,
    #[serde(rename = "DISCOUNT_TYPE_EMPLOYEE_PART_TIME")]
    EmployeePartTime,
    #[serde(rename = "DISCOUNT_TYPE_SINGLE_PARENT")]
    SingleParent,
    #[serde(rename = "DISCOUNT_TYPE_FAMILY")]
    Family,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Regular => "DISCOUNT_TYPE_REGULAR",
            DiscountType::Combo => "DISCOUNT_TYPE_COMBO",
            DiscountType::Sibling => "DISCOUNT_TYPE_SIBLING",
            DiscountType::EmployeeFullTime => "DISCOUNT_TYPE_EMPLOYEE_FULL_TIME",
            DiscountType::EmployeePartTime => "DISCOUNT_TYPE_EMPLOYEE_PART_TIME",
            DiscountType::SingleParent => "DISCOUNT_TYPE_SINGLE_PARENT",
            DiscountType::Family => "DISCOUNT_TYPE_FAMILY",
        }
    }
}

impl FromStr for DiscountType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DISCOUNT_TYPE_REGULAR" => Ok(DiscountType::Regular),
            "DISCOUNT_TYPE_COMBO" => Ok(DiscountType::Combo),
            "DISCOUNT_TYPE_SIBLING" => Ok(DiscountType::Sibling),
            "DISCOUNT_TYPE_EMPLOYEE_FULL_TIME" => Ok(DiscountType::EmployeeFullTime),
            "DISCOUNT_TYPE_EMPLOYEE_PART_TIME" => Ok(DiscountType::EmployeePartTime),
            "DISCOUNT_TYPE_SINGLE_PARENT" => Ok(DiscountType::SingleParent),
            "DISCOUNT_TYPE_FAMILY" => Ok(DiscountType::Family),
            other => Err(ParseEnumError::new("discount type", other)),
        }
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a discount amount is derived from its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscountAmountType {
    /// Value is a percentage of the price.
    #[serde(rename = "DISCOUNT_AMOUNT_TYPE_PERCENTAGE")]
    Percentage,
    /// Value is the amount itself.
    #[serde(rename = "DISCOUNT_AMOUNT_TYPE_FIXED_AMOUNT")]
    FixedAmount,
}

impl DiscountAmountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountAmountType::Percentage => "DISCOUNT_AMOUNT_TYPE_PERCENTAGE",
            DiscountAmountType::FixedAmount => "DISCOUNT_AMOUNT_TYPE_FIXED_AMOUNT",
        }
    }
}

impl FromStr for DiscountAmountType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DISCOUNT_AMOUNT_TYPE_PERCENTAGE" => Ok(DiscountAmountType::Percentage),
            "DISCOUNT_AMOUNT_TYPE_FIXED_AMOUNT" => Ok(DiscountAmountType::FixedAmount),
            other => Err(ParseEnumError::new("discount amount type", other)),
        }
    }
}

impl fmt::Display for DiscountAmountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted discount definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    pub discount_id: String,
    pub name: String,
    pub discount_type: DiscountType,
    pub discount_amount_type: DiscountAmountType,
    pub discount_amount_value: Decimal,
    /// Maximum number of recurring cycles the discount may be applied to.
    pub recurring_valid_duration: Option<i32>,
    pub available_from: DateTime<Utc>,
    pub available_until: DateTime<Utc>,
    /// Set for organization-level discounts granted through a user tag.
    pub discount_tag_id: Option<String>,
}

impl Discount {
    /// Whether `now` falls in `[available_from, available_until)`.
    pub fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        self.available_from <= now && now < self.available_until
    }
}

/// Link allowing a discount to be applied to a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDiscount {
    pub product_id: String,
    pub discount_id: String,
}

/// Discount tag held by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDiscountTag {
    pub user_id: String,
    pub discount_tag_id: String,
}

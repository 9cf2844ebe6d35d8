//! Product and product price models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ParseEnumError;

/// Kind of sellable product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductType {
    #[serde(rename = "PRODUCT_TYPE_FEE")]
    Fee,
    #[serde(rename = "PRODUCT_TYPE_MATERIAL")]
    Material,
    #[serde(rename = "PRODUCT_TYPE_PACKAGE")]
    Package,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Fee => "PRODUCT_TYPE_FEE",
            ProductType::Material => "PRODUCT_TYPE_MATERIAL",
            ProductType::Package => "PRODUCT_TYPE_PACKAGE",
        }
    }
}

impl FromStr for ProductType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PRODUCT_TYPE_FEE" => Ok(ProductType::Fee),
            "PRODUCT_TYPE_MATERIAL" => Ok(ProductType::Material),
            "PRODUCT_TYPE_PACKAGE" => Ok(ProductType::Package),
            other => Err(ParseEnumError::new("product type", other)),
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the owed quantity of a package is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuantityType {
    #[serde(rename = "QUANTITY_TYPE_COURSE_WEIGHT")]
    CourseWeight,
    #[serde(rename = "QUANTITY_TYPE_SLOT")]
    Slot,
    #[serde(rename = "QUANTITY_TYPE_SLOT_PER_WEEK")]
    SlotPerWeek,
}

impl QuantityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuantityType::CourseWeight => "QUANTITY_TYPE_COURSE_WEIGHT",
            QuantityType::Slot => "QUANTITY_TYPE_SLOT",
            QuantityType::SlotPerWeek => "QUANTITY_TYPE_SLOT_PER_WEEK",
        }
    }
}

impl FromStr for QuantityType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QUANTITY_TYPE_COURSE_WEIGHT" => Ok(QuantityType::CourseWeight),
            "QUANTITY_TYPE_SLOT" => Ok(QuantityType::Slot),
            "QUANTITY_TYPE_SLOT_PER_WEEK" => Ok(QuantityType::SlotPerWeek),
            other => Err(ParseEnumError::new("quantity type", other)),
        }
    }
}

/// Pricing tier used to pick one of several price rows of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceType {
    #[serde(rename = "DEFAULT_PRICE")]
    Default,
    #[serde(rename = "ENROLLED_PRICE")]
    Enrolled,
}

impl PriceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceType::Default => "DEFAULT_PRICE",
            PriceType::Enrolled => "ENROLLED_PRICE",
        }
    }
}

impl FromStr for PriceType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEFAULT_PRICE" => Ok(PriceType::Default),
            "ENROLLED_PRICE" => Ok(PriceType::Enrolled),
            other => Err(ParseEnumError::new("price type", other)),
        }
    }
}

impl fmt::Display for PriceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sellable product reference data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub name: String,
    pub product_type: ProductType,
}

/// Package definition backing a package product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub package_id: String,
    pub quantity_type: Option<QuantityType>,
}

/// Package chosen by an order item together with the ordered quantity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub quantity: i32,
    pub package: Package,
}

/// Priced offer for a product.
///
/// A row may be scoped to a billing schedule period and/or a quantity. Several
/// rows can exist per product, one per price type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPrice {
    pub product_id: String,
    pub billing_schedule_period_id: Option<String>,
    pub quantity: Option<i32>,
    pub price: Decimal,
    pub price_type: PriceType,
}

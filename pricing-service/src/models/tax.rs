//! Tax model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::ParseEnumError;

/// Whether the tax is already part of the price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaxCategory {
    #[serde(rename = "TAX_CATEGORY_INCLUSIVE")]
    Inclusive,
    #[serde(rename = "TAX_CATEGORY_EXCLUSIVE")]
    Exclusive,
}

impl TaxCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxCategory::Inclusive => "TAX_CATEGORY_INCLUSIVE",
            TaxCategory::Exclusive => "TAX_CATEGORY_EXCLUSIVE",
        }
    }
}

impl FromStr for TaxCategory {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TAX_CATEGORY_INCLUSIVE" => Ok(TaxCategory::Inclusive),
            "TAX_CATEGORY_EXCLUSIVE" => Ok(TaxCategory::Exclusive),
            other => Err(ParseEnumError::new("tax category", other)),
        }
    }
}

/// Tax policy handed to the tax calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tax {
    pub tax_id: String,
    pub name: String,
    pub tax_percentage: Decimal,
    pub tax_category: TaxCategory,
}

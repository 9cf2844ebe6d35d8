//! Order item and bill item claim models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DiscountAmountType, DiscountType, PackageInfo, PriceType, Product, ProductType};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub student_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_id: String,
    pub product_id: String,
    pub discount_id: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub effective_date: Option<DateTime<Utc>>,
}

/// Discount claimed on a bill item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountBillItem {
    pub discount_id: String,
    pub discount_type: DiscountType,
    pub discount_amount_type: DiscountAmountType,
    pub discount_amount_value: f32,
    pub discount_amount: f32,
}

/// Amounts a caller claims for one bill item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillingItemData {
    pub product_id: String,
    pub billing_schedule_period_id: Option<String>,
    pub price: f32,
    pub final_price: f32,
    pub quantity: Option<i32>,
    pub discount_item: Option<DiscountBillItem>,
    pub adjustment_price: Option<f32>,
}

impl BillingItemData {
    /// Claimed discount amount, 0 when no discount is claimed.
    pub fn discount_amount(&self) -> f32 {
        self.discount_item
            .as_ref()
            .map(|item| item.discount_amount)
            .unwrap_or_default()
    }
}

/// Everything needed to reconcile one order item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemData {
    pub order: Order,
    pub order_item: OrderItem,
    pub product_info: Product,
    #[serde(default)]
    pub package_info: PackageInfo,
    pub bill_items: Vec<BillingItemData>,
    pub product_type: ProductType,
    pub price_type: PriceType,
    #[serde(default)]
    pub is_disable_pro_rating_flag: bool,
}

impl OrderItemData {
    pub fn product_id(&self) -> &str {
        &self.product_info.product_id
    }

    pub fn is_package(&self) -> bool {
        self.product_type == ProductType::Package
    }
}

//! Test helper module for pricing-service integration tests.
//!
//! Provides in-memory repositories answering the production lookups, simple
//! tax calculators and fixture builders. The connection handle is `()`.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use pricing_service::error::PricingError;
use pricing_service::models::*;
use pricing_service::services::{
    DiscountRepository, DiscountService, PriceService, ProductDiscountRepository,
    ProductPriceRepository, TaxPriceCalculator, UserDiscountTagRepository,
};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::sync::{Arc, Mutex};

// Test constants for order context
pub const TEST_ORDER_ID: &str = "order-1";
pub const TEST_STUDENT_ID: &str = "student-1";
pub const TEST_PRODUCT_ID: &str = "product-1";
pub const TEST_PACKAGE_ID: &str = "product-1";
pub const TEST_DISCOUNT_ID: &str = "discount-1";
pub const TEST_TAG_ID: &str = "tag-1";

fn database_error(operation: &str) -> AppError {
    AppError::DatabaseError(anyhow::anyhow!("{} failed: connection reset", operation))
}

/// Product prices held in memory.
#[derive(Default)]
pub struct InMemoryProductPrices {
    rows: Vec<ProductPrice>,
    failing: bool,
    queries: Mutex<Vec<String>>,
}

impl InMemoryProductPrices {
    pub fn new(rows: Vec<ProductPrice>) -> Self {
        Self {
            rows,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    /// Names of the lookups issued so far.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    fn record(&self, query: &str) -> Result<(), AppError> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.failing {
            return Err(database_error(query));
        }
        Ok(())
    }

    fn find(
        &self,
        product_id: &str,
        period_id: Option<&str>,
        quantity: Option<i32>,
        price_type: PriceType,
    ) -> Result<ProductPrice, AppError> {
        self.rows
            .iter()
            .find(|row| {
                row.product_id == product_id
                    && row.billing_schedule_period_id.as_deref() == period_id
                    && row.quantity == quantity
                    && row.price_type == price_type
            })
            .cloned()
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("product price of {} not found", product_id)))
    }
}

#[async_trait]
impl ProductPriceRepository<()> for InMemoryProductPrices {
    async fn get_by_product_id_and_price_type(
        &self,
        _conn: &mut (),
        product_id: &str,
        price_type: PriceType,
    ) -> Result<Vec<ProductPrice>, AppError> {
        self.record("by_product")?;
        Ok(self
            .rows
            .iter()
            .filter(|row| row.product_id == product_id && row.price_type == price_type)
            .cloned()
            .collect())
    }

    async fn get_by_product_id_and_quantity_and_price_type(
        &self,
        _conn: &mut (),
        product_id: &str,
        quantity: i32,
        price_type: PriceType,
    ) -> Result<ProductPrice, AppError> {
        self.record("by_quantity")?;
        self.find(product_id, None, Some(quantity), price_type)
    }

    async fn get_by_product_id_and_billing_schedule_period_id_and_price_type(
        &self,
        _conn: &mut (),
        product_id: &str,
        billing_schedule_period_id: &str,
        price_type: PriceType,
    ) -> Result<ProductPrice, AppError> {
        self.record("by_period")?;
        self.find(product_id, Some(billing_schedule_period_id), None, price_type)
    }

    async fn get_by_product_id_and_billing_schedule_period_id_and_quantity_and_price_type(
        &self,
        _conn: &mut (),
        product_id: &str,
        billing_schedule_period_id: &str,
        quantity: i32,
        price_type: PriceType,
    ) -> Result<ProductPrice, AppError> {
        self.record("by_period_and_quantity")?;
        self.find(
            product_id,
            Some(billing_schedule_period_id),
            Some(quantity),
            price_type,
        )
    }
}

/// Discounts, product links and user tags held in memory.
#[derive(Default)]
pub struct InMemoryDiscounts {
    pub discounts: Vec<Discount>,
    pub product_discounts: Vec<ProductDiscount>,
    pub user_tags: Vec<UserDiscountTag>,
    pub failing_discounts: bool,
    pub failing_tags: bool,
}

impl InMemoryDiscounts {
    /// A discount linked to [`TEST_PRODUCT_ID`].
    pub fn linked(discount: Discount) -> Self {
        Self {
            product_discounts: vec![ProductDiscount {
                product_id: TEST_PRODUCT_ID.to_string(),
                discount_id: discount.discount_id.clone(),
            }],
            discounts: vec![discount],
            ..Default::default()
        }
    }
}

#[async_trait]
impl DiscountRepository<()> for InMemoryDiscounts {
    async fn get_by_id_for_update(
        &self,
        _conn: &mut (),
        discount_id: &str,
    ) -> Result<Discount, AppError> {
        if self.failing_discounts {
            return Err(database_error("get discount"));
        }
        self.discounts
            .iter()
            .find(|discount| discount.discount_id == discount_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("discount {} not found", discount_id)))
    }

    async fn get_by_ids(
        &self,
        _conn: &mut (),
        discount_ids: &[String],
    ) -> Result<Vec<Discount>, AppError> {
        if self.failing_discounts {
            return Err(database_error("get discounts"));
        }
        Ok(self
            .discounts
            .iter()
            .filter(|discount| discount_ids.contains(&discount.discount_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProductDiscountRepository<()> for InMemoryDiscounts {
    async fn get_by_product_id_and_discount_id(
        &self,
        _conn: &mut (),
        product_id: &str,
        discount_id: &str,
    ) -> Result<Option<ProductDiscount>, AppError> {
        Ok(self
            .product_discounts
            .iter()
            .find(|link| link.product_id == product_id && link.discount_id == discount_id)
            .cloned())
    }
}

#[async_trait]
impl UserDiscountTagRepository<()> for InMemoryDiscounts {
    async fn get_discount_tag_by_user_id_and_discount_tag_id(
        &self,
        _conn: &mut (),
        user_id: &str,
        discount_tag_id: &str,
    ) -> Result<Vec<UserDiscountTag>, AppError> {
        if self.failing_tags {
            return Err(database_error("get discount tag"));
        }
        Ok(self
            .user_tags
            .iter()
            .filter(|tag| tag.user_id == user_id && tag.discount_tag_id == discount_tag_id)
            .cloned()
            .collect())
    }

    async fn get_available_discount_tag_ids_by_user_id(
        &self,
        _conn: &mut (),
        user_id: &str,
    ) -> Result<Vec<String>, AppError> {
        if self.failing_tags {
            return Err(database_error("get discount tags"));
        }
        Ok(self
            .user_tags
            .iter()
            .filter(|tag| tag.user_id == user_id)
            .map(|tag| tag.discount_tag_id.clone())
            .collect())
    }
}

/// Exclusive tax added on top of the price.
pub struct ExclusiveTaxCalculator;

impl TaxPriceCalculator for ExclusiveTaxCalculator {
    fn calculate_tax_price(
        &self,
        tax: &Tax,
        price: f32,
        bill_item: &mut BillItem,
    ) -> Result<f32, PricingError> {
        let percentage = tax.tax_percentage.to_string().parse::<f32>().unwrap_or_default();
        let tax_amount = price * percentage / 100.0;
        bill_item.tax_id = Some(tax.tax_id.clone());
        bill_item.tax_category = Some(tax.tax_category);
        bill_item.tax_percentage = Some(tax.tax_percentage);
        bill_item.tax_amount = Decimal::from_f32(tax_amount);
        Ok(price + tax_amount)
    }
}

/// Tax calculator that always fails.
pub struct FailingTaxCalculator;

impl TaxPriceCalculator for FailingTaxCalculator {
    fn calculate_tax_price(
        &self,
        _tax: &Tax,
        _price: f32,
        _bill_item: &mut BillItem,
    ) -> Result<f32, PricingError> {
        Err(PricingError::internal("tax amount could not be assigned"))
    }
}

pub fn discount_service(store: InMemoryDiscounts) -> DiscountService<()> {
    let store = Arc::new(store);
    DiscountService::new(store.clone(), store.clone(), store)
}

pub fn price_service(prices: Arc<InMemoryProductPrices>) -> PriceService<()> {
    price_service_with_tax(prices, Arc::new(ExclusiveTaxCalculator))
}

pub fn price_service_with_tax(
    prices: Arc<InMemoryProductPrices>,
    tax_calculator: Arc<dyn TaxPriceCalculator>,
) -> PriceService<()> {
    let discounts = Arc::new(discount_service(InMemoryDiscounts::default()));
    PriceService::new(prices, discounts, tax_calculator)
}

pub fn price_row(price: i64) -> ProductPrice {
    ProductPrice {
        product_id: TEST_PRODUCT_ID.to_string(),
        billing_schedule_period_id: None,
        quantity: None,
        price: Decimal::from(price),
        price_type: PriceType::Default,
    }
}

pub fn period_price_row(period_id: &str, price: i64) -> ProductPrice {
    ProductPrice {
        billing_schedule_period_id: Some(period_id.to_string()),
        ..price_row(price)
    }
}

/// Discount available for a month around now.
pub fn available_discount(amount_type: DiscountAmountType, value: i64) -> Discount {
    Discount {
        discount_id: TEST_DISCOUNT_ID.to_string(),
        name: "Early bird".to_string(),
        discount_type: DiscountType::Regular,
        discount_amount_type: amount_type,
        discount_amount_value: Decimal::from(value),
        recurring_valid_duration: None,
        available_from: Utc::now() - Duration::days(30),
        available_until: Utc::now() + Duration::days(30),
        discount_tag_id: None,
    }
}

pub fn discount_claim(amount_type: DiscountAmountType, value: f32, amount: f32) -> DiscountBillItem {
    DiscountBillItem {
        discount_id: TEST_DISCOUNT_ID.to_string(),
        discount_type: DiscountType::Regular,
        discount_amount_type: amount_type,
        discount_amount_value: value,
        discount_amount: amount,
    }
}

pub fn bill_item(price: f32, final_price: f32) -> BillingItemData {
    BillingItemData {
        product_id: TEST_PRODUCT_ID.to_string(),
        price,
        final_price,
        ..Default::default()
    }
}

pub fn period_bill_item(period_id: &str, price: f32, final_price: f32) -> BillingItemData {
    BillingItemData {
        billing_schedule_period_id: Some(period_id.to_string()),
        ..bill_item(price, final_price)
    }
}

pub fn order_item_data(product_type: ProductType, bill_items: Vec<BillingItemData>) -> OrderItemData {
    OrderItemData {
        order: Order {
            order_id: TEST_ORDER_ID.to_string(),
            student_id: TEST_STUDENT_ID.to_string(),
        },
        order_item: OrderItem {
            order_id: TEST_ORDER_ID.to_string(),
            product_id: TEST_PRODUCT_ID.to_string(),
            ..Default::default()
        },
        product_info: Product {
            product_id: TEST_PRODUCT_ID.to_string(),
            name: "Monthly tuition".to_string(),
            product_type,
        },
        package_info: PackageInfo {
            quantity: 0,
            package: Package {
                package_id: TEST_PACKAGE_ID.to_string(),
                quantity_type: None,
            },
        },
        bill_items,
        product_type,
        price_type: PriceType::Default,
        is_disable_pro_rating_flag: false,
    }
}

pub fn old_bill_item(period_id: &str, price: i64) -> BillItem {
    BillItem {
        order_id: TEST_ORDER_ID.to_string(),
        student_id: TEST_STUDENT_ID.to_string(),
        product_id: TEST_PRODUCT_ID.to_string(),
        billing_schedule_period_id: Some(period_id.to_string()),
        price: Decimal::from(price),
        final_price: Decimal::from(price),
        ..Default::default()
    }
}

//! Read-only lookups the engine depends on.
//!
//! Every method takes the caller's request-scoped handle `C` (a
//! `sqlx::PgConnection` inside a transaction in production). Implementations
//! must not open their own transactions.

use async_trait::async_trait;
use service_core::error::AppError;

use crate::models::{Discount, PriceType, ProductDiscount, ProductPrice, UserDiscountTag};

#[async_trait]
pub trait ProductPriceRepository<C: Send + 'static>: Send + Sync {
    /// All price rows of a product for a price type.
    async fn get_by_product_id_and_price_type(
        &self,
        conn: &mut C,
        product_id: &str,
        price_type: PriceType,
    ) -> Result<Vec<ProductPrice>, AppError>;

    async fn get_by_product_id_and_quantity_and_price_type(
        &self,
        conn: &mut C,
        product_id: &str,
        quantity: i32,
        price_type: PriceType,
    ) -> Result<ProductPrice, AppError>;

    async fn get_by_product_id_and_billing_schedule_period_id_and_price_type(
        &self,
        conn: &mut C,
        product_id: &str,
        billing_schedule_period_id: &str,
        price_type: PriceType,
    ) -> Result<ProductPrice, AppError>;

    async fn get_by_product_id_and_billing_schedule_period_id_and_quantity_and_price_type(
        &self,
        conn: &mut C,
        product_id: &str,
        billing_schedule_period_id: &str,
        quantity: i32,
        price_type: PriceType,
    ) -> Result<ProductPrice, AppError>;
}

#[async_trait]
pub trait DiscountRepository<C: Send + 'static>: Send + Sync {
    /// Loads a discount, locking its row in the caller's transaction.
    async fn get_by_id_for_update(
        &self,
        conn: &mut C,
        discount_id: &str,
    ) -> Result<Discount, AppError>;

    async fn get_by_ids(
        &self,
        conn: &mut C,
        discount_ids: &[String],
    ) -> Result<Vec<Discount>, AppError>;
}

#[async_trait]
pub trait ProductDiscountRepository<C: Send + 'static>: Send + Sync {
    async fn get_by_product_id_and_discount_id(
        &self,
        conn: &mut C,
        product_id: &str,
        discount_id: &str,
    ) -> Result<Option<ProductDiscount>, AppError>;
}

#[async_trait]
pub trait UserDiscountTagRepository<C: Send + 'static>: Send + Sync {
    async fn get_discount_tag_by_user_id_and_discount_tag_id(
        &self,
        conn: &mut C,
        user_id: &str,
        discount_tag_id: &str,
    ) -> Result<Vec<UserDiscountTag>, AppError>;

    async fn get_available_discount_tag_ids_by_user_id(
        &self,
        conn: &mut C,
        user_id: &str,
    ) -> Result<Vec<String>, AppError>;
}

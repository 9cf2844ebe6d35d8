//! Discount validation and discount-adjusted pricing.
//!
//! A discount claimed on a bill item is accepted only when it is linked to the
//! product (or, for organization-level discounts, the student holds its tag),
//! is inside its availability window, matches the persisted definition field
//! by field, and its amount can be reconstructed from the price.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::error::PricingError;
use crate::models::{
    BillItem, BillingItemData, BillingRatio, Discount, DiscountAmountType, DiscountBillItem,
    OrderItemData,
};

use super::amount::{
    compare_amount_value, decimal_to_f32, discount_amount_for, f32_to_decimal,
    is_equal_decimal_and_f32,
};
use super::metrics::{outcome_label, record_discount_validation, LOOKUP_DURATION};
use super::repository::{DiscountRepository, ProductDiscountRepository, UserDiscountTagRepository};

/// Applies a discount to a price and stamps the discount fields of `bill_item`.
///
/// Returns the discounted price.
pub trait DiscountPriceCalculator: Send + Sync {
    fn calculate_discount_price(
        &self,
        discount: &Discount,
        price: f32,
        bill_item: &mut BillItem,
    ) -> Result<f32, PricingError>;
}

pub struct DiscountService<C> {
    discount_repo: Arc<dyn DiscountRepository<C>>,
    product_discount_repo: Arc<dyn ProductDiscountRepository<C>>,
    user_discount_tag_repo: Arc<dyn UserDiscountTagRepository<C>>,
}

impl<C: Send + 'static> DiscountService<C> {
    pub fn new(
        discount_repo: Arc<dyn DiscountRepository<C>>,
        product_discount_repo: Arc<dyn ProductDiscountRepository<C>>,
        user_discount_tag_repo: Arc<dyn UserDiscountTagRepository<C>>,
    ) -> Self {
        Self {
            discount_repo,
            product_discount_repo,
            user_discount_tag_repo,
        }
    }

    /// Validates the discount claimed on the single bill item of a one-time
    /// order item. Returns the discount name, or `None` if no discount is claimed.
    #[instrument(
        skip(self, conn, order_item_data),
        fields(
            order_id = %order_item_data.order.order_id,
            product_id = %order_item_data.product_id()
        )
    )]
    pub async fn is_valid_discount_for_one_time_billing(
        &self,
        conn: &mut C,
        order_item_data: &OrderItemData,
    ) -> Result<Option<String>, PricingError> {
        let result = self.validate_one_time(conn, order_item_data).await;
        finish("one_time", result)
    }

    async fn validate_one_time(
        &self,
        conn: &mut C,
        order_item_data: &OrderItemData,
    ) -> Result<Option<String>, PricingError> {
        let product_id = order_item_data.product_id();
        let bill_item = order_item_data.bill_items.first().ok_or_else(|| {
            PricingError::internal(format!("Order item of product {product_id} has no bill item"))
        })?;
        let Some(discount_item) = &bill_item.discount_item else {
            return Ok(None);
        };

        if order_item_data.order_item.discount_id.as_deref() != Some(discount_item.discount_id.as_str()) {
            return Err(inconsistent_discount_id(
                product_id,
                &discount_item.discount_id,
                order_item_data.order_item.discount_id.as_deref().unwrap_or_default(),
            ));
        }

        let discount = self
            .get_discount_and_check_product_discount(conn, order_item_data, &discount_item.discount_id)
            .await?;

        check_discount_info(&discount, discount_item, product_id, Utc::now())?;
        check_discount_amount(&discount, bill_item.price, discount_item, product_id)?;

        Ok(Some(discount.name))
    }

    /// Validates the discount of a recurring order item across its pro-rated
    /// and full-period bill items. Returns the discount name, or `None` when
    /// the order item carries no discount.
    #[instrument(
        skip(self, conn, order_item_data, pro_rated_bill_item, normal_bill_items),
        fields(
            order_id = %order_item_data.order.order_id,
            product_id = %order_item_data.product_id(),
            ratio_numerator = ratio.numerator,
            ratio_denominator = ratio.denominator
        )
    )]
    pub async fn is_valid_discount_for_recurring_billing(
        &self,
        conn: &mut C,
        order_item_data: &OrderItemData,
        pro_rated_bill_item: Option<&BillingItemData>,
        ratio: &BillingRatio,
        normal_bill_items: &[BillingItemData],
    ) -> Result<Option<String>, PricingError> {
        let result = self
            .validate_recurring(conn, order_item_data, pro_rated_bill_item, ratio, normal_bill_items)
            .await;
        finish("recurring", result)
    }

    async fn validate_recurring(
        &self,
        conn: &mut C,
        order_item_data: &OrderItemData,
        pro_rated_bill_item: Option<&BillingItemData>,
        ratio: &BillingRatio,
        normal_bill_items: &[BillingItemData],
    ) -> Result<Option<String>, PricingError> {
        let Some(discount) = self
            .check_recurring_valid_duration(conn, order_item_data)
            .await?
        else {
            return Ok(None);
        };

        let product_id = order_item_data.product_id();
        let now = Utc::now();

        check_normal_bill_items(&discount, normal_bill_items, product_id, now)?;

        if let Some(bill_item) = pro_rated_bill_item {
            check_pro_rating_bill_item(&discount, bill_item, ratio, product_id, now)?;
        }

        Ok(Some(discount.name))
    }

    /// Loads the order item's discount and enforces its recurring cap.
    async fn check_recurring_valid_duration(
        &self,
        conn: &mut C,
        order_item_data: &OrderItemData,
    ) -> Result<Option<Discount>, PricingError> {
        let discounted = order_item_data
            .bill_items
            .iter()
            .filter(|item| item.discount_item.is_some())
            .count();

        let Some(discount_id) = order_item_data.order_item.discount_id.as_deref() else {
            if discounted > 0 {
                return Err(PricingError::failed_precondition(
                    "This bill item should not have a discount because order item does not have a discount id",
                ));
            }
            return Ok(None);
        };

        let discount = self
            .get_discount_and_check_product_discount(conn, order_item_data, discount_id)
            .await?;

        if let Some(duration) = discount.recurring_valid_duration {
            if discounted as i64 > i64::from(duration) {
                return Err(PricingError::failed_precondition_with_detail(
                    "Maximum discount is reached",
                    format!(
                        "discount {} is applied to {} bill items, recurring valid duration is {}",
                        discount.discount_id, discounted, duration
                    ),
                ));
            }
        }

        Ok(Some(discount))
    }

    /// Loads a discount for update and checks it may be used for the product.
    async fn get_discount_and_check_product_discount(
        &self,
        conn: &mut C,
        order_item_data: &OrderItemData,
        discount_id: &str,
    ) -> Result<Discount, PricingError> {
        let product_id = order_item_data.product_id();
        let timer = LOOKUP_DURATION
            .with_label_values(&["discount"])
            .start_timer();
        let discount = self
            .discount_repo
            .get_by_id_for_update(conn, discount_id)
            .await
            .map_err(|err| {
                PricingError::repository(
                    format!("Error when get discount {discount_id} of product {product_id} with error {err}"),
                    err,
                )
            })?;
        timer.observe_duration();

        let associated = match discount.discount_tag_id.as_deref() {
            Some(discount_tag_id) => {
                let student_id = &order_item_data.order.student_id;
                let tag_ids = self
                    .user_discount_tag_repo
                    .get_available_discount_tag_ids_by_user_id(conn, student_id)
                    .await
                    .map_err(|err| {
                        PricingError::repository(
                            format!("Error when get discount tags of student {student_id} with error {err}"),
                            err,
                        )
                    })?;
                tag_ids.iter().any(|id| id == discount_tag_id)
            }
            None => self
                .product_discount_repo
                .get_by_product_id_and_discount_id(conn, product_id, discount_id)
                .await
                .map_err(|err| {
                    PricingError::repository(
                        format!(
                            "Error when get product discount of product {product_id} and discount {discount_id} with error {err}"
                        ),
                        err,
                    )
                })?
                .is_some(),
        };

        if !associated {
            return Err(PricingError::failed_precondition_with_detail(
                format!("Product {product_id} and discount {discount_id} have non-association"),
                match discount.discount_tag_id.as_deref() {
                    Some(tag) => format!(
                        "student {} does not hold discount tag {}",
                        order_item_data.order.student_id, tag
                    ),
                    None => format!("no product discount links product {product_id} to discount {discount_id}"),
                },
            ));
        }

        Ok(discount)
    }

    #[instrument(skip(self, conn), fields(count = discount_ids.len()))]
    pub async fn get_discounts_by_discount_ids(
        &self,
        conn: &mut C,
        discount_ids: &[String],
    ) -> Result<Vec<Discount>, PricingError> {
        self.discount_repo
            .get_by_ids(conn, discount_ids)
            .await
            .map_err(|err| {
                PricingError::repository(
                    format!("Error when get discounts by ids {discount_ids:?} with error {err}"),
                    err,
                )
            })
    }

    /// Decides which discount, if any, carries over to the next cycle.
    ///
    /// `bill_items` are the historical bill items of the order item, oldest
    /// first. `None` means the next cycle is billed without a discount.
    #[instrument(skip(self, conn, bill_items), fields(count = bill_items.len()))]
    pub async fn verify_discount_for_generate_upcoming_bill_item(
        &self,
        conn: &mut C,
        bill_items: &[BillItem],
    ) -> Result<Option<Discount>, PricingError> {
        let Some(latest) = bill_items.last() else {
            return Ok(None);
        };
        let Some(discount_id) = latest.discount_id.as_deref() else {
            return Ok(None);
        };

        let discount = self
            .discount_repo
            .get_by_id_for_update(conn, discount_id)
            .await
            .map_err(|err| {
                PricingError::repository(
                    format!(
                        "Error when get discount {discount_id} of product {} with error {err}",
                        latest.product_id
                    ),
                    err,
                )
            })?;

        let applied = bill_items
            .iter()
            .filter(|item| item.discount_id.as_deref() == Some(discount_id))
            .count();
        if let Some(duration) = discount.recurring_valid_duration {
            if applied as i64 >= i64::from(duration) {
                debug!(discount_id, applied, duration, "Recurring discount cap reached");
                return Ok(None);
            }
        }

        if !discount.is_available_at(Utc::now()) {
            debug!(discount_id, "Discount is no longer available");
            return Ok(None);
        }

        if let Some(discount_tag_id) = discount.discount_tag_id.as_deref() {
            let tags = self
                .user_discount_tag_repo
                .get_discount_tag_by_user_id_and_discount_tag_id(conn, &latest.student_id, discount_tag_id)
                .await
                .map_err(|err| {
                    PricingError::repository(
                        format!(
                            "Error when get discount tag {discount_tag_id} of student {} with error {err}",
                            latest.student_id
                        ),
                        err,
                    )
                })?;
            if tags.is_empty() {
                debug!(discount_id, discount_tag_id, "Student no longer holds discount tag");
                return Ok(None);
            }
        }

        Ok(Some(discount))
    }
}

impl<C: Send + 'static> DiscountPriceCalculator for DiscountService<C> {
    fn calculate_discount_price(
        &self,
        discount: &Discount,
        price: f32,
        bill_item: &mut BillItem,
    ) -> Result<f32, PricingError> {
        calculate_discount_price(discount, price, bill_item)
    }
}

/// Discounts `price` and stamps the discount onto `bill_item`.
pub fn calculate_discount_price(
    discount: &Discount,
    price: f32,
    bill_item: &mut BillItem,
) -> Result<f32, PricingError> {
    let discount_amount = discount_amount_for(
        price,
        Some(discount.discount_amount_type),
        decimal_to_f32(discount.discount_amount_value),
    );
    let stamped_amount = f32_to_decimal(discount_amount).ok_or_else(|| {
        PricingError::internal(format!(
            "err occurred while assigning discount {} into order {} and product {}: discount amount {} is not a decimal",
            discount.discount_id, bill_item.order_id, bill_item.product_id, discount_amount
        ))
    })?;

    bill_item.discount_id = Some(discount.discount_id.clone());
    bill_item.discount_amount_type = Some(discount.discount_amount_type);
    bill_item.discount_amount_value = Some(discount.discount_amount_value);
    bill_item.discount_amount = Some(stamped_amount);
    bill_item.raw_discount_amount = Some(stamped_amount);

    Ok(price - discount_amount)
}

fn finish<T>(operation: &'static str, result: Result<T, PricingError>) -> Result<T, PricingError> {
    record_discount_validation(operation, outcome_label(&result));
    if let Err(err) = &result {
        warn!(error = %err, debug_detail = ?err.debug_detail(), "Discount rejected");
    }
    result
}

fn inconsistent_discount_id(product_id: &str, claimed: &str, expected: &str) -> PricingError {
    PricingError::failed_precondition_with_detail(
        format!("Inconsistent discount id of product {product_id}"),
        format!("bill item discount id {claimed} vs discount id {expected}"),
    )
}

fn check_discount_id(
    discount: &Discount,
    discount_item: &DiscountBillItem,
    product_id: &str,
) -> Result<(), PricingError> {
    if discount_item.discount_id != discount.discount_id {
        return Err(inconsistent_discount_id(
            product_id,
            &discount_item.discount_id,
            &discount.discount_id,
        ));
    }
    Ok(())
}

/// Availability window and drift between the claim and the persisted discount.
fn check_discount_info(
    discount: &Discount,
    discount_item: &DiscountBillItem,
    product_id: &str,
    now: DateTime<Utc>,
) -> Result<(), PricingError> {
    if !discount.is_available_at(now) {
        return Err(PricingError::failed_precondition_with_detail(
            format!("Discount {} is not available", discount.discount_id),
            format!(
                "available from {} until {}, checked at {}",
                discount.available_from, discount.available_until, now
            ),
        ));
    }

    if discount_item.discount_type != discount.discount_type {
        return Err(PricingError::failed_precondition(format!(
            "Product with id {} change discount type from {} to {}",
            product_id, discount_item.discount_type, discount.discount_type
        )));
    }

    if discount_item.discount_amount_type != discount.discount_amount_type {
        return Err(PricingError::failed_precondition(format!(
            "Product with id {} change discount amount type from {} to {}",
            product_id, discount_item.discount_amount_type, discount.discount_amount_type
        )));
    }

    if !is_equal_decimal_and_f32(discount.discount_amount_value, discount_item.discount_amount_value) {
        return Err(PricingError::failed_precondition(format!(
            "Product with id {} change discount amount value from {} to {}",
            product_id, discount_item.discount_amount_value, discount.discount_amount_value
        )));
    }

    Ok(())
}

fn discount_amount_mismatch(product_id: &str, claimed: f32, expected: f32) -> PricingError {
    PricingError::failed_precondition_with_detail(
        format!("Discount amount of product {product_id} is not equal to the expected discount amount"),
        format!("discount amount (actual, expected) = ({claimed}, {expected})"),
    )
}

/// Full-period amount check.
fn check_discount_amount(
    discount: &Discount,
    price: f32,
    discount_item: &DiscountBillItem,
    product_id: &str,
) -> Result<(), PricingError> {
    let expected = discount_amount_for(
        price,
        Some(discount.discount_amount_type),
        decimal_to_f32(discount.discount_amount_value),
    );
    if !compare_amount_value(discount_item.discount_amount, expected) {
        return Err(discount_amount_mismatch(product_id, discount_item.discount_amount, expected));
    }
    Ok(())
}

/// Amount check for a pro-rated bill item, whose price is already pro-rated.
///
/// Percentage discounts apply to that price as is; fixed amounts are scaled by
/// the ratio.
fn check_pro_rating_discount_amount(
    discount: &Discount,
    price: f32,
    discount_item: &DiscountBillItem,
    ratio: &BillingRatio,
    product_id: &str,
) -> Result<(), PricingError> {
    let value = decimal_to_f32(discount.discount_amount_value);
    let expected = if ratio.is_zero() {
        0.0
    } else {
        match discount.discount_amount_type {
            DiscountAmountType::Percentage => price * value / 100.0,
            DiscountAmountType::FixedAmount => ratio.apply(value),
        }
    };
    if !compare_amount_value(discount_item.discount_amount, expected) {
        return Err(discount_amount_mismatch(product_id, discount_item.discount_amount, expected));
    }
    Ok(())
}

fn check_normal_bill_items(
    discount: &Discount,
    bill_items: &[BillingItemData],
    product_id: &str,
    now: DateTime<Utc>,
) -> Result<(), PricingError> {
    for bill_item in bill_items {
        let Some(discount_item) = &bill_item.discount_item else {
            continue;
        };
        check_discount_id(discount, discount_item, product_id)?;
        check_discount_info(discount, discount_item, product_id, now)?;
        check_discount_amount(discount, bill_item.price, discount_item, product_id)?;
    }
    Ok(())
}

fn check_pro_rating_bill_item(
    discount: &Discount,
    bill_item: &BillingItemData,
    ratio: &BillingRatio,
    product_id: &str,
    now: DateTime<Utc>,
) -> Result<(), PricingError> {
    let Some(discount_item) = &bill_item.discount_item else {
        return Ok(());
    };
    check_discount_id(discount, discount_item, product_id)?;
    check_discount_info(discount, discount_item, product_id, now)?;
    check_pro_rating_discount_amount(discount, bill_item.price, discount_item, ratio, product_id)
}

//! Price reconciliation for one-time and recurring billing.
//!
//! Claimed bill item amounts are checked against the canonical product price,
//! pro-rated by the billing ratio where the period is only partly owed. Update
//! and cancel flows also check the adjustment against the previously billed
//! item of the same billing schedule period.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::error::PricingError;
use crate::models::{
    BillItem, BillingItemData, BillingItemDescription, BillingRatio, BillingSchedulePeriod,
    Discount, OrderItemData, PriceType, ProductPrice, ProductType, Tax, UpcomingBillItem,
};

use super::amount::{
    compare_amount_value, decimal_to_f32, discount_amount_for, f32_to_decimal,
    is_equal_decimal_and_f32,
};
use super::discount::DiscountPriceCalculator;
use super::metrics::{
    outcome_label, record_bill_item_generated, record_price_validation, LOOKUP_DURATION,
};
use super::repository::ProductPriceRepository;
use super::tax::TaxPriceCalculator;

pub struct PriceService<C> {
    product_price_repo: Arc<dyn ProductPriceRepository<C>>,
    discount_calculator: Arc<dyn DiscountPriceCalculator>,
    tax_calculator: Arc<dyn TaxPriceCalculator>,
}

impl<C: Send + 'static> PriceService<C> {
    pub fn new(
        product_price_repo: Arc<dyn ProductPriceRepository<C>>,
        discount_calculator: Arc<dyn DiscountPriceCalculator>,
        tax_calculator: Arc<dyn TaxPriceCalculator>,
    ) -> Self {
        Self {
            product_price_repo,
            discount_calculator,
            tax_calculator,
        }
    }

    #[instrument(
        skip(self, conn, order_item_data),
        fields(
            order_id = %order_item_data.order.order_id,
            product_id = %order_item_data.product_id()
        )
    )]
    pub async fn is_valid_price_for_one_time_billing(
        &self,
        conn: &mut C,
        order_item_data: &OrderItemData,
    ) -> Result<(), PricingError> {
        let result = self.validate_one_time(conn, order_item_data).await;
        finish("one_time", result)
    }

    async fn validate_one_time(
        &self,
        conn: &mut C,
        order_item_data: &OrderItemData,
    ) -> Result<(), PricingError> {
        let bill_item = first_bill_item(order_item_data)?;
        if order_item_data.is_package() {
            self.validate_price_for_one_time_quantity_product(conn, order_item_data, bill_item)
                .await
        } else {
            self.validate_price_for_one_time_non_quantity_product(conn, order_item_data, bill_item)
                .await
        }
    }

    /// Accepts the claim when any price row of the product matches it.
    pub async fn validate_price_for_one_time_non_quantity_product(
        &self,
        conn: &mut C,
        order_item_data: &OrderItemData,
        bill_item: &BillingItemData,
    ) -> Result<(), PricingError> {
        let product_id = order_item_data.product_id();
        let timer = LOOKUP_DURATION
            .with_label_values(&["product_prices"])
            .start_timer();
        let product_prices = self
            .product_price_repo
            .get_by_product_id_and_price_type(conn, product_id, order_item_data.price_type)
            .await
            .map_err(|err| {
                PricingError::repository(
                    format!("Error when getting product price of product {product_id} with error {err}"),
                    err,
                )
            })?;
        timer.observe_duration();

        let matched = product_prices
            .iter()
            .any(|product_price| is_equal_decimal_and_f32(product_price.price, bill_item.price));
        if !matched {
            return Err(PricingError::failed_precondition_with_detail(
                format!("Price of product {product_id} does not exist or was just updated"),
                format!(
                    "Price of product with id {} does not exist in system (or just updated): claimed price {}",
                    product_id, bill_item.price
                ),
            ));
        }

        validate_final_price(bill_item, product_id)
    }

    /// Checks the claim against the price row of the ordered quantity.
    pub async fn validate_price_for_one_time_quantity_product(
        &self,
        conn: &mut C,
        order_item_data: &OrderItemData,
        bill_item: &BillingItemData,
    ) -> Result<(), PricingError> {
        let product_id = order_item_data.product_id();
        let quantity = check_quantity_of_order_item_and_bill_item(order_item_data, bill_item)?;
        let package_id = &order_item_data.package_info.package.package_id;

        let timer = LOOKUP_DURATION
            .with_label_values(&["product_price"])
            .start_timer();
        let product_price = self
            .product_price_repo
            .get_by_product_id_and_quantity_and_price_type(
                conn,
                package_id,
                quantity,
                order_item_data.price_type,
            )
            .await
            .map_err(|err| {
                PricingError::repository(
                    format!("Error when getting product price of product {product_id} with error {err}"),
                    err,
                )
            })?;
        timer.observe_duration();

        if !is_equal_decimal_and_f32(product_price.price, bill_item.price) {
            return Err(PricingError::failed_precondition_with_detail(
                format!("Price of product {product_id} does not exist or was just updated"),
                format!(
                    "Price of package with id {} and quantity {} does not exist in system (or just updated): claimed price {} vs price {}",
                    package_id, quantity, bill_item.price, product_price.price
                ),
            ));
        }

        validate_final_price(bill_item, product_id)
    }

    /// One-time billing has no pro-rating, so the full ratio is used.
    #[instrument(
        skip(self, old_bill_item, order_item_data),
        fields(
            order_id = %order_item_data.order.order_id,
            product_id = %order_item_data.product_id()
        )
    )]
    pub fn is_valid_adjustment_price_for_one_time_billing(
        &self,
        old_bill_item: &BillItem,
        order_item_data: &OrderItemData,
    ) -> Result<(), PricingError> {
        let result = first_bill_item(order_item_data).and_then(|bill_item| {
            validate_adjustment_price(bill_item, old_bill_item, &BillingRatio::FULL)
        });
        finish("one_time_adjustment", result)
    }

    /// Checks a new recurring order item. Returns the price row of the
    /// pro-rated period when there is one.
    #[instrument(
        skip(self, conn, order_item_data, pro_rated_bill_item, normal_bill_items),
        fields(
            order_id = %order_item_data.order.order_id,
            product_id = %order_item_data.product_id(),
            ratio_numerator = ratio.numerator,
            ratio_denominator = ratio.denominator
        )
    )]
    pub async fn is_valid_price_for_recurring_billing(
        &self,
        conn: &mut C,
        order_item_data: &OrderItemData,
        pro_rated_bill_item: Option<&BillingItemData>,
        ratio: &BillingRatio,
        normal_bill_items: &[BillingItemData],
    ) -> Result<Option<ProductPrice>, PricingError> {
        let result = self
            .validate_recurring(
                conn,
                order_item_data,
                pro_rated_bill_item,
                ratio,
                normal_bill_items,
                None,
            )
            .await;
        finish("recurring", result)
    }

    /// Same checks as [`Self::is_valid_price_for_recurring_billing`], plus the
    /// adjustment of every bill item against `old_bill_items`, keyed by
    /// billing schedule period id. A period without a previous bill item is
    /// treated as having billed nothing.
    #[instrument(
        skip(self, conn, order_item_data, pro_rated_bill_item, normal_bill_items, old_bill_items),
        fields(
            order_id = %order_item_data.order.order_id,
            product_id = %order_item_data.product_id(),
            ratio_numerator = ratio.numerator,
            ratio_denominator = ratio.denominator
        )
    )]
    pub async fn is_valid_price_for_update_recurring_billing(
        &self,
        conn: &mut C,
        order_item_data: &OrderItemData,
        pro_rated_bill_item: Option<&BillingItemData>,
        ratio: &BillingRatio,
        normal_bill_items: &[BillingItemData],
        old_bill_items: &HashMap<String, BillItem>,
    ) -> Result<Option<ProductPrice>, PricingError> {
        let result = self
            .validate_recurring(
                conn,
                order_item_data,
                pro_rated_bill_item,
                ratio,
                normal_bill_items,
                Some(old_bill_items),
            )
            .await;
        finish("update_recurring", result)
    }

    async fn validate_recurring(
        &self,
        conn: &mut C,
        order_item_data: &OrderItemData,
        pro_rated_bill_item: Option<&BillingItemData>,
        ratio: &BillingRatio,
        normal_bill_items: &[BillingItemData],
        old_bill_items: Option<&HashMap<String, BillItem>>,
    ) -> Result<Option<ProductPrice>, PricingError> {
        let nothing_billed = BillItem::default();
        let mut pro_rated_price = None;

        if let Some(bill_item) = pro_rated_bill_item {
            let product_price = self.get_period_price(conn, order_item_data, bill_item).await?;
            check_price_for_pro_rating_bill_item(&product_price, bill_item, ratio)?;
            if let Some(old_bill_items) = old_bill_items {
                let old_bill_item =
                    previous_bill_item(order_item_data, bill_item, old_bill_items, &nothing_billed)?;
                validate_adjustment_price(bill_item, old_bill_item, ratio)?;
            }
            pro_rated_price = Some(product_price);
        }

        for bill_item in normal_bill_items {
            let product_price = self.get_period_price(conn, order_item_data, bill_item).await?;
            check_price_for_normal_bill_item(&product_price, bill_item)?;
            if let Some(old_bill_items) = old_bill_items {
                let old_bill_item =
                    previous_bill_item(order_item_data, bill_item, old_bill_items, &nothing_billed)?;
                validate_adjustment_price(bill_item, old_bill_item, &BillingRatio::FULL)?;
            }
        }

        Ok(pro_rated_price)
    }

    /// Checks the refund adjustments of a cancelled recurring order item.
    ///
    /// With pro-rating disabled, the period containing the effective date is
    /// billed in full and must carry a zero adjustment.
    #[instrument(
        skip(self, order_item_data, pro_rated_bill_item, normal_bill_items, old_bill_items, periods),
        fields(
            order_id = %order_item_data.order.order_id,
            product_id = %order_item_data.product_id(),
            ratio_numerator = ratio.numerator,
            ratio_denominator = ratio.denominator
        )
    )]
    pub fn is_valid_price_for_cancel_recurring_billing(
        &self,
        order_item_data: &OrderItemData,
        pro_rated_bill_item: Option<&BillingItemData>,
        ratio: &BillingRatio,
        normal_bill_items: &[BillingItemData],
        old_bill_items: &HashMap<String, BillItem>,
        periods: &HashMap<String, BillingSchedulePeriod>,
    ) -> Result<(), PricingError> {
        let result = validate_cancel_recurring_billing(
            order_item_data,
            pro_rated_bill_item,
            ratio,
            normal_bill_items,
            old_bill_items,
            periods,
        );
        finish("cancel_recurring", result)
    }

    /// Prices an upcoming bill item and stamps price, final price and product
    /// pricing onto `bill_item`. The discount is applied before the tax.
    #[allow(clippy::too_many_arguments)]
    #[instrument(
        skip(self, conn, bill_item, upcoming_bill_item, tax, discount, description, period),
        fields(
            order_id = %upcoming_bill_item.order_id,
            product_id = %upcoming_bill_item.product_id,
            billing_schedule_period_id = %period.billing_schedule_period_id
        )
    )]
    pub async fn calculate_bill_item_price(
        &self,
        conn: &mut C,
        bill_item: &mut BillItem,
        upcoming_bill_item: &UpcomingBillItem,
        tax: Option<&Tax>,
        discount: Option<&Discount>,
        price_type: PriceType,
        description: &BillingItemDescription,
        period: &BillingSchedulePeriod,
    ) -> Result<(), PricingError> {
        let order_id = &upcoming_bill_item.order_id;
        let product_id = &upcoming_bill_item.product_id;
        let period_id = &period.billing_schedule_period_id;

        let quantity = if description.product_type == ProductType::Package {
            let owed = description.owed_quantity().ok_or_else(|| {
                PricingError::internal(format!(
                    "owed quantity of package in orderID {order_id} and productID {product_id} overflows"
                ))
            })?;
            Some(owed)
        } else {
            None
        };
        let timer = LOOKUP_DURATION
            .with_label_values(&["product_price"])
            .start_timer();
        let lookup = match quantity {
            Some(quantity) => {
                self.product_price_repo
                    .get_by_product_id_and_billing_schedule_period_id_and_quantity_and_price_type(
                        conn, product_id, period_id, quantity, price_type,
                    )
                    .await
            }
            None => {
                self.product_price_repo
                    .get_by_product_id_and_billing_schedule_period_id_and_price_type(
                        conn, product_id, period_id, price_type,
                    )
                    .await
            }
        };
        let product_price = lookup.map_err(|err| {
            PricingError::repository(
                format!(
                    "error when get product price of product ID {}, product type {}, billing schedule period ID {}, price type {}, quantity {}, with error {}",
                    product_id,
                    description.product_type,
                    period_id,
                    price_type,
                    quantity.unwrap_or_default(),
                    err
                ),
                err,
            )
        })?;
        timer.observe_duration();

        let price = decimal_to_f32(product_price.price);
        let mut final_price = price;

        if let Some(discount) = discount {
            final_price = self
                .discount_calculator
                .calculate_discount_price(discount, final_price, bill_item)
                .map_err(|err| {
                    err.wrap(format!(
                        "error while calculate discount id {} in order id {}",
                        discount.discount_id, order_id
                    ))
                })?;
        }

        if let Some(tax) = tax {
            final_price = self
                .tax_calculator
                .calculate_tax_price(tax, final_price, bill_item)
                .map_err(|err| {
                    err.wrap(format!(
                        "error while calculate tax id {} in order id {}",
                        tax.tax_id, order_id
                    ))
                })?;
        }

        let stamped_final_price = f32_to_decimal(final_price).ok_or_else(|| {
            PricingError::internal(format!(
                "err occurred while assigning final price into orderID {order_id} and productID {product_id} : final price {final_price} is not a decimal"
            ))
        })?;

        bill_item.price = product_price.price;
        bill_item.final_price = stamped_final_price;
        bill_item.product_pricing = Some(product_price.price);

        record_bill_item_generated(description.product_type.as_str());
        debug!(price, final_price, "Priced upcoming bill item");
        Ok(())
    }

    #[instrument(skip(self, conn))]
    pub async fn get_product_prices_by_product_id_and_price_type(
        &self,
        conn: &mut C,
        product_id: &str,
        price_type: PriceType,
    ) -> Result<Vec<ProductPrice>, PricingError> {
        self.product_price_repo
            .get_by_product_id_and_price_type(conn, product_id, price_type)
            .await
            .map_err(|err| {
                PricingError::repository(
                    format!(
                        "Error when getting product prices of product {product_id} and price type {price_type} with error {err}"
                    ),
                    err,
                )
            })
    }

    /// Price row of the bill item's billing schedule period.
    async fn get_period_price(
        &self,
        conn: &mut C,
        order_item_data: &OrderItemData,
        bill_item: &BillingItemData,
    ) -> Result<ProductPrice, PricingError> {
        let product_id = order_item_data.product_id();
        let period_id = billing_schedule_period_id(order_item_data, bill_item)?;
        let price_type = order_item_data.price_type;

        let timer = LOOKUP_DURATION
            .with_label_values(&["product_price"])
            .start_timer();
        let lookup = if order_item_data.is_package() {
            let quantity = check_quantity_of_order_item_and_bill_item(order_item_data, bill_item)?;
            self.product_price_repo
                .get_by_product_id_and_billing_schedule_period_id_and_quantity_and_price_type(
                    conn, product_id, period_id, quantity, price_type,
                )
                .await
        } else {
            self.product_price_repo
                .get_by_product_id_and_billing_schedule_period_id_and_price_type(
                    conn, product_id, period_id, price_type,
                )
                .await
        };
        timer.observe_duration();

        lookup.map_err(|err| {
            PricingError::repository(
                format!(
                    "Error when getting product price of product {product_id} and billing schedule period {period_id} with error {err}"
                ),
                err,
            )
        })
    }
}

fn finish<T>(operation: &'static str, result: Result<T, PricingError>) -> Result<T, PricingError> {
    record_price_validation(operation, outcome_label(&result));
    if let Err(err) = &result {
        warn!(error = %err, debug_detail = ?err.debug_detail(), "Price rejected");
    }
    result
}

fn first_bill_item(order_item_data: &OrderItemData) -> Result<&BillingItemData, PricingError> {
    order_item_data.bill_items.first().ok_or_else(|| {
        PricingError::internal(format!(
            "Order item of product {} has no bill item",
            order_item_data.product_id()
        ))
    })
}

fn billing_schedule_period_id<'a>(
    order_item_data: &OrderItemData,
    bill_item: &'a BillingItemData,
) -> Result<&'a str, PricingError> {
    bill_item.billing_schedule_period_id.as_deref().ok_or_else(|| {
        PricingError::internal(format!(
            "Bill item of product {} has no billing schedule period id",
            order_item_data.product_id()
        ))
    })
}

/// Bill item previously billed for the same period, or `nothing_billed`.
fn previous_bill_item<'a>(
    order_item_data: &OrderItemData,
    bill_item: &BillingItemData,
    old_bill_items: &'a HashMap<String, BillItem>,
    nothing_billed: &'a BillItem,
) -> Result<&'a BillItem, PricingError> {
    let period_id = billing_schedule_period_id(order_item_data, bill_item)?;
    Ok(old_bill_items.get(period_id).unwrap_or(nothing_billed))
}

/// Returns the ordered quantity once the bill item agrees with it.
fn check_quantity_of_order_item_and_bill_item(
    order_item_data: &OrderItemData,
    bill_item: &BillingItemData,
) -> Result<i32, PricingError> {
    let product_id = order_item_data.product_id();
    let Some(quantity) = bill_item.quantity else {
        return Err(PricingError::internal(format!(
            "Error when getting product price of product {product_id} with empty quantity"
        )));
    };
    let ordered = order_item_data.package_info.quantity;
    if quantity != ordered {
        return Err(PricingError::internal(format!(
            "inconsistency quantity between order item and bill item of product {product_id}, order item quantity {ordered} vs bill item quantity {quantity}"
        )));
    }
    Ok(quantity)
}

/// `final_price == price - discount_amount`.
fn validate_final_price(bill_item: &BillingItemData, product_id: &str) -> Result<(), PricingError> {
    let expected = bill_item.price - bill_item.discount_amount();
    if !compare_amount_value(bill_item.final_price, expected) {
        return Err(PricingError::failed_precondition_with_detail(
            format!("Incorrect final price of product {product_id}"),
            format!(
                "Incorrect final price of product {} actual = {} vs expect = {}",
                product_id, bill_item.final_price, expected
            ),
        ));
    }
    Ok(())
}

fn check_price_for_normal_bill_item(
    product_price: &ProductPrice,
    bill_item: &BillingItemData,
) -> Result<(), PricingError> {
    let product_id = &product_price.product_id;
    if !is_equal_decimal_and_f32(product_price.price, bill_item.price) {
        return Err(PricingError::failed_precondition_with_detail(
            format!("Incorrect product price of product {product_id}"),
            format!(
                "Incorrect product price of product {} actual = {} vs expect = {}",
                product_id, bill_item.price, product_price.price
            ),
        ));
    }
    validate_final_price(bill_item, product_id)
}

/// The pro-rated price must equal the claim exactly; unlike the full-period
/// check there is no tolerance. A full ratio takes the full-period check.
fn check_price_for_pro_rating_bill_item(
    product_price: &ProductPrice,
    bill_item: &BillingItemData,
    ratio: &BillingRatio,
) -> Result<(), PricingError> {
    if ratio.is_full() {
        return check_price_for_normal_bill_item(product_price, bill_item);
    }

    let product_id = &product_price.product_id;
    let price_after_ratio = ratio.apply(decimal_to_f32(product_price.price));
    #[allow(clippy::float_cmp)]
    let matches = price_after_ratio == bill_item.price;
    if !matches {
        return Err(PricingError::failed_precondition_with_detail(
            format!("Incorrect pro-rating price of product {product_id}"),
            format!(
                "Incorrect pro-rating price of product {} actual = {} vs expect = {}",
                product_id, bill_item.price, price_after_ratio
            ),
        ));
    }
    validate_final_price(bill_item, product_id)
}

/// Price of the previous bill item without its own discount.
fn original_price_of_old_bill_item(old_bill_item: &BillItem) -> f32 {
    let old_price = decimal_to_f32(old_bill_item.price);
    if old_bill_item.discount_amount.is_none() {
        return old_price;
    }
    old_price
        - discount_amount_for(
            old_price,
            old_bill_item.discount_amount_type,
            old_bill_item
                .discount_amount_value
                .map(decimal_to_f32)
                .unwrap_or_default(),
        )
}

/// Checks the adjustment of an updated bill item.
///
/// The claimed price is already pro-rated, so it is scaled back to the full
/// period before its discount is taken off; the difference to the previous
/// item is then pro-rated again.
pub fn validate_adjustment_price(
    bill_item: &BillingItemData,
    old_bill_item: &BillItem,
    ratio: &BillingRatio,
) -> Result<(), PricingError> {
    let product_id = &bill_item.product_id;
    let Some(adjustment_price) = bill_item.adjustment_price else {
        return Err(PricingError::failed_precondition(format!(
            "Missing adjustment price when updating order of product {product_id}"
        )));
    };

    let old_original_price = original_price_of_old_bill_item(old_bill_item);
    let expected = if ratio.is_zero() {
        0.0
    } else {
        let mut new_original_price = ratio.invert(bill_item.price);
        if let Some(discount_item) = &bill_item.discount_item {
            new_original_price -= discount_amount_for(
                new_original_price,
                Some(discount_item.discount_amount_type),
                discount_item.discount_amount_value,
            );
        }
        ratio.apply(new_original_price - old_original_price)
    };

    if !compare_amount_value(adjustment_price, expected) {
        return Err(PricingError::failed_precondition_with_detail(
            format!("Incorrect adjustment price for update of product {product_id}"),
            format!(
                "Incorrect adjustment price for update of product {} actual = {} vs expect = {}",
                product_id, adjustment_price, expected
            ),
        ));
    }
    Ok(())
}

/// Checks the refund adjustment of a cancelled bill item: the previously
/// billed original price, negated and pro-rated.
pub fn validate_adjustment_price_for_cancel_order(
    bill_item: &BillingItemData,
    old_bill_item: &BillItem,
    ratio: &BillingRatio,
) -> Result<(), PricingError> {
    let product_id = &bill_item.product_id;
    let Some(adjustment_price) = bill_item.adjustment_price else {
        return Err(PricingError::failed_precondition(format!(
            "Missing adjustment price when cancelling order of product {product_id}"
        )));
    };

    let expected = -ratio.apply(original_price_of_old_bill_item(old_bill_item));
    if !compare_amount_value(adjustment_price, expected) {
        return Err(PricingError::failed_precondition_with_detail(
            format!("Incorrect adjustment price for cancel of product {product_id}"),
            format!(
                "Incorrect adjustment price for cancel of product {} actual = {} vs expect = {}",
                product_id, adjustment_price, expected
            ),
        ));
    }
    Ok(())
}

fn validate_cancel_recurring_billing(
    order_item_data: &OrderItemData,
    pro_rated_bill_item: Option<&BillingItemData>,
    ratio: &BillingRatio,
    normal_bill_items: &[BillingItemData],
    old_bill_items: &HashMap<String, BillItem>,
    periods: &HashMap<String, BillingSchedulePeriod>,
) -> Result<(), PricingError> {
    let product_id = order_item_data.product_id();
    let nothing_billed = BillItem::default();

    if let Some(bill_item) = pro_rated_bill_item {
        let old_bill_item =
            previous_bill_item(order_item_data, bill_item, old_bill_items, &nothing_billed)?;
        validate_adjustment_price_for_cancel_order(bill_item, old_bill_item, ratio)
            .map_err(|err| err.wrap(format!("error in pro-rated bill item of product {product_id}")))?;
    }

    for bill_item in normal_bill_items {
        let period_id = billing_schedule_period_id(order_item_data, bill_item)?;

        let effective_period = periods.get(period_id).filter(|period| {
            order_item_data.is_disable_pro_rating_flag
                && order_item_data
                    .order_item
                    .effective_date
                    .is_some_and(|effective| {
                        effective > period.start_date && effective <= period.end_date
                    })
        });

        if let Some(period) = effective_period {
            let Some(adjustment_price) = bill_item.adjustment_price else {
                return Err(PricingError::failed_precondition(format!(
                    "Missing adjustment price when cancelling order of product {}",
                    bill_item.product_id
                )));
            };
            #[allow(clippy::float_cmp)]
            let billed_in_full = adjustment_price == 0.0;
            if !billed_in_full {
                return Err(PricingError::failed_precondition_with_detail(
                    format!("adjustment price of billing schedule period {period_id} should be 0"),
                    format!(
                        "start date {}, end date {}, effective date {}, adjustment price {}",
                        period.start_date,
                        period.end_date,
                        order_item_data
                            .order_item
                            .effective_date
                            .map(|date| date.to_rfc3339())
                            .unwrap_or_default(),
                        adjustment_price
                    ),
                ));
            }
            continue;
        }

        let old_bill_item = old_bill_items.get(period_id).unwrap_or(&nothing_billed);
        validate_adjustment_price_for_cancel_order(bill_item, old_bill_item, &BillingRatio::FULL)
            .map_err(|err| {
                err.wrap(format!(
                    "error in normal bill item of product {product_id} period id {period_id}"
                ))
            })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::{DiscountAmountType, DiscountBillItem, DiscountType};
    use rust_decimal::Decimal;

    fn product_price(price: i64) -> ProductPrice {
        ProductPrice {
            product_id: "product-1".to_string(),
            billing_schedule_period_id: Some("period-1".to_string()),
            quantity: None,
            price: Decimal::from(price),
            price_type: PriceType::Default,
        }
    }

    fn claim(price: f32, final_price: f32) -> BillingItemData {
        BillingItemData {
            product_id: "product-1".to_string(),
            billing_schedule_period_id: Some("period-1".to_string()),
            price,
            final_price,
            ..Default::default()
        }
    }

    fn percentage(value: f32, amount: f32) -> DiscountBillItem {
        DiscountBillItem {
            discount_id: "discount-1".to_string(),
            discount_type: DiscountType::Regular,
            discount_amount_type: DiscountAmountType::Percentage,
            discount_amount_value: value,
            discount_amount: amount,
        }
    }

    fn old_bill_item(price: i64) -> BillItem {
        BillItem {
            price: Decimal::from(price),
            final_price: Decimal::from(price),
            ..Default::default()
        }
    }

    #[test]
    fn test_final_price_must_subtract_discount() {
        let mut bill_item = claim(100.0, 80.0);
        bill_item.discount_item = Some(percentage(20.0, 20.0));
        assert!(validate_final_price(&bill_item, "product-1").is_ok());

        bill_item.final_price = 90.0;
        let err = validate_final_price(&bill_item, "product-1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FailedPrecondition);
        assert_eq!(
            err.debug_detail(),
            Some("Incorrect final price of product product-1 actual = 90 vs expect = 80")
        );
    }

    #[test]
    fn test_normal_bill_item_price_mismatch() {
        let err = check_price_for_normal_bill_item(&product_price(100), &claim(90.0, 90.0)).unwrap_err();
        assert_eq!(err.message(), "Incorrect product price of product product-1");
        assert!(check_price_for_normal_bill_item(&product_price(100), &claim(100.0, 100.0)).is_ok());
    }

    #[test]
    fn test_pro_rating_price_is_scaled() {
        let ratio = BillingRatio::new(3, 4);
        assert!(check_price_for_pro_rating_bill_item(&product_price(100), &claim(75.0, 75.0), &ratio).is_ok());
        let err = check_price_for_pro_rating_bill_item(&product_price(100), &claim(100.0, 100.0), &ratio)
            .unwrap_err();
        assert!(err.debug_detail().unwrap().contains("actual = 100 vs expect = 75"));
    }

    #[test]
    fn test_pro_rating_price_has_no_tolerance() {
        // 100 * 1 / 3 in f32 is 33.333332; a claim off by a thousandth is
        // accepted for full periods but not for pro-rated ones.
        let ratio = BillingRatio::new(1, 3);
        let exact = 100.0_f32 * 1.0 / 3.0;
        assert!(check_price_for_pro_rating_bill_item(&product_price(100), &claim(exact, exact), &ratio).is_ok());
        let close = exact + 0.001;
        assert!(compare_amount_value(close, exact));
        assert!(check_price_for_pro_rating_bill_item(&product_price(100), &claim(close, close), &ratio).is_err());
    }

    #[test]
    fn test_full_ratio_matches_normal_check() {
        for ratio in [BillingRatio::new(1, 1), BillingRatio::new(4, 4)] {
            for claimed in [100.0_f32, 100.004, 99.0] {
                let normal = check_price_for_normal_bill_item(&product_price(100), &claim(claimed, claimed));
                let pro_rated =
                    check_price_for_pro_rating_bill_item(&product_price(100), &claim(claimed, claimed), &ratio);
                assert_eq!(normal.is_ok(), pro_rated.is_ok());
            }
        }
    }

    #[test]
    fn test_zero_ratio_pro_rated_price_is_zero() {
        let ratio = BillingRatio::new(0, 0);
        assert!(check_price_for_pro_rating_bill_item(&product_price(100), &claim(0.0, 0.0), &ratio).is_ok());
    }

    #[test]
    fn test_adjustment_requires_adjustment_price() {
        let err = validate_adjustment_price(&claim(16.0, 16.0), &old_bill_item(10), &BillingRatio::FULL)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FailedPrecondition);
        assert_eq!(
            err.message(),
            "Missing adjustment price when updating order of product product-1"
        );
    }

    #[test]
    fn test_adjustment_for_price_increase() {
        let mut bill_item = claim(16.0, 16.0);
        bill_item.adjustment_price = Some(6.0);
        assert!(validate_adjustment_price(&bill_item, &old_bill_item(10), &BillingRatio::FULL).is_ok());

        bill_item.adjustment_price = Some(5.0);
        let err = validate_adjustment_price(&bill_item, &old_bill_item(10), &BillingRatio::FULL)
            .unwrap_err();
        assert_eq!(
            err.debug_detail(),
            Some("Incorrect adjustment price for update of product product-1 actual = 5 vs expect = 6")
        );
    }

    #[test]
    fn test_adjustment_subtracts_old_percentage_discount() {
        let mut old = old_bill_item(10);
        old.discount_amount = Some(Decimal::from(2));
        old.discount_amount_type = Some(DiscountAmountType::Percentage);
        old.discount_amount_value = Some(Decimal::from(20));

        let mut bill_item = claim(6.0, 6.0);
        bill_item.adjustment_price = Some(-2.0);
        assert!(validate_adjustment_price(&bill_item, &old, &BillingRatio::FULL).is_ok());

        let mut discounted = claim(20.0, 16.0);
        discounted.discount_item = Some(percentage(20.0, 4.0));
        discounted.adjustment_price = Some(8.0);
        assert!(validate_adjustment_price(&discounted, &old, &BillingRatio::FULL).is_ok());
    }

    #[test]
    fn test_adjustment_derates_new_price_only() {
        let mut old = old_bill_item(1000);
        old.discount_amount = Some(Decimal::from(100));
        old.discount_amount_type = Some(DiscountAmountType::FixedAmount);
        old.discount_amount_value = Some(Decimal::from(100));

        let mut bill_item = claim(500.0, 500.0);
        bill_item.adjustment_price = Some(50.0);
        assert!(validate_adjustment_price(&bill_item, &old, &BillingRatio::new(2, 4)).is_ok());
    }

    #[test]
    fn test_adjustment_with_zero_ratio_is_zero() {
        let mut bill_item = claim(16.0, 16.0);
        bill_item.adjustment_price = Some(0.0);
        assert!(validate_adjustment_price(&bill_item, &old_bill_item(10), &BillingRatio::new(0, 0)).is_ok());
        assert!(validate_adjustment_price(&bill_item, &old_bill_item(10), &BillingRatio::new(0, 3)).is_ok());
        assert!(validate_adjustment_price(&bill_item, &old_bill_item(10), &BillingRatio::new(3, 0)).is_ok());
    }

    #[test]
    fn test_cancel_adjustment_refunds_old_price() {
        let mut bill_item = claim(12.0, 12.0);
        bill_item.adjustment_price = Some(-12.0);
        assert!(validate_adjustment_price_for_cancel_order(&bill_item, &old_bill_item(12), &BillingRatio::FULL).is_ok());

        bill_item.adjustment_price = Some(15.0);
        let err =
            validate_adjustment_price_for_cancel_order(&bill_item, &old_bill_item(12), &BillingRatio::FULL)
                .unwrap_err();
        assert_eq!(
            err.debug_detail(),
            Some("Incorrect adjustment price for cancel of product product-1 actual = 15 vs expect = -12")
        );
    }

    #[test]
    fn test_cancel_adjustment_is_pro_rated() {
        let mut bill_item = claim(12.0, 12.0);
        bill_item.adjustment_price = Some(-6.0);
        assert!(
            validate_adjustment_price_for_cancel_order(&bill_item, &old_bill_item(12), &BillingRatio::new(1, 2))
                .is_ok()
        );
        bill_item.adjustment_price = Some(0.0);
        assert!(
            validate_adjustment_price_for_cancel_order(&bill_item, &old_bill_item(12), &BillingRatio::new(0, 0))
                .is_ok()
        );
    }
}

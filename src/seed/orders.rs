// SPDX-License-Identifier: Apache-2.0

//! Random order and order-item generation.
//!
//! Generation is pure: callers hand in the ids read back from the database,
//! the product price map and an RNG, and get rows ready to insert. With a
//! seeded RNG the output is reproducible.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Duration, NaiveDateTime};
use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::Decimal;

use crate::engine::error::{EngineError, EngineResult};

pub const ORDER_COUNT: usize = 15;
pub const MAX_ITEMS_PER_ORDER: usize = 4;
const MAX_QUANTITY: i32 = 3;
const MAX_DAYS_AGO: i64 = 60;
const FIRST_HOUR: u32 = 9;
const LAST_HOUR: u32 = 17;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Completed,
    Processing,
    Shipped,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Completed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Completed => "Completed",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub customer_id: i32,
    pub order_date: NaiveDateTime,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub order_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub price: Decimal,
}

/// Generates [`ORDER_COUNT`] orders placed 1 to 60 days before `now`,
/// during business hours.
pub fn generate_orders<R: Rng>(
    rng: &mut R,
    customer_ids: &[i32],
    now: NaiveDateTime,
) -> EngineResult<Vec<NewOrder>> {
    if customer_ids.is_empty() {
        return Err(EngineError::validation(
            "Cannot generate orders without customers",
        ));
    }

    (0..ORDER_COUNT)
        .map(|_| {
            let customer_id = *customer_ids
                .choose(rng)
                .ok_or_else(|| EngineError::internal("customer id list is empty"))?;
            let status = *OrderStatus::ALL
                .choose(rng)
                .ok_or_else(|| EngineError::internal("order status list is empty"))?;

            let day = (now - Duration::days(rng.gen_range(1..=MAX_DAYS_AGO))).date();
            let hour = rng.gen_range(FIRST_HOUR..=LAST_HOUR);
            let minute = rng.gen_range(0..60);
            let second = rng.gen_range(0..60);
            let order_date = day.and_hms_opt(hour, minute, second).ok_or_else(|| {
                EngineError::internal(format!("invalid order time {hour}:{minute}:{second}"))
            })?;

            Ok(NewOrder {
                customer_id,
                order_date,
                status,
            })
        })
        .collect()
}

/// Generates 1 to 4 items per order. Each item's price is copied from
/// `prices`, the product id to current price map.
pub fn generate_items<R: Rng>(
    rng: &mut R,
    order_ids: &[i32],
    prices: &BTreeMap<i32, Decimal>,
) -> EngineResult<Vec<NewOrderItem>> {
    let product_ids: Vec<i32> = prices.keys().copied().collect();
    if product_ids.is_empty() {
        return Err(EngineError::validation(
            "Cannot generate order items without products",
        ));
    }

    let mut items = Vec::with_capacity(order_ids.len() * MAX_ITEMS_PER_ORDER);
    for &order_id in order_ids {
        for _ in 0..rng.gen_range(1..=MAX_ITEMS_PER_ORDER) {
            let product_id = *product_ids
                .choose(rng)
                .ok_or_else(|| EngineError::internal("product id list is empty"))?;
            let price = prices[&product_id];
            items.push(NewOrderItem {
                order_id,
                product_id,
                quantity: rng.gen_range(1..=MAX_QUANTITY),
                price,
            });
        }
    }
    Ok(items)
}

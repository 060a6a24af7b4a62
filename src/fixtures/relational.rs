// SPDX-License-Identifier: Apache-2.0

//! Fixed customer and product rows.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::engine::error::EngineResult;

use super::parse_date;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomerFixture {
    pub name: &'static str,
    pub email: &'static str,
    pub country: &'static str,
    pub signup_date: &'static str,
}

impl CustomerFixture {
    pub fn signup_date(&self) -> EngineResult<NaiveDate> {
        parse_date(self.signup_date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductFixture {
    pub name: &'static str,
    pub category: &'static str,
    pub price_cents: i64,
    pub in_stock: bool,
}

impl ProductFixture {
    /// Price as DECIMAL(10,2).
    pub fn price(&self) -> Decimal {
        Decimal::new(self.price_cents, 2)
    }
}

const fn customer(
    name: &'static str,
    email: &'static str,
    country: &'static str,
    signup_date: &'static str,
) -> CustomerFixture {
    CustomerFixture {
        name,
        email,
        country,
        signup_date,
    }
}

const fn product(
    name: &'static str,
    category: &'static str,
    price_cents: i64,
    in_stock: bool,
) -> ProductFixture {
    ProductFixture {
        name,
        category,
        price_cents,
        in_stock,
    }
}

pub const CUSTOMERS: [CustomerFixture; 7] = [
    customer("John Doe", "john@example.com", "USA", "2024-01-15"),
    customer("Jane Smith", "jane@example.com", "Canada", "2024-02-20"),
    customer("Bob Johnson", "bob@example.com", "UK", "2024-03-05"),
    customer("Maria Garcia", "maria@example.com", "Spain", "2024-01-28"),
    customer("Ahmed Hassan", "ahmed@example.com", "Egypt", "2024-02-14"),
    customer("Li Wei", "li@example.com", "China", "2024-03-10"),
    customer("Anna Kowalski", "anna@example.com", "Poland", "2024-01-05"),
];

pub const PRODUCTS: [ProductFixture; 10] = [
    product("Laptop Pro", "Electronics", 129999, true),
    product("Wireless Headphones", "Electronics", 14999, true),
    product("Coffee Maker", "Kitchen", 7999, true),
    product("Smart Watch", "Electronics", 24999, true),
    product("Blender", "Kitchen", 5999, false),
    product("Smartphone X", "Electronics", 89999, true),
    product("Desk Lamp", "Home Goods", 3599, true),
    product("Yoga Mat", "Fitness", 2999, true),
    product("Water Bottle", "Fitness", 1999, true),
    product("Bluetooth Speaker", "Electronics", 8999, false),
];

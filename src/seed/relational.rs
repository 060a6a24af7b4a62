// SPDX-License-Identifier: Apache-2.0

//! Relational seeding
//!
//! Everything runs inside one transaction on the driver's connection. Any
//! failure drops the transaction uncommitted, which rolls the whole
//! relational side back.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};
use rand::Rng;
use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder, Transaction};
use tracing::instrument;

use crate::engine::drivers::postgres::{map_sqlx_error, PostgresDriver};
use crate::engine::error::EngineResult;
use crate::fixtures::{CustomerFixture, CUSTOMERS, PRODUCTS};

use super::orders::{generate_items, generate_orders, NewOrder, NewOrderItem};

/// Seeded tables, children first.
pub const TABLES: [&str; 4] = ["order_items", "orders", "products", "customers"];

const CREATE_TABLES: [&str; 4] = [
    r#"
    CREATE TABLE customers (
        id SERIAL PRIMARY KEY,
        name VARCHAR(100) NOT NULL,
        email VARCHAR(100) UNIQUE NOT NULL,
        country VARCHAR(50),
        signup_date DATE NOT NULL
    )
    "#,
    r#"
    CREATE TABLE products (
        id SERIAL PRIMARY KEY,
        name VARCHAR(100) NOT NULL,
        category VARCHAR(50) NOT NULL,
        price DECIMAL(10, 2) NOT NULL,
        in_stock BOOLEAN DEFAULT TRUE
    )
    "#,
    r#"
    CREATE TABLE orders (
        id SERIAL PRIMARY KEY,
        customer_id INTEGER REFERENCES customers(id),
        order_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        status VARCHAR(20) NOT NULL
    )
    "#,
    r#"
    CREATE TABLE order_items (
        id SERIAL PRIMARY KEY,
        order_id INTEGER REFERENCES orders(id),
        product_id INTEGER REFERENCES products(id),
        quantity INTEGER NOT NULL,
        price DECIMAL(10, 2) NOT NULL
    )
    "#,
];

/// Creates and fills the four tables. Returns rows inserted per table.
#[instrument(skip(driver, rng), fields(endpoint = %driver.endpoint()))]
pub async fn seed_relational<R: Rng>(
    driver: &PostgresDriver,
    reset: bool,
    rng: &mut R,
) -> EngineResult<BTreeMap<String, u64>> {
    let mut tx = driver.begin().await?;
    let mut counts = BTreeMap::new();

    if reset {
        for table in TABLES {
            execute(&mut tx, &format!("DROP TABLE IF EXISTS {table}")).await?;
        }
        tracing::info!("Dropped existing relational tables");
    }

    for statement in CREATE_TABLES {
        execute(&mut tx, statement).await?;
    }

    counts.insert("customers".to_string(), insert_customers(&mut tx).await?);
    counts.insert("products".to_string(), insert_products(&mut tx).await?);

    let customer_ids = select_ids(&mut tx, "SELECT id FROM customers ORDER BY id").await?;
    let orders = generate_orders(rng, &customer_ids, Local::now().naive_local())?;
    counts.insert("orders".to_string(), insert_orders(&mut tx, &orders).await?);

    let prices = price_map(&mut tx).await?;
    let order_ids = select_ids(&mut tx, "SELECT id FROM orders ORDER BY id").await?;
    let items = generate_items(rng, &order_ids, &prices)?;
    counts.insert(
        "order_items".to_string(),
        insert_order_items(&mut tx, &items).await?,
    );

    tx.commit().await.map_err(map_sqlx_error)?;
    tracing::info!(?counts, "Relational seed committed");
    Ok(counts)
}

async fn execute(tx: &mut Transaction<'static, Postgres>, sql: &str) -> EngineResult<()> {
    sqlx::query(sql)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;
    Ok(())
}

async fn select_ids(tx: &mut Transaction<'static, Postgres>, sql: &str) -> EngineResult<Vec<i32>> {
    sqlx::query_scalar::<_, i32>(sql)
        .fetch_all(&mut **tx)
        .await
        .map_err(map_sqlx_error)
}

/// Product id to current price, read once.
async fn price_map(
    tx: &mut Transaction<'static, Postgres>,
) -> EngineResult<BTreeMap<i32, Decimal>> {
    let rows: Vec<(i32, Decimal)> = sqlx::query_as("SELECT id, price FROM products ORDER BY id")
        .fetch_all(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;
    Ok(rows.into_iter().collect())
}

async fn insert_customers(tx: &mut Transaction<'static, Postgres>) -> EngineResult<u64> {
    let rows: Vec<(&CustomerFixture, NaiveDate)> = CUSTOMERS
        .iter()
        .map(|c| Ok((c, c.signup_date()?)))
        .collect::<EngineResult<_>>()?;

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO customers (name, email, country, signup_date) ");
    builder.push_values(rows, |mut b, (customer, signup_date)| {
        b.push_bind(customer.name)
            .push_bind(customer.email)
            .push_bind(customer.country)
            .push_bind(signup_date);
    });

    let result = builder
        .build()
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;
    Ok(result.rows_affected())
}

async fn insert_products(tx: &mut Transaction<'static, Postgres>) -> EngineResult<u64> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO products (name, category, price, in_stock) ");
    builder.push_values(PRODUCTS.iter(), |mut b, product| {
        b.push_bind(product.name)
            .push_bind(product.category)
            .push_bind(product.price())
            .push_bind(product.in_stock);
    });

    let result = builder
        .build()
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;
    Ok(result.rows_affected())
}

async fn insert_orders(
    tx: &mut Transaction<'static, Postgres>,
    orders: &[NewOrder],
) -> EngineResult<u64> {
    if orders.is_empty() {
        return Ok(0);
    }

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO orders (customer_id, order_date, status) ");
    builder.push_values(orders, |mut b, order| {
        b.push_bind(order.customer_id)
            .push_bind(order.order_date)
            .push_bind(order.status.as_str());
    });

    let result = builder
        .build()
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;
    Ok(result.rows_affected())
}

async fn insert_order_items(
    tx: &mut Transaction<'static, Postgres>,
    items: &[NewOrderItem],
) -> EngineResult<u64> {
    if items.is_empty() {
        return Ok(0);
    }

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO order_items (order_id, product_id, quantity, price) ");
    builder.push_values(items, |mut b, item| {
        b.push_bind(item.order_id)
            .push_bind(item.product_id)
            .push_bind(item.quantity)
            .push_bind(item.price);
    });

    let result = builder
        .build()
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;
    Ok(result.rows_affected())
}

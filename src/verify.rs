// SPDX-License-Identifier: Apache-2.0

//! Post-seed checks
//!
//! Reads counts and integrity figures back from both stores and compares
//! them with what a seed run is expected to produce.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use tracing::instrument;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::traits::DataEngine;
use crate::engine::types::Value;
use crate::fixtures::documents::{user_ids, REVIEW_COUNT, USER_COUNT, WAREHOUSE_COUNT};
use crate::fixtures::{CUSTOMERS, PRODUCTS};
use crate::seed::orders::MAX_ITEMS_PER_ORDER;
use crate::seed::ORDER_COUNT;

/// What a check accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    Exactly(i64),
    Between(i64, i64),
}

impl Expectation {
    pub fn accepts(&self, actual: i64) -> bool {
        match *self {
            Expectation::Exactly(n) => actual == n,
            Expectation::Between(lo, hi) => (lo..=hi).contains(&actual),
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::Exactly(n) => write!(f, "{n}"),
            Expectation::Between(lo, hi) => write!(f, "{lo}..={hi}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub name: String,
    pub expected: Expectation,
    pub actual: i64,
    pub passed: bool,
}

impl CheckOutcome {
    pub fn new(name: impl Into<String>, expected: Expectation, actual: i64) -> Self {
        Self {
            name: name.into(),
            expected,
            actual,
            passed: expected.accepts(actual),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub checks: Vec<CheckOutcome>,
}

impl VerificationReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.checks.iter().filter(|c| !c.passed)
    }

    /// Turns a report with failed checks into a `ValidationError`.
    pub fn into_result(self) -> EngineResult<Self> {
        if self.passed() {
            return Ok(self);
        }
        let failed: Vec<String> = self
            .failures()
            .map(|c| format!("{} (expected {}, got {})", c.name, c.expected, c.actual))
            .collect();
        Err(EngineError::validation(format!(
            "{} check(s) failed: {}",
            failed.len(),
            failed.join("; ")
        )))
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for check in &self.checks {
            let mark = if check.passed { "ok" } else { "FAILED" };
            writeln!(
                f,
                "{:<6} {:<32} expected {:<8} actual {}",
                mark, check.name, check.expected.to_string(), check.actual
            )?;
        }
        Ok(())
    }
}

/// Figures read back from the relational store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationalFigures {
    pub customers: i64,
    pub products: i64,
    pub orders: i64,
    pub orphan_orders: i64,
    pub min_items_per_order: i64,
    pub max_items_per_order: i64,
    pub price_mismatches: i64,
    pub customer_emails: BTreeSet<String>,
    pub product_names: BTreeSet<String>,
}

/// Figures read back from the document store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFigures {
    pub users: i64,
    pub reviews: i64,
    pub inventory: i64,
    pub user_ids: BTreeSet<i64>,
}

/// Number of values present on only one side.
fn drift<T: Ord>(actual: &BTreeSet<T>, expected: impl IntoIterator<Item = T>) -> i64 {
    let expected: BTreeSet<T> = expected.into_iter().collect();
    actual.symmetric_difference(&expected).count() as i64
}

pub fn relational_checks(figures: &RelationalFigures) -> Vec<CheckOutcome> {
    let none = Expectation::Exactly(0);
    let items = Expectation::Between(1, MAX_ITEMS_PER_ORDER as i64);
    let email_drift = drift(
        &figures.customer_emails,
        CUSTOMERS.iter().map(|c| c.email.to_string()),
    );
    let name_drift = drift(
        &figures.product_names,
        PRODUCTS.iter().map(|p| p.name.to_string()),
    );
    vec![
        CheckOutcome::new(
            "customers",
            Expectation::Exactly(CUSTOMERS.len() as i64),
            figures.customers,
        ),
        CheckOutcome::new("customer emails off fixture", none, email_drift),
        CheckOutcome::new(
            "products",
            Expectation::Exactly(PRODUCTS.len() as i64),
            figures.products,
        ),
        CheckOutcome::new("product names off fixture", none, name_drift),
        CheckOutcome::new("orders", Expectation::Exactly(ORDER_COUNT as i64), figures.orders),
        CheckOutcome::new("orders without customer", none, figures.orphan_orders),
        CheckOutcome::new("fewest items in an order", items, figures.min_items_per_order),
        CheckOutcome::new("most items in an order", items, figures.max_items_per_order),
        CheckOutcome::new("item price mismatches", none, figures.price_mismatches),
    ]
}

pub fn document_checks(figures: &DocumentFigures) -> Vec<CheckOutcome> {
    let id_drift = drift(&figures.user_ids, user_ids().map(i64::from));
    vec![
        CheckOutcome::new("users", Expectation::Exactly(USER_COUNT as i64), figures.users),
        CheckOutcome::new("user ids off fixture", Expectation::Exactly(0), id_drift),
        CheckOutcome::new("reviews", Expectation::Exactly(REVIEW_COUNT as i64), figures.reviews),
        CheckOutcome::new(
            "inventory",
            Expectation::Exactly(WAREHOUSE_COUNT as i64),
            figures.inventory,
        ),
    ]
}

const ORPHAN_ORDERS_SQL: &str = "SELECT COUNT(*) FROM orders o \
     LEFT JOIN customers c ON c.id = o.customer_id \
     WHERE c.id IS NULL";

const ITEMS_PER_ORDER_SQL: &str = "SELECT COALESCE(MIN(n), 0), COALESCE(MAX(n), 0) FROM ( \
     SELECT o.id, COUNT(oi.id) AS n FROM orders o \
     LEFT JOIN order_items oi ON oi.order_id = o.id \
     GROUP BY o.id) per_order";

const PRICE_MISMATCH_SQL: &str = "SELECT COUNT(*) FROM order_items oi \
     JOIN products p ON p.id = oi.product_id \
     WHERE oi.price <> p.price";

/// Reads the relational figures through any SQL engine.
#[instrument(skip_all, fields(engine = engine.driver_name()))]
pub async fn read_relational(engine: &dyn DataEngine) -> EngineResult<RelationalFigures> {
    let (min_items, max_items) = pair(engine, ITEMS_PER_ORDER_SQL).await?;
    Ok(RelationalFigures {
        customers: scalar(engine, "SELECT COUNT(*) FROM customers").await?,
        products: scalar(engine, "SELECT COUNT(*) FROM products").await?,
        orders: scalar(engine, "SELECT COUNT(*) FROM orders").await?,
        orphan_orders: scalar(engine, ORPHAN_ORDERS_SQL).await?,
        min_items_per_order: min_items,
        max_items_per_order: max_items,
        price_mismatches: scalar(engine, PRICE_MISMATCH_SQL).await?,
        customer_emails: texts(engine, "SELECT email FROM customers").await?,
        product_names: texts(engine, "SELECT name FROM products").await?,
    })
}

/// Reads the document figures by scanning each collection.
#[instrument(skip_all, fields(engine = engine.driver_name()))]
pub async fn read_documents(engine: &dyn DataEngine) -> EngineResult<DocumentFigures> {
    let users = engine.execute("users").await?;
    let user_ids = users
        .rows
        .iter()
        .map(|row| match row.values.first() {
            Some(Value::Json(doc)) => doc["user_id"].as_i64(),
            _ => None,
        })
        .collect::<Option<BTreeSet<i64>>>()
        .ok_or_else(|| EngineError::execution_error("users document without integer user_id"))?;

    Ok(DocumentFigures {
        users: users.rows.len() as i64,
        reviews: engine.execute("reviews").await?.rows.len() as i64,
        inventory: engine.execute("inventory").await?.rows.len() as i64,
        user_ids,
    })
}

async fn texts(engine: &dyn DataEngine, sql: &str) -> EngineResult<BTreeSet<String>> {
    let result = engine.execute(sql).await?;
    result
        .rows
        .iter()
        .map(|row| row.values.first().and_then(Value::as_str).map(str::to_string))
        .collect::<Option<BTreeSet<String>>>()
        .ok_or_else(|| EngineError::execution_error(format!("Expected text values from: {sql}")))
}

async fn scalar(engine: &dyn DataEngine, sql: &str) -> EngineResult<i64> {
    let result = engine.execute(sql).await?;
    result
        .scalar()
        .and_then(|v| v.as_i64())
        .ok_or_else(|| EngineError::execution_error(format!("Expected one integer from: {sql}")))
}

async fn pair(engine: &dyn DataEngine, sql: &str) -> EngineResult<(i64, i64)> {
    let result = engine.execute(sql).await?;
    let row = result
        .rows
        .first()
        .ok_or_else(|| EngineError::execution_error(format!("No row returned by: {sql}")))?;
    match row.values.as_slice() {
        [a, b] => a.as_i64().zip(b.as_i64()).ok_or_else(|| {
            EngineError::execution_error(format!("Expected two integers from: {sql}"))
        }),
        _ => Err(EngineError::execution_error(format!(
            "Expected two columns from: {sql}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::engine::types::{QueryResult, Row};

    fn healthy() -> RelationalFigures {
        RelationalFigures {
            customers: 7,
            products: 10,
            orders: 15,
            orphan_orders: 0,
            min_items_per_order: 1,
            max_items_per_order: 4,
            price_mismatches: 0,
            customer_emails: CUSTOMERS.iter().map(|c| c.email.to_string()).collect(),
            product_names: PRODUCTS.iter().map(|p| p.name.to_string()).collect(),
        }
    }

    fn healthy_documents() -> DocumentFigures {
        DocumentFigures {
            users: 5,
            reviews: 7,
            inventory: 4,
            user_ids: (1..=5).collect(),
        }
    }

    fn failed_names(checks: Vec<CheckOutcome>) -> Vec<String> {
        VerificationReport { checks }
            .failures()
            .map(|c| c.name.clone())
            .collect()
    }

    #[test]
    fn healthy_seed_passes() {
        let mut report = VerificationReport::default();
        report.checks.extend(relational_checks(&healthy()));
        report.checks.extend(document_checks(&healthy_documents()));
        assert!(report.passed());
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn empty_order_fails_items_check() {
        let figures = RelationalFigures {
            min_items_per_order: 0,
            ..healthy()
        };
        assert_eq!(failed_names(relational_checks(&figures)), vec!["fewest items in an order"]);
    }

    #[test]
    fn right_count_of_wrong_customers_fails() {
        let mut figures = healthy();
        figures.customer_emails.remove("john@example.com");
        figures.customer_emails.insert("mallory@example.com".to_string());
        assert_eq!(figures.customer_emails.len(), 7);

        let checks = relational_checks(&figures);
        let drift = checks
            .iter()
            .find(|c| c.name == "customer emails off fixture")
            .unwrap();
        assert_eq!(drift.actual, 2);
        assert_eq!(failed_names(checks), vec!["customer emails off fixture"]);
    }

    #[test]
    fn renamed_product_fails() {
        let mut figures = healthy();
        let first = PRODUCTS[0].name.to_string();
        figures.product_names.remove(&first);
        figures.product_names.insert(format!("{first} (refurbished)"));
        assert_eq!(failed_names(relational_checks(&figures)), vec!["product names off fixture"]);
    }

    #[test]
    fn unexpected_user_ids_fail() {
        let figures = DocumentFigures {
            user_ids: [1, 2, 3, 4, 99].into_iter().collect(),
            ..healthy_documents()
        };
        assert_eq!(failed_names(document_checks(&figures)), vec!["user ids off fixture"]);
    }

    #[test]
    fn failures_become_validation_error() {
        let report = VerificationReport {
            checks: document_checks(&DocumentFigures {
                users: 10,
                ..healthy_documents()
            }),
        };
        let err = report.into_result().unwrap_err();
        assert!(matches!(err, EngineError::ValidationError { .. }));
        assert!(err.to_string().contains("users (expected 5, got 10)"));
    }

    #[test]
    fn expectation_display() {
        assert_eq!(Expectation::Exactly(7).to_string(), "7");
        assert_eq!(Expectation::Between(1, 4).to_string(), "1..=4");
        assert!(Expectation::Between(1, 4).accepts(4));
        assert!(!Expectation::Between(1, 4).accepts(5));
    }

    /// Serves fixed documents per collection name.
    struct DocumentStore;

    #[async_trait]
    impl DataEngine for DocumentStore {
        fn driver_id(&self) -> &'static str {
            "documents"
        }

        fn driver_name(&self) -> &'static str {
            "in-memory documents"
        }

        async fn ping(&self) -> EngineResult<()> {
            Ok(())
        }

        async fn execute(&self, query: &str) -> EngineResult<QueryResult> {
            let docs = match query {
                "users" => vec![json!({"user_id": 1}), json!({"user_id": 7})],
                "reviews" => vec![json!({"review_id": 1})],
                "inventory" => vec![],
                other => {
                    return Err(EngineError::execution_error(format!("no collection {other}")))
                }
            };
            Ok(QueryResult {
                columns: Vec::new(),
                rows: docs
                    .into_iter()
                    .map(|doc| Row {
                        values: vec![Value::Json(doc)],
                    })
                    .collect(),
                execution_time_ms: 0.0,
            })
        }

        async fn close(&self) -> EngineResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn document_figures_come_from_collection_scans() {
        let figures = read_documents(&DocumentStore).await.unwrap();
        assert_eq!(
            figures,
            DocumentFigures {
                users: 2,
                reviews: 1,
                inventory: 0,
                user_ids: [1, 7].into_iter().collect(),
            }
        );
        let failed = failed_names(document_checks(&figures));
        assert!(failed.contains(&"user ids off fixture".to_string()));
    }
}

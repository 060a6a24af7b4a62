// SPDX-License-Identifier: Apache-2.0

//! The fixed read queries issued through the federation engine.

use std::collections::HashSet;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Where each backing store is mounted inside the federation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogLayout {
    pub relational_catalog: String,
    pub relational_schema: String,
    pub document_catalog: String,
    pub document_schema: String,
}

impl Default for CatalogLayout {
    fn default() -> Self {
        Self {
            relational_catalog: "postgresql".to_string(),
            relational_schema: "public".to_string(),
            document_catalog: "mongodb".to_string(),
            document_schema: "testdb".to_string(),
        }
    }
}

impl CatalogLayout {
    pub fn relational(&self, table: &str) -> String {
        format!("{}.{}.{}", self.relational_catalog, self.relational_schema, table)
    }

    pub fn document(&self, collection: &str) -> String {
        format!("{}.{}.{}", self.document_catalog, self.document_schema, collection)
    }

    /// Lowercased catalog names, for reference validation.
    pub fn known_catalogs(&self) -> HashSet<String> {
        [&self.relational_catalog, &self.document_catalog]
            .into_iter()
            .map(|c| c.to_lowercase())
            .collect()
    }
}

/// How the cross-store query expresses its join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinStyle {
    /// `JOIN ... ON p.id = r.product_id`
    #[default]
    Explicit,
    /// `FROM products p, reviews r WHERE p.id = r.product_id`
    Implicit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FederatedQuery {
    pub title: String,
    pub sql: String,
}

/// Customers from the relational store, users from the document store, then
/// products joined with their reviews across both.
pub fn standard_queries(layout: &CatalogLayout, join: JoinStyle) -> Vec<FederatedQuery> {
    let products = layout.relational("products");
    let reviews = layout.document("reviews");

    let cross_store = match join {
        JoinStyle::Explicit => format!(
            "SELECT p.name AS product_name, r.rating, r.review_text \
             FROM {products} p \
             JOIN {reviews} r ON p.id = r.product_id"
        ),
        JoinStyle::Implicit => format!(
            "SELECT p.name AS product_name, r.rating, r.review_text \
             FROM {products} p, {reviews} r \
             WHERE p.id = r.product_id"
        ),
    };

    vec![
        FederatedQuery {
            title: "PostgreSQL Data (Customers)".to_string(),
            sql: format!("SELECT * FROM {}", layout.relational("customers")),
        },
        FederatedQuery {
            title: "MongoDB Data (Users)".to_string(),
            sql: format!("SELECT * FROM {}", layout.document("users")),
        },
        FederatedQuery {
            title: "Cross-Database Query (Product Reviews)".to_string(),
            sql: cross_store,
        },
    ]
}

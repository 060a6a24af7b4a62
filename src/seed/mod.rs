// SPDX-License-Identifier: Apache-2.0

//! Seeder
//!
//! Fills the relational store with customers, products, orders and order
//! items, and the document store with users, reviews and inventory.
//!
//! Seeding is only destructive under `reset`. Without it, the seeder checks
//! every target up front and refuses with `ResetRequired` if any table or
//! collection is already there, before writing to either store.

pub mod documents;
pub mod orders;
pub mod relational;

use std::collections::BTreeMap;
use std::fmt;

use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::engine::drivers::mongodb::MongoDriver;
use crate::engine::drivers::postgres::PostgresDriver;
use crate::engine::error::{EngineError, EngineResult};

pub use documents::{seed_documents, COLLECTIONS};
pub use orders::{OrderStatus, ORDER_COUNT};
pub use relational::{seed_relational, TABLES};

/// Which store(s) a seed run writes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedTarget {
    #[default]
    All,
    Relational,
    Documents,
}

impl SeedTarget {
    pub fn includes_relational(self) -> bool {
        matches!(self, SeedTarget::All | SeedTarget::Relational)
    }

    pub fn includes_documents(self) -> bool {
        matches!(self, SeedTarget::All | SeedTarget::Documents)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SeedOptions {
    /// Drop existing tables and collections first.
    pub reset: bool,
    pub target: SeedTarget,
    /// Fixes the random order population.
    pub rng_seed: Option<u64>,
}

/// Rows and documents written by one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub tables: BTreeMap<String, u64>,
    pub collections: BTreeMap<String, u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rng_seed: Option<u64>,
}

impl fmt::Display for SeedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.tables.is_empty() {
            writeln!(f, "PostgreSQL:")?;
            for (table, rows) in &self.tables {
                writeln!(f, "  {table}: {rows} rows")?;
            }
            if let Some(seed) = self.rng_seed {
                writeln!(f, "  (random orders from seed {seed})")?;
            }
        }
        if !self.collections.is_empty() {
            writeln!(f, "MongoDB:")?;
            for (collection, docs) in &self.collections {
                writeln!(f, "  {collection}: {docs} documents")?;
            }
        }
        Ok(())
    }
}

/// Runs the seeder against the stores selected by `options.target`.
///
/// `postgres` and `mongo` must be provided for the stores the target includes.
pub async fn run_seed(
    postgres: Option<&PostgresDriver>,
    mongo: Option<&MongoDriver>,
    options: &SeedOptions,
) -> EngineResult<SeedReport> {
    let postgres = if options.target.includes_relational() {
        Some(postgres.ok_or_else(|| EngineError::internal("PostgreSQL driver not connected"))?)
    } else {
        None
    };
    let mongo = if options.target.includes_documents() {
        Some(mongo.ok_or_else(|| EngineError::internal("MongoDB driver not connected"))?)
    } else {
        None
    };

    if !options.reset {
        let existing_tables = match postgres {
            Some(driver) => driver.existing_tables(&TABLES).await?,
            None => Vec::new(),
        };
        let existing_collections = match mongo {
            Some(driver) => driver.existing_collections(&COLLECTIONS).await?,
            None => Vec::new(),
        };
        if let Some(message) = refusal_message(&existing_tables, &existing_collections) {
            return Err(EngineError::reset_required(message));
        }
    }

    // Recorded in the report so a run can be replayed with --rng-seed.
    let seed = options.rng_seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut report = SeedReport {
        rng_seed: postgres.map(|_| seed),
        ..SeedReport::default()
    };

    if let Some(driver) = postgres {
        report.tables = seed_relational(driver, options.reset, &mut rng).await?;
    }
    if let Some(driver) = mongo {
        report.collections = seed_documents(driver, options.reset).await?;
    }

    Ok(report)
}

/// Describes what is in the way of a non-reset run, if anything.
fn refusal_message(existing_tables: &[String], existing_collections: &[String]) -> Option<String> {
    let mut parts = Vec::new();
    if !existing_tables.is_empty() {
        parts.push(format!("tables {}", existing_tables.join(", ")));
    }
    if !existing_collections.is_empty() {
        parts.push(format!("collections {}", existing_collections.join(", ")));
    }
    if parts.is_empty() {
        return None;
    }
    Some(format!(
        "{} already exist; rerun with --reset to drop and recreate them",
        parts.join(" and ")
    ))
}

// SPDX-License-Identifier: Apache-2.0

//! Document seeding. Drops and inserts are independent operations; a
//! failed insert leaves the earlier drops in place.

use std::collections::BTreeMap;

use tracing::instrument;

use crate::engine::drivers::mongodb::MongoDriver;
use crate::engine::error::EngineResult;
use crate::fixtures::documents::{inventory, reviews, users};

pub const COLLECTIONS: [&str; 3] = ["users", "reviews", "inventory"];

/// Inserts users, reviews and inventory. Returns documents inserted per collection.
#[instrument(skip(driver), fields(database = %driver.database_name()))]
pub async fn seed_documents(
    driver: &MongoDriver,
    reset: bool,
) -> EngineResult<BTreeMap<String, u64>> {
    if reset {
        for collection in COLLECTIONS {
            driver.drop_collection(collection).await?;
        }
        tracing::info!("Dropped existing collections");
    }

    let mut counts = BTreeMap::new();
    counts.insert(
        "users".to_string(),
        driver.insert_documents("users", &users()?).await?,
    );
    counts.insert(
        "reviews".to_string(),
        driver.insert_documents("reviews", &reviews()?).await?,
    );
    counts.insert(
        "inventory".to_string(),
        driver.insert_documents("inventory", &inventory()?).await?,
    );

    tracing::info!(?counts, "Document seed finished");
    Ok(counts)
}

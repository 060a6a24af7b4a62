// SPDX-License-Identifier: Apache-2.0

//! Literal sample data written by the seeder.

pub mod documents;
pub mod relational;

use chrono::{NaiveDate, NaiveTime};
use mongodb::bson;

use crate::engine::error::{EngineError, EngineResult};

pub use documents::{
    Address, InventoryDocument, InventoryItem, ReviewDocument, UserDocument,
};
pub use relational::{CustomerFixture, ProductFixture, CUSTOMERS, PRODUCTS};

pub(crate) fn parse_date(value: &str) -> EngineResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| EngineError::internal(format!("Bad fixture date '{value}': {e}")))
}

/// Midnight UTC of `value` as a BSON datetime.
pub(crate) fn bson_date(value: &str) -> EngineResult<bson::DateTime> {
    let midnight = parse_date(value)?.and_time(NaiveTime::MIN).and_utc();
    Ok(bson::DateTime::from_millis(midnight.timestamp_millis()))
}

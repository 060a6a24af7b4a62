// SPDX-License-Identifier: Apache-2.0

//! DataEngine trait definition
//!
//! The common surface of everything polyseed talks to: the PostgreSQL and
//! MongoDB backing stores and the federation engine. Seeding uses the
//! concrete drivers directly; verification and the query runner only need
//! this trait.

use async_trait::async_trait;

use crate::engine::error::EngineResult;
use crate::engine::types::QueryResult;

#[async_trait]
pub trait DataEngine: Send + Sync {
    /// Returns the unique identifier for this driver (e.g., "postgres", "mongodb", "trino")
    fn driver_id(&self) -> &'static str;

    /// Returns a human-readable name for this driver
    fn driver_name(&self) -> &'static str;

    /// Round-trips to the server to prove it is reachable and accepts our credentials
    async fn ping(&self) -> EngineResult<()>;

    /// Executes a read query and materializes every returned row
    ///
    /// For SQL engines: executes SQL statements
    /// For MongoDB: a `collection` or `database.collection` name to scan
    async fn execute(&self, query: &str) -> EngineResult<QueryResult>;

    /// Releases the underlying connection
    async fn close(&self) -> EngineResult<()>;
}

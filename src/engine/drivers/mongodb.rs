// SPDX-License-Identifier: Apache-2.0

//! MongoDB Driver
//!
//! Implements the DataEngine trait for the document backing store using the
//! official MongoDB driver.

use std::time::Instant;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::error::ErrorKind;
use mongodb::{options::ClientOptions, Client, Database};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Serialize;
use tracing::instrument;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::traits::DataEngine;
use crate::engine::types::{ColumnInfo, ConnectionConfig, QueryResult, Row as QRow, Value};

const STORE_NAME: &str = "MongoDB";

/// MongoDB driver implementation
pub struct MongoDriver {
    client: Client,
    database: String,
    endpoint: String,
}

impl MongoDriver {
    /// Builds the client and pings the server.
    ///
    /// The driver connects lazily, so the ping is what actually proves the
    /// server is reachable with these credentials.
    #[instrument(skip(config), fields(endpoint = %config.endpoint(), database = ?config.database))]
    pub async fn connect(config: &ConnectionConfig) -> EngineResult<Self> {
        let conn_str = Self::build_connection_string(config);
        let endpoint = config.endpoint();

        let mut options = ClientOptions::parse(&conn_str)
            .await
            .map_err(|e| EngineError::connection_failed(e.to_string()))?;
        options.app_name = Some("polyseed".to_string());
        options.connect_timeout = Some(config.connect_timeout());
        options.server_selection_timeout = Some(config.connect_timeout());

        let client = Client::with_options(options)
            .map_err(|e| EngineError::connection_failed(e.to_string()))?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| map_mongo_error(e, &endpoint))?;

        tracing::info!("MongoDB: connected to {}", endpoint);
        Ok(Self {
            client,
            database: config.database.clone().unwrap_or_else(|| "test".to_string()),
            endpoint,
        })
    }

    pub fn database_name(&self) -> &str {
        &self.database
    }

    fn database(&self) -> Database {
        self.client.database(&self.database)
    }

    /// Returns which of `names` already exist in the configured database.
    pub async fn existing_collections(&self, names: &[&str]) -> EngineResult<Vec<String>> {
        let mut existing: Vec<String> = self
            .database()
            .list_collection_names()
            .await
            .map_err(|e| map_mongo_error(e, &self.endpoint))?
            .into_iter()
            .filter(|name| names.contains(&name.as_str()))
            .collect();
        existing.sort();
        Ok(existing)
    }

    /// Drops a collection. Dropping a collection that does not exist is a no-op.
    pub async fn drop_collection(&self, name: &str) -> EngineResult<()> {
        self.database()
            .collection::<Document>(name)
            .drop()
            .await
            .map_err(|e| map_mongo_error(e, &self.endpoint))?;
        tracing::debug!("MongoDB: dropped collection '{}'", name);
        Ok(())
    }

    /// Inserts `docs` into `collection` and returns how many were written.
    pub async fn insert_documents<T>(&self, collection: &str, docs: &[T]) -> EngineResult<u64>
    where
        T: Serialize + Send + Sync,
    {
        if docs.is_empty() {
            return Ok(0);
        }

        let result = self
            .database()
            .collection::<T>(collection)
            .insert_many(docs)
            .await
            .map_err(|e| map_mongo_error(e, &self.endpoint))?;

        Ok(result.inserted_ids.len() as u64)
    }

    /// Builds a connection string from config
    fn build_connection_string(config: &ConnectionConfig) -> String {
        let tls = if config.ssl { "true" } else { "false" };

        // Only include credentials if username is provided
        if config.username.is_empty() {
            return format!("mongodb://{}:{}/?tls={}", config.host, config.port, tls);
        }

        format!(
            "mongodb://{}:{}@{}:{}/?authSource=admin&tls={}",
            utf8_percent_encode(&config.username, NON_ALPHANUMERIC),
            utf8_percent_encode(config.password.expose(), NON_ALPHANUMERIC),
            config.host,
            config.port,
            tls
        )
    }

    fn document_to_row(doc: &Document) -> EngineResult<QRow> {
        let json = serde_json::to_value(doc).map_err(|e| {
            EngineError::execution_error(format!("Cannot convert document to JSON: {e}"))
        })?;
        Ok(QRow {
            values: vec![Value::Json(json)],
        })
    }

    fn document_column_info() -> Vec<ColumnInfo> {
        vec![ColumnInfo {
            name: "document".to_string(),
            data_type: "json".to_string(),
            nullable: true,
        }]
    }
}

/// Splits `collection` or `database.collection` into a (database, collection) pair.
///
/// A bare name reads from `default_database`.
fn resolve_collection<'a>(
    default_database: &'a str,
    target: &'a str,
) -> EngineResult<(&'a str, &'a str)> {
    let target = target.trim();
    let (database, collection) = target.split_once('.').unwrap_or((default_database, target));
    if database.is_empty() || collection.is_empty() || collection.contains(char::is_whitespace) {
        return Err(EngineError::syntax_error(format!(
            "Expected 'collection' or 'database.collection', got '{target}'"
        )));
    }
    Ok((database, collection))
}

fn map_mongo_error(e: mongodb::error::Error, endpoint: &str) -> EngineError {
    match e.kind.as_ref() {
        ErrorKind::Authentication { .. } => EngineError::auth_failed(e.to_string()),
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) => {
            EngineError::unreachable(STORE_NAME, endpoint, &e)
        }
        _ => EngineError::execution_error(e.to_string()),
    }
}

#[async_trait]
impl DataEngine for MongoDriver {
    fn driver_id(&self) -> &'static str {
        "mongodb"
    }

    fn driver_name(&self) -> &'static str {
        STORE_NAME
    }

    async fn ping(&self) -> EngineResult<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| map_mongo_error(e, &self.endpoint))?;
        Ok(())
    }

    /// Reads every document of the named collection.
    async fn execute(&self, query: &str) -> EngineResult<QueryResult> {
        let start = Instant::now();
        let (database, collection_name) = resolve_collection(&self.database, query)?;

        let documents: Vec<Document> = self
            .client
            .database(database)
            .collection::<Document>(collection_name)
            .find(doc! {})
            .await
            .map_err(|e| map_mongo_error(e, &self.endpoint))?
            .try_collect()
            .await
            .map_err(|e| map_mongo_error(e, &self.endpoint))?;

        let execution_time_ms = start.elapsed().as_micros() as f64 / 1000.0;
        tracing::debug!(
            database,
            collection = collection_name,
            documents = documents.len(),
            execution_time_ms,
            "MongoDB: find finished"
        );

        Ok(QueryResult {
            columns: Self::document_column_info(),
            rows: documents
                .iter()
                .map(Self::document_to_row)
                .collect::<EngineResult<Vec<_>>>()?,
            execution_time_ms,
        })
    }

    async fn close(&self) -> EngineResult<()> {
        self.client.clone().shutdown().await;
        tracing::debug!("MongoDB: client shut down");
        Ok(())
    }
}

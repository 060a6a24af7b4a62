// SPDX-License-Identifier: Apache-2.0

//! Trino Driver
//!
//! Client for the federation engine's HTTP statement protocol. A query is
//! submitted with `POST /v1/statement`; the engine answers with a partial
//! result carrying a `nextUri`, and the client keeps following `nextUri`
//! until it disappears. Columns arrive with the first page that has them,
//! rows may be spread over any number of pages.
//!
//! Planning and execution of cross-catalog joins happen inside the engine;
//! this driver only moves SQL in and rows out.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::traits::DataEngine;
use crate::engine::types::{ColumnInfo, ConnectionConfig, QueryResult, Row, Value};

const STORE_NAME: &str = "Trino";
const SOURCE: &str = "polyseed";
/// Upper bound for any single protocol request (submit or page fetch).
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
/// A page fetch answered with 502/503/504 is tried once more after this pause.
const PAGE_RETRY_DELAY: Duration = Duration::from_millis(200);
const MAX_PAGE_ATTEMPTS: u32 = 2;

/// Session defaults sent with every statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrinoSession {
    pub user: String,
    pub catalog: Option<String>,
    pub schema: Option<String>,
}

/// One page of the statement protocol.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementResponse {
    id: String,
    next_uri: Option<String>,
    columns: Option<Vec<WireColumn>>,
    data: Option<Vec<Vec<serde_json::Value>>>,
    stats: Option<WireStats>,
    error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
struct WireColumn {
    name: String,
    #[serde(rename = "type")]
    data_type: String,
}

#[derive(Debug, Deserialize)]
struct WireStats {
    state: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireError {
    message: String,
    error_name: Option<String>,
    error_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfoResponse {
    starting: bool,
}

/// Trino driver implementation
pub struct TrinoDriver {
    client: Client,
    base_url: Url,
    session: TrinoSession,
    password: Option<String>,
    endpoint: String,
}

impl TrinoDriver {
    pub fn new(
        config: &ConnectionConfig,
        catalog: Option<String>,
        schema: Option<String>,
    ) -> EngineResult<Self> {
        let base_url = Self::build_base_url(config)?;
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| EngineError::internal(format!("Failed to build HTTP client: {e}")))?;

        let password = Some(config.password.expose().clone()).filter(|p| !p.is_empty());

        Ok(Self {
            client,
            base_url,
            session: TrinoSession {
                user: config.username.clone(),
                catalog,
                schema,
            },
            password,
            endpoint: config.endpoint(),
        })
    }

    pub fn session(&self) -> &TrinoSession {
        &self.session
    }

    fn build_base_url(config: &ConnectionConfig) -> EngineResult<Url> {
        let scheme = if config.ssl { "https" } else { "http" };
        Url::parse(&format!("{}://{}:{}/", scheme, config.host, config.port))
            .map_err(|e| EngineError::validation(format!("Invalid Trino endpoint: {e}")))
    }

    fn statement_url(&self) -> EngineResult<Url> {
        self.base_url
            .join("v1/statement")
            .map_err(|e| EngineError::internal(e.to_string()))
    }

    /// Applies the session headers (and credentials, when configured).
    fn with_session(&self, request: RequestBuilder) -> RequestBuilder {
        let mut request = request
            .header("X-Trino-User", &self.session.user)
            .header("X-Trino-Source", SOURCE);
        if let Some(catalog) = &self.session.catalog {
            request = request.header("X-Trino-Catalog", catalog);
        }
        if let Some(schema) = &self.session.schema {
            request = request.header("X-Trino-Schema", schema);
        }
        if let Some(password) = &self.password {
            request = request.basic_auth(&self.session.user, Some(password));
        }
        request
    }

    async fn submit(&self, sql: &str) -> EngineResult<StatementResponse> {
        let request = self
            .with_session(self.client.post(self.statement_url()?))
            .body(sql.to_string());
        let response = request
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        Self::read_page(response).await
    }

    async fn advance(&self, next_uri: &str) -> EngineResult<StatementResponse> {
        let mut attempt = 1;
        loop {
            let response = self
                .with_session(self.client.get(next_uri))
                .send()
                .await
                .map_err(|e| self.map_transport_error(e))?;

            if is_transient(response.status()) && attempt < MAX_PAGE_ATTEMPTS {
                tracing::warn!(
                    status = %response.status(),
                    attempt,
                    "Trino: page fetch unavailable, retrying"
                );
                attempt += 1;
                tokio::time::sleep(PAGE_RETRY_DELAY).await;
                continue;
            }
            return Self::read_page(response).await;
        }
    }

    async fn read_page(response: reqwest::Response) -> EngineResult<StatementResponse> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(EngineError::auth_failed(format!(
                "{STORE_NAME} rejected the credentials (HTTP {status})"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::execution_error(format!(
                "{STORE_NAME} returned HTTP {status}: {}",
                body.trim()
            )));
        }

        response
            .json::<StatementResponse>()
            .await
            .map_err(|e| EngineError::execution_error(format!("Malformed statement response: {e}")))
    }

    fn map_transport_error(&self, e: reqwest::Error) -> EngineError {
        if e.is_connect() {
            EngineError::unreachable(STORE_NAME, &self.endpoint, e)
        } else if e.is_timeout() {
            EngineError::Timeout {
                timeout_ms: REQUEST_TIMEOUT.as_millis() as u64,
            }
        } else {
            EngineError::execution_error(e.to_string())
        }
    }

    fn map_query_error(query_id: &str, error: WireError) -> EngineError {
        let message = format!("{} (query {})", error.message, query_id);
        match (error.error_name.as_deref(), error.error_type.as_deref()) {
            (Some("SYNTAX_ERROR"), _) => EngineError::syntax_error(message),
            (Some("PERMISSION_DENIED"), _) => EngineError::auth_failed(message),
            (_, Some("USER_ERROR")) => EngineError::validation(message),
            _ => EngineError::execution_error(message),
        }
    }
}

/// Statuses the protocol asks clients to retry on a `nextUri` fetch.
fn is_transient(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

#[async_trait]
impl DataEngine for TrinoDriver {
    fn driver_id(&self) -> &'static str {
        "trino"
    }

    fn driver_name(&self) -> &'static str {
        STORE_NAME
    }

    async fn ping(&self) -> EngineResult<()> {
        let url = self
            .base_url
            .join("v1/info")
            .map_err(|e| EngineError::internal(e.to_string()))?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !response.status().is_success() {
            return Err(EngineError::connection_failed(format!(
                "{STORE_NAME} at {} answered HTTP {}",
                self.endpoint,
                response.status()
            )));
        }

        let info: InfoResponse = response
            .json()
            .await
            .map_err(|e| EngineError::execution_error(format!("Malformed info response: {e}")))?;
        if info.starting {
            return Err(EngineError::connection_failed(format!(
                "{STORE_NAME} at {} is still starting",
                self.endpoint
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, query), fields(query_len = query.len()))]
    async fn execute(&self, query: &str) -> EngineResult<QueryResult> {
        let start = Instant::now();
        let mut page = self.submit(query).await?;
        let query_id = page.id.clone();
        tracing::debug!(query_id = %query_id, "Trino: statement accepted");

        let mut columns: Option<Vec<ColumnInfo>> = None;
        let mut rows: Vec<Row> = Vec::new();

        loop {
            if let Some(error) = page.error.take() {
                return Err(Self::map_query_error(&query_id, error));
            }

            if columns.is_none() {
                if let Some(wire_columns) = page.columns.take() {
                    columns = Some(
                        wire_columns
                            .into_iter()
                            .map(|c| ColumnInfo {
                                name: c.name,
                                data_type: c.data_type,
                                nullable: true,
                            })
                            .collect(),
                    );
                }
            }

            if let Some(data) = page.data.take() {
                rows.extend(data.into_iter().map(|values| Row {
                    values: values.into_iter().map(Value::from_json).collect(),
                }));
            }

            match page.next_uri.take() {
                Some(next_uri) => page = self.advance(&next_uri).await?,
                None => break,
            }
        }

        let execution_time_ms = start.elapsed().as_micros() as f64 / 1000.0;
        tracing::debug!(
            query_id = %query_id,
            state = page.stats.as_ref().map(|s| s.state.as_str()).unwrap_or("UNKNOWN"),
            rows = rows.len(),
            execution_time_ms,
            "Trino: statement finished"
        );

        Ok(QueryResult {
            columns: columns.unwrap_or_default(),
            rows,
            execution_time_ms,
        })
    }

    async fn close(&self) -> EngineResult<()> {
        // The protocol is stateless between statements.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::Sensitive;

    fn config(ssl: bool) -> ConnectionConfig {
        ConnectionConfig {
            driver: "trino".to_string(),
            host: "localhost".to_string(),
            port: 8080,
            username: "trino".to_string(),
            password: Sensitive::new(String::new()),
            database: None,
            ssl,
            pool_max_connections: None,
            connect_timeout_secs: None,
        }
    }

    #[test]
    fn statement_url_follows_scheme() {
        let driver = TrinoDriver::new(&config(false), None, None).unwrap();
        assert_eq!(
            driver.statement_url().unwrap().as_str(),
            "http://localhost:8080/v1/statement"
        );

        let driver = TrinoDriver::new(&config(true), None, None).unwrap();
        assert_eq!(
            driver.statement_url().unwrap().as_str(),
            "https://localhost:8080/v1/statement"
        );
    }

    #[test]
    fn empty_password_means_no_basic_auth() {
        let driver = TrinoDriver::new(
            &config(false),
            Some("postgresql".into()),
            Some("public".into()),
        )
        .unwrap();
        assert!(driver.password.is_none());
        assert_eq!(driver.session().catalog.as_deref(), Some("postgresql"));
        assert_eq!(driver.session().schema.as_deref(), Some("public"));
    }

    #[test]
    fn parses_a_page_with_data() {
        let json = r#"{
            "id": "20240101_000000_00001_abcde",
            "infoUri": "http://localhost:8080/ui/query.html?20240101_000000_00001_abcde",
            "nextUri": "http://localhost:8080/v1/statement/executing/x/y/1",
            "columns": [{"name": "id", "type": "integer", "typeSignature": {"rawType": "integer"}}],
            "data": [[1], [2]],
            "stats": {"state": "RUNNING", "queued": false}
        }"#;
        let page: StatementResponse = serde_json::from_str(json).unwrap();
        assert_eq!(page.columns.as_ref().unwrap()[0].data_type, "integer");
        assert_eq!(page.data.as_ref().unwrap().len(), 2);
        assert!(page.next_uri.is_some());
        assert_eq!(page.stats.unwrap().state, "RUNNING");
    }

    #[test]
    fn syntax_errors_are_classified() {
        let error = WireError {
            message: "line 1:1: mismatched input 'SELEC'".into(),
            error_name: Some("SYNTAX_ERROR".into()),
            error_type: Some("USER_ERROR".into()),
        };
        let err = TrinoDriver::map_query_error("q1", error);
        assert!(matches!(err, EngineError::SyntaxError { .. }));
        assert!(err.to_string().contains("(query q1)"));
    }

    #[test]
    fn missing_table_is_a_validation_error() {
        let error = WireError {
            message: "Table 'mongodb.testdb.nope' does not exist".into(),
            error_name: Some("TABLE_NOT_FOUND".into()),
            error_type: Some("USER_ERROR".into()),
        };
        let err = TrinoDriver::map_query_error("q2", error);
        assert!(matches!(err, EngineError::ValidationError { .. }));
    }

    #[test]
    fn only_gateway_statuses_are_retried() {
        assert!(is_transient(StatusCode::BAD_GATEWAY));
        assert!(is_transient(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_transient(StatusCode::GATEWAY_TIMEOUT));
        assert!(!is_transient(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!is_transient(StatusCode::NOT_FOUND));
    }
}

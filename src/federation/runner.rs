// SPDX-License-Identifier: Apache-2.0

//! Query Runner
//!
//! Sends the federated queries one after another over a single engine
//! connection and renders the materialized rows.

use std::collections::HashSet;
use std::fmt::Write as _;

use clap::ValueEnum;
use serde::Serialize;
use tracing::instrument;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::traits::DataEngine;
use crate::engine::types::{QueryResult, Value};

use super::parser::validate_catalog_refs;
use super::queries::FederatedQuery;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One title line per query followed by one tuple per row.
    #[default]
    Text,
    /// A JSON array of `{title, sql, columns, rows}` objects.
    Json,
}

/// A query together with everything it returned.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub title: String,
    pub sql: String,
    pub result: QueryResult,
}

/// Validates all queries, then executes them in order.
///
/// Nothing is sent to the engine unless every query passes the catalog
/// check. The first failing query aborts the run.
#[instrument(skip_all, fields(engine = engine.driver_id(), queries = queries.len()))]
pub async fn run_queries(
    engine: &dyn DataEngine,
    queries: &[FederatedQuery],
    known_catalogs: &HashSet<String>,
) -> EngineResult<Vec<QueryOutcome>> {
    for query in queries {
        validate_catalog_refs(&query.sql, known_catalogs)?;
    }

    let mut outcomes = Vec::with_capacity(queries.len());
    for query in queries {
        tracing::info!(title = %query.title, "Running federated query");
        let result = engine.execute(&query.sql).await?;
        tracing::info!(
            title = %query.title,
            rows = result.rows.len(),
            execution_time_ms = result.execution_time_ms,
            "Federated query finished"
        );
        outcomes.push(QueryOutcome {
            title: query.title.clone(),
            sql: query.sql.clone(),
            result,
        });
    }
    Ok(outcomes)
}

pub fn render(outcomes: &[QueryOutcome], format: OutputFormat) -> EngineResult<String> {
    match format {
        OutputFormat::Text => Ok(render_text(outcomes)),
        OutputFormat::Json => render_json(outcomes),
    }
}

pub fn render_text(outcomes: &[QueryOutcome]) -> String {
    let mut out = String::new();
    for (i, outcome) in outcomes.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "{}:", outcome.title);
        for row in &outcome.result.rows {
            let _ = writeln!(out, "{row}");
        }
    }
    out
}

#[derive(Serialize)]
struct JsonOutcome<'a> {
    title: &'a str,
    sql: &'a str,
    columns: Vec<&'a str>,
    rows: Vec<&'a [Value]>,
}

pub fn render_json(outcomes: &[QueryOutcome]) -> EngineResult<String> {
    let payload: Vec<JsonOutcome<'_>> = outcomes
        .iter()
        .map(|o| JsonOutcome {
            title: &o.title,
            sql: &o.sql,
            columns: o.result.columns.iter().map(|c| c.name.as_str()).collect(),
            rows: o.result.rows.iter().map(|r| r.values.as_slice()).collect(),
        })
        .collect();

    serde_json::to_string_pretty(&payload)
        .map_err(|e| EngineError::internal(format!("Failed to render JSON output: {e}")))
}

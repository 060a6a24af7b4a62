//! Trino statement protocol tests against an in-process fake engine.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value as JsonValue};

use polyseed_lib::engine::drivers::trino::TrinoDriver;
use polyseed_lib::engine::{ConnectionConfig, DataEngine, EngineError, Value};
use polyseed_lib::federation::{
    render, run_queries, standard_queries, CatalogLayout, JoinStyle, OutputFormat,
};
use polyseed_lib::observability::Sensitive;

#[derive(Debug, Clone)]
struct Submitted {
    user: Option<String>,
    catalog: Option<String>,
    schema: Option<String>,
    source: Option<String>,
    sql: String,
}

#[derive(Clone)]
struct FakeTrino {
    base: String,
    submitted: Arc<Mutex<Vec<Submitted>>>,
    starting: bool,
    /// First-page fetches still to be answered with 503.
    outages: Arc<AtomicUsize>,
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn submit(State(fake): State<FakeTrino>, headers: HeaderMap, sql: String) -> Json<JsonValue> {
    fake.submitted.lock().unwrap().push(Submitted {
        user: header(&headers, "x-trino-user"),
        catalog: header(&headers, "x-trino-catalog"),
        schema: header(&headers, "x-trino-schema"),
        source: header(&headers, "x-trino-source"),
        sql: sql.clone(),
    });

    if sql.contains("SELEC ") {
        return Json(json!({
            "id": "q_syntax",
            "stats": {"state": "FAILED"},
            "error": {
                "message": "line 1:1: mismatched input 'SELEC'",
                "errorCode": 1,
                "errorName": "SYNTAX_ERROR",
                "errorType": "USER_ERROR"
            }
        }));
    }

    let id = if sql.contains(".nope") { "q_missing" } else { "q_ok" };
    Json(json!({
        "id": id,
        "nextUri": format!("{}/v1/statement/executing/{}/1", fake.base, id),
        "stats": {"state": "QUEUED"}
    }))
}

async fn next_page(
    State(fake): State<FakeTrino>,
    Path((id, page)): Path<(String, u32)>,
) -> Response {
    let outage = page == 1
        && fake
            .outages
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
    if outage {
        return (StatusCode::SERVICE_UNAVAILABLE, "coordinator restarting").into_response();
    }
    page_body(&fake, id, page).into_response()
}

fn page_body(fake: &FakeTrino, id: String, page: u32) -> Json<JsonValue> {
    if id == "q_missing" {
        return Json(json!({
            "id": id,
            "stats": {"state": "FAILED"},
            "error": {
                "message": "Table 'mongodb.testdb.nope' does not exist",
                "errorCode": 46,
                "errorName": "TABLE_NOT_FOUND",
                "errorType": "USER_ERROR"
            }
        }));
    }

    let columns = json!([
        {"name": "id", "type": "integer"},
        {"name": "name", "type": "varchar(100)"},
        {"name": "email", "type": "varchar(100)"}
    ]);

    match page {
        1 => Json(json!({
            "id": id,
            "nextUri": format!("{}/v1/statement/executing/{}/2", fake.base, id),
            "columns": columns,
            "data": [[1, "John Doe", "john@example.com"]],
            "stats": {"state": "RUNNING"}
        })),
        2 => Json(json!({
            "id": id,
            "nextUri": format!("{}/v1/statement/executing/{}/3", fake.base, id),
            "columns": columns,
            "data": [[2, "Jane Smith", null]],
            "stats": {"state": "RUNNING"}
        })),
        _ => Json(json!({
            "id": id,
            "columns": columns,
            "stats": {"state": "FINISHED"}
        })),
    }
}

async fn info(State(fake): State<FakeTrino>) -> Json<JsonValue> {
    Json(json!({
        "nodeVersion": {"version": "435"},
        "environment": "test",
        "coordinator": true,
        "starting": fake.starting
    }))
}

async fn spawn_fake(starting: bool) -> (SocketAddr, Arc<Mutex<Vec<Submitted>>>) {
    spawn_fake_with_outages(starting, 0).await
}

async fn spawn_fake_with_outages(
    starting: bool,
    outages: usize,
) -> (SocketAddr, Arc<Mutex<Vec<Submitted>>>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let submitted = Arc::new(Mutex::new(Vec::new()));

    let fake = FakeTrino {
        base: format!("http://{addr}"),
        submitted: Arc::clone(&submitted),
        starting,
        outages: Arc::new(AtomicUsize::new(outages)),
    };
    let app = Router::new()
        .route("/v1/statement", post(submit))
        .route("/v1/statement/executing/{id}/{page}", get(next_page))
        .route("/v1/info", get(info))
        .with_state(fake);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, submitted)
}

fn trino_config(addr: SocketAddr) -> ConnectionConfig {
    ConnectionConfig {
        driver: "trino".to_string(),
        host: addr.ip().to_string(),
        port: addr.port(),
        username: "trino".to_string(),
        password: Sensitive::new(String::new()),
        database: None,
        ssl: false,
        pool_max_connections: None,
        connect_timeout_secs: Some(2),
    }
}

fn driver(addr: SocketAddr) -> TrinoDriver {
    TrinoDriver::new(
        &trino_config(addr),
        Some("postgresql".to_string()),
        Some("public".to_string()),
    )
    .unwrap()
}

#[tokio::test]
async fn follows_next_uri_until_the_query_finishes() {
    let (addr, submitted) = spawn_fake(false).await;
    let driver = driver(addr);

    let result = driver
        .execute("SELECT * FROM postgresql.public.customers")
        .await
        .unwrap();

    let names: Vec<&str> = result.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "name", "email"]);
    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.rows[0].values[0], Value::Int(1));
    assert_eq!(result.rows[0].values[1], Value::Text("John Doe".into()));
    assert_eq!(result.rows[1].values[2], Value::Null);
    assert_eq!(result.rows[0].to_string(), "(1, 'John Doe', 'john@example.com')");

    let submitted = submitted.lock().unwrap();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].sql, "SELECT * FROM postgresql.public.customers");
    assert_eq!(submitted[0].user.as_deref(), Some("trino"));
    assert_eq!(submitted[0].catalog.as_deref(), Some("postgresql"));
    assert_eq!(submitted[0].schema.as_deref(), Some("public"));
    assert_eq!(submitted[0].source.as_deref(), Some("polyseed"));
}

#[tokio::test]
async fn error_on_a_later_page_aborts_the_query() {
    let (addr, _) = spawn_fake(false).await;
    let err = driver(addr)
        .execute("SELECT * FROM mongodb.testdb.nope")
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::ValidationError { .. }));
    assert!(err.to_string().contains("does not exist"));
}

#[tokio::test]
async fn one_unavailable_page_is_retried() {
    let (addr, _) = spawn_fake_with_outages(false, 1).await;
    let result = driver(addr)
        .execute("SELECT * FROM postgresql.public.customers")
        .await
        .unwrap();
    assert_eq!(result.rows.len(), 2);
}

#[tokio::test]
async fn repeated_unavailable_page_fails_the_query() {
    let (addr, _) = spawn_fake_with_outages(false, 2).await;
    let err = driver(addr)
        .execute("SELECT * FROM postgresql.public.customers")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExecutionError { .. }));
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn syntax_error_is_reported_as_such() {
    let (addr, _) = spawn_fake(false).await;
    let err = driver(addr).execute("SELEC 1").await.unwrap_err();
    assert!(matches!(err, EngineError::SyntaxError { .. }));
}

#[tokio::test]
async fn ping_checks_that_the_engine_has_started() {
    let (addr, _) = spawn_fake(false).await;
    driver(addr).ping().await.unwrap();

    let (addr, _) = spawn_fake(true).await;
    let err = driver(addr).ping().await.unwrap_err();
    assert!(matches!(err, EngineError::ConnectionFailed { .. }));
    assert!(err.to_string().contains("still starting"));
}

#[tokio::test]
async fn unreachable_engine_is_a_connection_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = driver(addr)
        .execute("SELECT * FROM postgresql.public.customers")
        .await
        .unwrap_err();
    assert!(err.is_unreachable());
    assert!(err.to_string().contains("cannot reach Trino"));
}

#[tokio::test]
async fn runner_sends_the_three_standard_queries_in_order() {
    let (addr, submitted) = spawn_fake(false).await;
    let driver = driver(addr);
    let layout = CatalogLayout::default();
    let queries = standard_queries(&layout, JoinStyle::Implicit);

    let outcomes = run_queries(&driver, &queries, &layout.known_catalogs())
        .await
        .unwrap();
    assert_eq!(outcomes.len(), 3);

    let sent: Vec<String> = submitted
        .lock()
        .unwrap()
        .iter()
        .map(|s| s.sql.clone())
        .collect();
    let expected: Vec<String> = queries.iter().map(|q| q.sql.clone()).collect();
    assert_eq!(sent, expected);

    let text = render(&outcomes, OutputFormat::Text).unwrap();
    assert!(text.starts_with(
        "PostgreSQL Data (Customers):\n(1, 'John Doe', 'john@example.com')\n"
    ));
    assert!(text.contains("\nMongoDB Data (Users):\n"));
    assert!(text.contains("\nCross-Database Query (Product Reviews):\n"));
}

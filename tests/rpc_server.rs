//! RPC Server Tests
//!
//! Drives the router in-process:
//! - Every call answers with the documented status
//! - Byte fields travel as base64
//! - Streams arrive as one JSON object per line

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use docindex::adapter::IndexStore;
use docindex::http_server::{HttpServer, HttpServerConfig};

// =============================================================================
// Helper Functions
// =============================================================================

fn router() -> Router {
    HttpServer::new(IndexStore::in_memory(), HttpServerConfig::default()).router()
}

async fn post(app: &Router, path: &str, body: Value) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn get(app: &Router, path: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(path).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn lines(body: &[u8]) -> Vec<Value> {
    std::str::from_utf8(body)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

// base64 of "b", "ba", "c", "v1", "v2"
const B: &str = "Yg==";
const BA: &str = "YmE=";
const C: &str = "Yw==";
const V1: &str = "djE=";
const V2: &str = "djI=";

async fn seeded() -> Router {
    let app = router();
    let (status, _) = post(&app, "/rpc/create_table", json!({"name": "t"})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post(
        &app,
        "/rpc/write_index",
        json!({"entries": [
            {"table": "t", "hash": "h", "range": B, "value": V1},
            {"table": "t", "hash": "h", "range": BA, "value": V2},
            {"table": "t", "hash": "h", "range": C, "value": V1},
        ]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    app
}

// =============================================================================
// Observability Tests
// =============================================================================

#[tokio::test]
async fn test_health() {
    let (status, body) = get(&router(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_metrics_reflect_writes() {
    let app = seeded().await;
    let (status, body) = get(&app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["index_inserts"], 3);
}

// =============================================================================
// Index Call Tests
// =============================================================================

#[tokio::test]
async fn test_query_prefix_stream() {
    let app = seeded().await;
    let (status, body) = post(
        &app,
        "/rpc/query_index",
        json!({"table": "t", "hash": "h", "range_prefix": B}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let pages = lines(&body);
    assert_eq!(pages.len(), 1);
    let rows = pages[0]["rows"].as_array().unwrap();
    let ranges: Vec<&str> = rows.iter().map(|r| r["range"].as_str().unwrap()).collect();
    assert_eq!(ranges, vec![B, BA]);
}

#[tokio::test]
async fn test_query_value_equal() {
    let app = seeded().await;
    let (_, body) = post(
        &app,
        "/rpc/query_index",
        json!({"table": "t", "hash": "h", "value_equal": V2}),
    )
    .await;

    let pages = lines(&body);
    assert_eq!(pages[0]["rows"][0]["range"], BA);
}

#[tokio::test]
async fn test_query_with_no_match_is_empty_body() {
    let app = seeded().await;
    let (status, body) = post(&app, "/rpc/query_index", json!({"table": "t", "hash": "none"})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_delete_index() {
    let app = seeded().await;
    let (status, _) = post(
        &app,
        "/rpc/delete_index",
        json!({"entries": [{"table": "t", "hash": "h", "range": C}]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = post(
        &app,
        "/rpc/query_index",
        json!({"table": "t", "hash": "h", "range_start": C}),
    )
    .await;
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_bad_base64_is_400() {
    let app = router();
    let (status, body) = post(
        &app,
        "/rpc/write_index",
        json!({"entries": [{"table": "t", "hash": "h", "range": "%%%", "value": V1}]}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["error"]["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_missing_table_is_400() {
    let app = router();
    let (status, _) = post(
        &app,
        "/rpc/write_index",
        json!({"entries": [{"table": "", "hash": "h", "range": B, "value": V1}]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_body_is_400() {
    let app = router();
    let (status, _) = post(&app, "/rpc/query_index", json!({"hash": "h"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Chunk Call Tests
// =============================================================================

#[tokio::test]
async fn test_put_and_get_chunks() {
    let app = router();
    let (status, _) = post(
        &app,
        "/rpc/put_chunks",
        json!({"chunks": [{"table": "c", "key": "k1", "encoded": V1}]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(
        &app,
        "/rpc/get_chunks",
        json!({"chunks": [{"table": "c", "key": "k1"}, {"table": "c", "key": "k9"}]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let pages = lines(&body);
    assert_eq!(pages[0]["chunks"], json!([{"key": "k1", "encoded": V1}]));
}

#[tokio::test]
async fn test_delete_chunks_is_501() {
    let (status, body) = post(&router(), "/rpc/delete_chunks", json!({"key": "k1"})).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["error"]["message"], "not supported");
}

// =============================================================================
// Table Call Tests
// =============================================================================

#[tokio::test]
async fn test_table_lifecycle() {
    let app = router();
    for _ in 0..2 {
        let (status, _) = post(&app, "/rpc/create_table", json!({"name": "t1"})).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = post(&app, "/rpc/list_tables", json!({})).await;
    let listed: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(listed["tables"], json!(["t1"]));

    let (_, body) = post(&app, "/rpc/describe_table", json!({"name": "t1"})).await;
    let desc: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(desc, json!({"name": "t1", "is_active": true}));

    let (status, _) = post(&app, "/rpc/update_table", json!({"anything": [1, 2]})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post(&app, "/rpc/delete_table", json!({"name": "t1"})).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = post(&app, "/rpc/list_tables", json!({})).await;
    let listed: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(listed["tables"], json!([]));
}

#[tokio::test]
async fn test_stop_acknowledges() {
    let (status, body) = post(&router(), "/rpc/stop", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let ack: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(ack["ok"], true);
}

#[tokio::test]
async fn test_body_limit() {
    let config = HttpServerConfig {
        max_request_bytes: 64,
        ..Default::default()
    };
    let app = HttpServer::new(IndexStore::in_memory(), config).router();
    let value = "A".repeat(200);
    let (status, _) = post(
        &app,
        "/rpc/put_chunks",
        json!({"chunks": [{"table": "c", "key": "k", "encoded": value}]}),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

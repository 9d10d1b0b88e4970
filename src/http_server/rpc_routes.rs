//! RPC HTTP Routes
//!
//! One POST route per call. Bodies are JSON; byte fields are standard
//! base64. Query and chunk fetches answer with NDJSON, one page per line.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures_util::stream;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::adapter::{AdapterError, IndexStore, PageStream};
use crate::document::{Chunk, ChunkRef, IndexDelete, IndexEntry, IndexQuery, Row};
use crate::observability::{log_event, Event};

// ==================
// Shared State
// ==================

/// State shared across RPC handlers
pub struct RpcState {
    pub store: IndexStore,
}

impl RpcState {
    pub fn new(store: IndexStore) -> Self {
        Self { store }
    }
}

// ==================
// Request/Response Types
// ==================

#[derive(Debug, Deserialize)]
pub struct WireIndexEntry {
    pub table: String,
    pub hash: String,
    #[serde(default)]
    pub range: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct WriteIndexRequest {
    pub entries: Vec<WireIndexEntry>,
}

#[derive(Debug, Deserialize)]
pub struct QueryIndexRequest {
    pub table: String,
    pub hash: String,
    #[serde(default)]
    pub range_start: String,
    #[serde(default)]
    pub range_prefix: String,
    #[serde(default)]
    pub value_equal: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireIndexDelete {
    pub table: String,
    pub hash: String,
    #[serde(default)]
    pub range: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteIndexRequest {
    pub entries: Vec<WireIndexDelete>,
}

#[derive(Debug, Deserialize)]
pub struct WireChunk {
    pub table: String,
    pub key: String,
    pub encoded: String,
}

#[derive(Debug, Deserialize)]
pub struct PutChunksRequest {
    pub chunks: Vec<WireChunk>,
}

#[derive(Debug, Deserialize)]
pub struct WireChunkRef {
    pub table: String,
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct GetChunksRequest {
    pub chunks: Vec<WireChunkRef>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteChunksRequest {
    #[serde(default)]
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct TableRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub ok: bool,
}

impl AckResponse {
    fn ok() -> Json<Self> {
        Json(Self { ok: true })
    }
}

#[derive(Debug, Serialize)]
pub struct ListTablesResponse {
    pub tables: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DescribeTableResponse {
    pub name: String,
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct WireRow {
    pub range: String,
    pub value: String,
}

impl From<Row> for WireRow {
    fn from(row: Row) -> Self {
        Self {
            range: STANDARD.encode(row.range),
            value: STANDARD.encode(row.value),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WireFetchedChunk {
    pub key: String,
    pub encoded: String,
}

impl From<Chunk> for WireFetchedChunk {
    fn from(chunk: Chunk) -> Self {
        Self {
            key: chunk.key,
            encoded: STANDARD.encode(chunk.encoded),
        }
    }
}

#[derive(Debug, Serialize)]
struct RowsPage {
    rows: Vec<WireRow>,
}

#[derive(Debug, Serialize)]
struct ChunksPage {
    chunks: Vec<WireFetchedChunk>,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

impl From<&AdapterError> for ErrorResponse {
    fn from(err: &AdapterError) -> Self {
        Self {
            error: ErrorDetail {
                code: err.code().to_string(),
                message: err.to_string(),
            },
        }
    }
}

/// Adapter error rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub AdapterError);

impl From<AdapterError> for ApiError {
    fn from(err: AdapterError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}

type RpcResult<T> = Result<T, ApiError>;

// ==================
// RPC Routes
// ==================

/// Create RPC routes
pub fn rpc_routes(state: Arc<RpcState>) -> Router {
    Router::new()
        // Index
        .route("/write_index", post(write_index_handler))
        .route("/query_index", post(query_index_handler))
        .route("/delete_index", post(delete_index_handler))
        // Chunks
        .route("/put_chunks", post(put_chunks_handler))
        .route("/get_chunks", post(get_chunks_handler))
        .route("/delete_chunks", post(delete_chunks_handler))
        // Tables
        .route("/list_tables", post(list_tables_handler))
        .route("/create_table", post(create_table_handler))
        .route("/delete_table", post(delete_table_handler))
        .route("/describe_table", post(describe_table_handler))
        .route("/update_table", post(update_table_handler))
        // Lifecycle
        .route("/stop", post(stop_handler))
        .with_state(state)
}

// ==================
// Helper Functions
// ==================

fn parse<T: DeserializeOwned>(body: &Bytes) -> RpcResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError(AdapterError::InvalidRequest(format!("malformed body: {}", e))))
}

fn decode_bytes(field: &'static str, encoded: &str) -> RpcResult<Vec<u8>> {
    STANDARD
        .decode(encoded)
        .map_err(|e| ApiError(AdapterError::InvalidRequest(format!("{}: {}", field, e))))
}

fn json_line<P: Serialize>(payload: &P) -> Bytes {
    match serde_json::to_vec(payload) {
        Ok(mut line) => {
            line.push(b'\n');
            Bytes::from(line)
        }
        Err(_) => Bytes::from_static(
            b"{\"error\":{\"code\":\"ENCODE_FAILURE\",\"message\":\"page could not be encoded\"}}\n",
        ),
    }
}

/// Stream pages as NDJSON. A failure becomes the final line.
fn ndjson<T, P, F>(pages: PageStream<T>, to_page: F) -> Response
where
    T: Send + 'static,
    P: Serialize,
    F: Fn(Vec<T>) -> P + Send + 'static,
{
    let lines = stream::unfold(Some((pages, to_page)), |state| async move {
        let (mut pages, to_page) = state?;
        match pages.next_page().await {
            None => None,
            Some(Ok(page)) => {
                let line = json_line(&to_page(page));
                Some((Ok::<_, Infallible>(line), Some((pages, to_page))))
            }
            Some(Err(e)) => Some((Ok(json_line(&ErrorResponse::from(&e))), None)),
        }
    });

    (
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(lines),
    )
        .into_response()
}

// ==================
// Index Handlers
// ==================

async fn write_index_handler(
    State(state): State<Arc<RpcState>>,
    body: Bytes,
) -> RpcResult<Json<AckResponse>> {
    let request: WriteIndexRequest = parse(&body)?;
    let mut entries = Vec::with_capacity(request.entries.len());
    for entry in request.entries {
        entries.push(IndexEntry::new(
            entry.table,
            entry.hash,
            decode_bytes("range", &entry.range)?,
            decode_bytes("value", &entry.value)?,
        ));
    }
    state.store.write_index(entries).await?;
    Ok(AckResponse::ok())
}

async fn query_index_handler(
    State(state): State<Arc<RpcState>>,
    body: Bytes,
) -> RpcResult<Response> {
    let request: QueryIndexRequest = parse(&body)?;
    let mut query = IndexQuery::new(request.table, request.hash)
        .with_range_start(decode_bytes("range_start", &request.range_start)?)
        .with_range_prefix(decode_bytes("range_prefix", &request.range_prefix)?);
    if let Some(value) = &request.value_equal {
        query = query.with_value_equal(decode_bytes("value_equal", value)?);
    }

    let pages = state.store.query_index(query).await?;
    Ok(ndjson(pages, |rows: Vec<Row>| RowsPage {
        rows: rows.into_iter().map(WireRow::from).collect(),
    }))
}

async fn delete_index_handler(
    State(state): State<Arc<RpcState>>,
    body: Bytes,
) -> RpcResult<Json<AckResponse>> {
    let request: DeleteIndexRequest = parse(&body)?;
    let mut entries = Vec::with_capacity(request.entries.len());
    for entry in request.entries {
        entries.push(IndexDelete::new(
            entry.table,
            entry.hash,
            decode_bytes("range", &entry.range)?,
        ));
    }
    state.store.delete_index(entries).await?;
    Ok(AckResponse::ok())
}

// ==================
// Chunk Handlers
// ==================

async fn put_chunks_handler(
    State(state): State<Arc<RpcState>>,
    body: Bytes,
) -> RpcResult<Json<AckResponse>> {
    let request: PutChunksRequest = parse(&body)?;
    let mut chunks = Vec::with_capacity(request.chunks.len());
    for chunk in request.chunks {
        let encoded = decode_bytes("encoded", &chunk.encoded)?;
        chunks.push(Chunk::new(chunk.table, chunk.key, encoded));
    }
    state.store.put_chunks(chunks).await?;
    Ok(AckResponse::ok())
}

async fn get_chunks_handler(
    State(state): State<Arc<RpcState>>,
    body: Bytes,
) -> RpcResult<Response> {
    let request: GetChunksRequest = parse(&body)?;
    let refs = request
        .chunks
        .into_iter()
        .map(|c| ChunkRef::new(c.table, c.key))
        .collect();

    let pages = state.store.get_chunks(refs).await?;
    Ok(ndjson(pages, |chunks: Vec<Chunk>| ChunksPage {
        chunks: chunks.into_iter().map(WireFetchedChunk::from).collect(),
    }))
}

async fn delete_chunks_handler(
    State(state): State<Arc<RpcState>>,
    body: Bytes,
) -> RpcResult<Json<AckResponse>> {
    // The body is not required to fail the call
    let request: DeleteChunksRequest = serde_json::from_slice(&body).unwrap_or_default();
    state.store.delete_chunks(&request.key)?;
    Ok(AckResponse::ok())
}

// ==================
// Table Handlers
// ==================

async fn list_tables_handler(
    State(state): State<Arc<RpcState>>,
) -> RpcResult<Json<ListTablesResponse>> {
    let tables = state.store.list_tables().await?;
    Ok(Json(ListTablesResponse { tables }))
}

async fn create_table_handler(
    State(state): State<Arc<RpcState>>,
    body: Bytes,
) -> RpcResult<Json<AckResponse>> {
    let request: TableRequest = parse(&body)?;
    state.store.create_table(&request.name).await?;
    Ok(AckResponse::ok())
}

async fn delete_table_handler(
    State(state): State<Arc<RpcState>>,
    body: Bytes,
) -> RpcResult<Json<AckResponse>> {
    let request: TableRequest = parse(&body)?;
    state.store.delete_table(&request.name).await?;
    Ok(AckResponse::ok())
}

async fn describe_table_handler(
    State(state): State<Arc<RpcState>>,
    body: Bytes,
) -> RpcResult<Json<DescribeTableResponse>> {
    let request: TableRequest = parse(&body)?;
    let desc = state.store.describe_table(&request.name);
    Ok(Json(DescribeTableResponse {
        name: desc.name,
        is_active: desc.is_active,
    }))
}

/// Any body is accepted
async fn update_table_handler(
    State(state): State<Arc<RpcState>>,
    body: Bytes,
) -> Json<AckResponse> {
    let name = serde_json::from_slice::<TableRequest>(&body)
        .map(|r| r.name)
        .unwrap_or_default();
    state.store.update_table(&name);
    AckResponse::ok()
}

// ==================
// Lifecycle Handlers
// ==================

async fn stop_handler() -> Json<AckResponse> {
    log_event(Event::StopRequested);
    AckResponse::ok()
}

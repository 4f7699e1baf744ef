//! Mock image generation API for integration tests
//!
//! Serves the generation and model listing endpoints plus a few image files,
//! counting every call so tests can assert how often the upstream was hit.

use std::{
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing,
};
use bytes::Bytes;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

/// Size of each chunk of the large download
pub const CHUNK_SIZE: usize = 16 * 1024;
/// Number of chunks in the large download
pub const CHUNK_COUNT: usize = 64;
/// First chunk of the stalled download
pub const STALLED_HEAD: &[u8] = b"first";
/// Pause between the two chunks of the stalled download
pub const STALL: Duration = Duration::from_secs(3);

/// How the mock answers
#[derive(Debug, Clone, Default)]
pub struct Behavior {
    /// Fail generation with this status and body
    pub generation_failure: Option<(u16, String)>,
    /// Fail the model listing with this status
    pub models_failure: Option<u16>,
    /// Delay before answering generation requests
    pub generation_delay: Option<Duration>,
}

/// Mock upstream that returns predictable responses
pub struct MockUpstream {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

struct MockState {
    behavior: Behavior,
    base: String,
    generation_count: AtomicU32,
    models_count: AtomicU32,
    download_count: AtomicU32,
    last_generation: Mutex<Option<serde_json::Value>>,
    last_authorization: Mutex<Option<String>>,
}

impl MockUpstream {
    /// Start a mock that answers every call successfully
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_with(Behavior::default()).await
    }

    /// Start a mock generation endpoint that fails with `status` and `body`
    pub async fn start_failing(status: u16, body: &str) -> anyhow::Result<Self> {
        Self::start_with(Behavior {
            generation_failure: Some((status, body.to_owned())),
            ..Behavior::default()
        })
        .await
    }

    pub async fn start_with(behavior: Behavior) -> anyhow::Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let state = Arc::new(MockState {
            behavior,
            base: format!("http://{addr}"),
            generation_count: AtomicU32::new(0),
            models_count: AtomicU32::new(0),
            download_count: AtomicU32::new(0),
            last_generation: Mutex::new(None),
            last_authorization: Mutex::new(None),
        });

        let app = Router::new()
            .route("/v1/images/generations", routing::post(handle_generation))
            .route("/v1/models", routing::get(handle_models))
            .route("/files/large.webp", routing::get(handle_large_file))
            .route("/files/plain", routing::get(handle_plain_file))
            .route("/files/stalled.png", routing::get(handle_stalled_file))
            .with_state(Arc::clone(&state));

        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL for configuring the mock as the upstream
    ///
    /// Includes `/v1` since the provider appends paths like `/images/generations`
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Absolute URL of a file served by the mock
    pub fn file_url(&self, name: &str) -> String {
        format!("http://{}/files/{name}", self.addr)
    }

    pub fn generation_count(&self) -> u32 {
        self.state.generation_count.load(Ordering::Relaxed)
    }

    pub fn models_count(&self) -> u32 {
        self.state.models_count.load(Ordering::Relaxed)
    }

    pub fn download_count(&self) -> u32 {
        self.state.download_count.load(Ordering::Relaxed)
    }

    /// Body of the last generation request received
    pub fn last_generation(&self) -> Option<serde_json::Value> {
        self.state.last_generation.lock().unwrap().clone()
    }

    /// `Authorization` header of the last request received
    pub fn last_authorization(&self) -> Option<String> {
        self.state.last_authorization.lock().unwrap().clone()
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Address on which nothing is listening
pub async fn closed_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/v1")
}

fn record_authorization(state: &MockState, headers: &HeaderMap) {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    *state.last_authorization.lock().unwrap() = value;
}

async fn handle_generation(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    state.generation_count.fetch_add(1, Ordering::Relaxed);
    record_authorization(&state, &headers);
    *state.last_generation.lock().unwrap() = Some(body.clone());

    if let Some(delay) = state.behavior.generation_delay {
        tokio::time::sleep(delay).await;
    }

    if let Some((status, ref failure)) = state.behavior.generation_failure {
        let status = StatusCode::from_u16(status).unwrap();
        return (status, [(header::CONTENT_TYPE, "application/json")], failure.clone()).into_response();
    }

    let count = body["num_images"].as_u64().unwrap_or(1);
    let images: Vec<String> = (0..count)
        .map(|i| format!("{}/files/generated-{i}.png", state.base))
        .collect();

    Json(serde_json::json!({ "images": images, "seed": 42 })).into_response()
}

async fn handle_models(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.models_count.fetch_add(1, Ordering::Relaxed);
    record_authorization(&state, &headers);

    if let Some(status) = state.behavior.models_failure {
        return StatusCode::from_u16(status).unwrap().into_response();
    }

    Json(serde_json::json!({
        "object": "list",
        "data": [
            { "id": "img3", "object": "model", "owned_by": "mock" },
            { "id": "flux-schnell", "object": "model", "owned_by": "mock" },
            { "id": "brand-new", "object": "model", "owned_by": "mock" }
        ]
    }))
    .into_response()
}

async fn handle_large_file(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.download_count.fetch_add(1, Ordering::Relaxed);
    record_authorization(&state, &headers);

    let chunks = (0..CHUNK_COUNT).map(|i| {
        #[allow(clippy::cast_possible_truncation)]
        let byte = (i % 251) as u8;
        Ok::<_, std::io::Error>(Bytes::from(vec![byte; CHUNK_SIZE]))
    });

    Response::builder()
        .header(header::CONTENT_TYPE, "image/webp")
        .body(Body::from_stream(futures_util::stream::iter(chunks)))
        .unwrap()
}

async fn handle_plain_file(State(state): State<Arc<MockState>>) -> Response {
    state.download_count.fetch_add(1, Ordering::Relaxed);

    Response::builder()
        .body(Body::from("raw bytes"))
        .unwrap()
}

/// Sends one chunk, then holds the connection open before finishing
async fn handle_stalled_file(State(state): State<Arc<MockState>>) -> Response {
    state.download_count.fetch_add(1, Ordering::Relaxed);

    let head = futures_util::stream::once(async { Ok::<_, std::io::Error>(Bytes::from_static(STALLED_HEAD)) });
    let tail = futures_util::stream::once(async {
        tokio::time::sleep(STALL).await;
        Ok::<_, std::io::Error>(Bytes::from_static(b"rest"))
    });

    Response::builder()
        .header(header::CONTENT_TYPE, "image/png")
        .body(Body::from_stream(head.chain(tail)))
        .unwrap()
}

//! Mock upstream for integration tests
//!
//! Serves the Gemini `generateContent` endpoint, the `OpenAI` image
//! endpoints and a handful of static assets used as reference, input and
//! mask images.

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// How the mock answers generation requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Current response format carrying a PNG
    Image,
    /// Older Gemini format (`inline_data`/`mime_type`) carrying a JPEG
    LegacyImage,
    /// Success status without any image
    NoImage,
    /// `OpenAI` style answer pointing at a downloadable URL
    ImageUrl,
    /// Non-success status with a JSON error payload
    Error(u16),
}

/// Mock upstream that returns predictable responses
pub struct MockUpstream {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

struct MockState {
    behavior: Behavior,
    addr: Mutex<Option<SocketAddr>>,
    gemini_count: AtomicU32,
    openai_generation_count: AtomicU32,
    openai_edit_count: AtomicU32,
    asset_count: AtomicU32,
    last_body: Mutex<Option<Bytes>>,
    last_headers: Mutex<Option<HeaderMap>>,
}

impl MockUpstream {
    /// Start a mock that answers with an image
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_with(Behavior::Image).await
    }

    /// Start a mock with the given behavior
    pub async fn start_with(behavior: Behavior) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            behavior,
            addr: Mutex::new(None),
            gemini_count: AtomicU32::new(0),
            openai_generation_count: AtomicU32::new(0),
            openai_edit_count: AtomicU32::new(0),
            asset_count: AtomicU32::new(0),
            last_body: Mutex::new(None),
            last_headers: Mutex::new(None),
        });

        let app = Router::new()
            .route("/v1beta/models/{action}", routing::post(handle_gemini))
            .route("/v1/images/generations", routing::post(handle_openai_generation))
            .route("/v1/images/edits", routing::post(handle_openai_edit))
            .route("/assets/{name}", routing::get(handle_asset))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        *state.addr.lock().expect("lock") = Some(addr);

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

    /// Base URL for configuring the mock as a Gemini provider
    pub fn gemini_base_url(&self) -> String {
        format!("http://{}/v1beta", self.addr)
    }

    /// Base URL for configuring the mock as an `OpenAI` provider
    pub fn openai_base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// URL of a static asset (`red.png`, `photo.jpg`, `blob`, `mask.png`, `page.html`)
    pub fn asset_url(&self, name: &str) -> String {
        format!("http://{}/assets/{name}", self.addr)
    }

    /// Number of generation and edit calls of any provider
    pub fn upstream_count(&self) -> u32 {
        self.gemini_count() + self.openai_generation_count() + self.openai_edit_count()
    }

    pub fn gemini_count(&self) -> u32 {
        self.state.gemini_count.load(Ordering::Relaxed)
    }

    pub fn openai_generation_count(&self) -> u32 {
        self.state.openai_generation_count.load(Ordering::Relaxed)
    }

    pub fn openai_edit_count(&self) -> u32 {
        self.state.openai_edit_count.load(Ordering::Relaxed)
    }

    /// Number of asset downloads
    pub fn asset_count(&self) -> u32 {
        self.state.asset_count.load(Ordering::Relaxed)
    }

    /// Body of the most recent generation or edit call
    pub fn last_body(&self) -> Bytes {
        self.state.last_body.lock().expect("lock").clone().unwrap_or_default()
    }

    /// Body of the most recent call parsed as JSON
    pub fn last_json(&self) -> Value {
        serde_json::from_slice(&self.last_body()).expect("last upstream body is JSON")
    }

    /// Bytes of one file field of the most recent multipart call
    pub fn last_upload(&self, field: &str) -> Vec<u8> {
        let content_type = self.last_header("content-type").expect("content type");
        let boundary = content_type
            .split("boundary=")
            .nth(1)
            .expect("multipart boundary")
            .trim_matches('"');
        let body = self.last_body();

        let marker = format!("name=\"{field}\"");
        let field_start = find(&body, marker.as_bytes()).expect("field present");
        let data_start = field_start + find(&body[field_start..], b"\r\n\r\n").expect("end of part headers") + 4;
        let delimiter = format!("\r\n--{boundary}");
        let data_end = data_start + find(&body[data_start..], delimiter.as_bytes()).expect("end of part");

        body[data_start..data_end].to_vec()
    }

    /// Header of the most recent generation or edit call
    pub fn last_header(&self, name: &str) -> Option<String> {
        self.state
            .last_headers
            .lock()
            .expect("lock")
            .as_ref()
            .and_then(|headers| headers.get(name))
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

// -- Image fixtures --

/// Solid PNG with an alpha channel
pub fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).expect("encode png");
    out.into_inner()
}

/// Solid JPEG
pub fn jpeg(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb(color));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Jpeg).expect("encode jpeg");
    out.into_inner()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn record(state: &MockState, counter: &AtomicU32, headers: HeaderMap, body: Bytes) {
    counter.fetch_add(1, Ordering::Relaxed);
    *state.last_body.lock().expect("lock") = Some(body);
    *state.last_headers.lock().expect("lock") = Some(headers);
}

fn error_response(status: u16, message: &str) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(json!({
            "error": {
                "code": status.as_u16(),
                "message": message,
            }
        })),
    )
        .into_response()
}

// -- Handlers --

async fn handle_gemini(
    State(state): State<Arc<MockState>>,
    Path(action): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    record(&state, &state.gemini_count, headers, body);

    if !action.ends_with(":generateContent") {
        return error_response(404, "unknown action");
    }

    let generated = png(16, 16, [0, 128, 255, 255]);

    match state.behavior {
        Behavior::Image | Behavior::ImageUrl => Json(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "Here you go" },
                        { "inlineData": { "mimeType": "image/png", "data": STANDARD.encode(&generated) } }
                    ]
                }
            }]
        }))
        .into_response(),
        Behavior::LegacyImage => Json(json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "inline_data": { "mime_type": "image/jpeg", "data": STANDARD.encode(jpeg(16, 16, [200, 10, 10])) } }
                    ]
                }
            }]
        }))
        .into_response(),
        Behavior::NoImage => Json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "I cannot draw that" }] },
                "finishReason": "SAFETY"
            }]
        }))
        .into_response(),
        Behavior::Error(status) => error_response(status, "API key not valid"),
    }
}

fn openai_response(state: &MockState) -> Response {
    match state.behavior {
        Behavior::Image | Behavior::LegacyImage => Json(json!({
            "created": 1_700_000_000,
            "data": [{ "b64_json": STANDARD.encode(png(16, 16, [0, 200, 0, 255])) }]
        }))
        .into_response(),
        Behavior::ImageUrl => {
            let addr = state.addr.lock().expect("lock").expect("mock address set");
            Json(json!({
                "created": 1_700_000_000,
                "data": [{ "url": format!("http://{addr}/assets/red.png") }]
            }))
            .into_response()
        }
        Behavior::NoImage => Json(json!({ "created": 1_700_000_000, "data": [] })).into_response(),
        Behavior::Error(status) => error_response(status, "Invalid prompt"),
    }
}

async fn handle_openai_generation(State(state): State<Arc<MockState>>, headers: HeaderMap, body: Bytes) -> Response {
    record(&state, &state.openai_generation_count, headers, body);
    openai_response(&state)
}

async fn handle_openai_edit(State(state): State<Arc<MockState>>, headers: HeaderMap, body: Bytes) -> Response {
    record(&state, &state.openai_edit_count, headers, body);
    openai_response(&state)
}

async fn handle_asset(State(state): State<Arc<MockState>>, Path(name): Path<String>) -> Response {
    state.asset_count.fetch_add(1, Ordering::Relaxed);

    match name.as_str() {
        "red.png" => ([(header::CONTENT_TYPE, "image/png")], png(32, 32, [255, 0, 0, 255])).into_response(),
        "photo.jpg" => ([(header::CONTENT_TYPE, "image/jpeg")], jpeg(64, 32, [10, 200, 10])).into_response(),
        "blob" => ([(header::CONTENT_TYPE, "application/octet-stream")], png(8, 8, [0, 0, 255, 255])).into_response(),
        "mask.png" => ([(header::CONTENT_TYPE, "image/png")], png(8, 8, [0, 0, 0, 0])).into_response(),
        "page.html" => ([(header::CONTENT_TYPE, "text/html")], "<html><body>not an image</body></html>").into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

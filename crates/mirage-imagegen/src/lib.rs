#![allow(
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions
)]

mod error;
mod fetch;
mod http_client;
mod image_ops;
mod provider;
mod public_url;
mod server;
mod storage;
mod types;

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, header},
    response::IntoResponse,
    routing::{get, post},
};

pub use error::{ImageGenError, Result};
pub use public_url::FILES_PATH;
pub use server::{ImageGenServerBuilder, Server};
pub use types::{EditRequest, GenerateRequest, ImageSize, ImageUrl};

/// Build the image proxy from configuration
///
/// # Errors
///
/// Returns an error if the server fails to initialize
pub fn build_server(config: &mirage_config::Config) -> anyhow::Result<Arc<Server>> {
    let server = Arc::new(
        ImageGenServerBuilder::new(config)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to initialize image proxy: {e}"))?,
    );
    Ok(server)
}

/// Create the router for the generation endpoints
///
/// `/nano/generate` is kept as an alias of `/generate` for older callers.
pub fn endpoint_router() -> Router<Arc<Server>> {
    Router::new()
        .route("/generate", post(generate))
        .route("/nano/generate", post(generate))
        .route("/edit", post(edit))
}

/// Create the router serving stored files
pub fn files_router() -> Router<Arc<Server>> {
    Router::new().route(&format!("{FILES_PATH}/{{name}}"), get(file))
}

/// Handle generation requests
async fn generate(State(server): State<Arc<Server>>, headers: HeaderMap, body: Bytes) -> Result<Json<ImageUrl>> {
    tracing::debug!("generate handler called");

    let response = server.generate(&body, &headers).await?;

    Ok(Json(response))
}

/// Handle edit requests
async fn edit(State(server): State<Arc<Server>>, headers: HeaderMap, body: Bytes) -> Result<Json<ImageUrl>> {
    tracing::debug!("edit handler called");

    let response = server.edit(&body, &headers).await?;

    Ok(Json(response))
}

/// Serve a stored image
async fn file(State(server): State<Arc<Server>>, Path(name): Path<String>) -> Result<impl IntoResponse> {
    let bytes = server.read_file(&name).await?;

    Ok(([(header::CONTENT_TYPE, "image/png")], bytes))
}

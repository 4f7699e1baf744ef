#![allow(
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions
)]

mod catalog;
mod download;
mod error;
mod mapping;
mod provider;
mod server;
mod types;
mod validate;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;

pub use catalog::{Catalog, GLOBAL_MAX_IMAGES, ModelCapability};
pub use error::{ErrorBody, ErrorKind, ImageGenError, Result};
pub use mapping::{UpstreamFailure, map_download_failure, map_upstream_failure};
pub use server::{ConstraintsResponse, ImageGenServerBuilder, ProbeReport, Server, ServiceSummary};
pub use types::{
    Constraints, GenerationRequest, GenerationResult, ImageSize, LegacyImage, ModelEntry, ModelsResponse,
    RawGenerationRequest,
};
pub use validate::{MAX_PROMPT_CHARS, ValidationError, ValidationPolicy, validate};

/// Routes served by [`endpoint_router`], as listed in not-found responses
pub const ENDPOINTS: &[&str] = &[
    "POST /generate",
    "GET /models",
    "GET /model",
    "GET /capabilities",
    "GET /constraints",
    "GET /test-api",
    "GET /download-image?url=",
];

/// Build the image generation server from configuration
///
/// # Errors
///
/// Returns an error if the server fails to initialize
pub fn build_server(config: &prism_config::Config) -> anyhow::Result<Arc<Server>> {
    let server = Arc::new(
        ImageGenServerBuilder::new(config)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to initialize image generation server: {e}"))?,
    );
    Ok(server)
}

/// Create the endpoint router for image generation
pub fn endpoint_router() -> Router<Arc<Server>> {
    Router::new()
        .route("/generate", post(generate))
        .route("/models", get(models))
        .route("/model", get(models))
        .route("/capabilities", get(models))
        .route("/constraints", get(constraints))
        .route("/test-api", get(test_api))
        .route("/download-image", get(download_image))
}

/// Handle image generation requests
async fn generate(
    State(server): State<Arc<Server>>,
    payload: std::result::Result<Json<RawGenerationRequest>, JsonRejection>,
) -> Result<Json<GenerationResult>> {
    let Json(request) = payload.map_err(|rejection| ImageGenError::MalformedBody(rejection.body_text()))?;

    let response = server.generate(&request).await?;

    tracing::debug!(images = response.images.len(), "image generation complete");

    Ok(Json(response))
}

async fn models(State(server): State<Arc<Server>>) -> Json<ModelsResponse> {
    Json(server.models().await)
}

async fn constraints(State(server): State<Arc<Server>>) -> Json<ConstraintsResponse> {
    Json(server.constraints())
}

async fn test_api(State(server): State<Arc<Server>>) -> Response {
    let report = server.probe().await;

    let status = if report.is_success() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (status, Json(report)).into_response()
}

#[derive(Debug, Deserialize)]
struct DownloadQuery {
    url: Option<String>,
}

async fn download_image(
    State(server): State<Arc<Server>>,
    query: std::result::Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<Response> {
    let Query(query) = query.map_err(|rejection| ImageGenError::InvalidUrl(rejection.body_text()))?;

    server.download(query.url.as_deref()).await
}

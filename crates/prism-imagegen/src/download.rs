//! Streaming download proxy helpers

use axum::{
    body::Body,
    http::{StatusCode, header},
    response::Response,
};
use jiff::Timestamp;
use url::Url;

use crate::{
    error::{ImageGenError, Result},
    provider::UpstreamDownload,
};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Parse and check the `url` query parameter
pub(crate) fn parse_target(raw: Option<&str>) -> Result<Url> {
    let raw = raw.map(str::trim).filter(|raw| !raw.is_empty()).ok_or(ImageGenError::MissingUrl)?;

    let url = Url::parse(raw).map_err(|e| ImageGenError::InvalidUrl(format!("{raw}: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ImageGenError::InvalidUrl(format!(
            "{raw}: only http and https URLs can be downloaded"
        )));
    }

    Ok(url)
}

/// File extension for a content type, `png` when unknown
pub(crate) fn extension_for(content_type: Option<&str>) -> &'static str {
    let essence = content_type
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase());

    match essence.as_deref() {
        Some("image/jpeg" | "image/jpg") => "jpg",
        Some("image/webp") => "webp",
        Some("image/gif") => "gif",
        _ => "png",
    }
}

/// Attachment filename stamped with the current time
pub(crate) fn attachment_filename(content_type: Option<&str>, now: Timestamp) -> String {
    format!("generated-image-{}.{}", now.as_millisecond(), extension_for(content_type))
}

/// Wrap the upstream body in a forced-download response without buffering it
pub(crate) fn attachment_response(download: UpstreamDownload) -> Result<Response> {
    let filename = attachment_filename(download.content_type.as_deref(), Timestamp::now());
    let content_type = download.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE);

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\""))
        .header(header::CACHE_CONTROL, "no-store");

    if let Some(length) = download.content_length {
        builder = builder.header(header::CONTENT_LENGTH, length);
    }

    builder
        .body(Body::from_stream(download.body))
        .map_err(|e| ImageGenError::Unexpected {
            detail: Some(format!("failed to build download response: {e}")),
        })
}

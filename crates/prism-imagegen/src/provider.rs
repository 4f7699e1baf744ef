pub(crate) mod infip;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use url::Url;

use crate::{mapping::UpstreamFailure, types::GenerationRequest};

/// Images produced by one upstream generation call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct UpstreamGeneration {
    pub images: Vec<String>,
    pub seed: Option<i64>,
}

/// Model as listed by the upstream API
#[derive(Debug, Clone)]
pub(crate) struct UpstreamModel {
    pub id: String,
    /// Every other field of the listing entry
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Upstream body being streamed to the caller
pub(crate) struct UpstreamDownload {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: BoxStream<'static, Result<Bytes, reqwest::Error>>,
}

/// Trait for image generation backends
#[async_trait]
pub(crate) trait ImageGenProvider: Send + Sync {
    /// Perform one generation call, without retries
    async fn generate(&self, request: &GenerationRequest) -> Result<UpstreamGeneration, UpstreamFailure>;

    /// Fetch the live model listing
    async fn list_models(&self) -> Result<Vec<UpstreamModel>, UpstreamFailure>;

    /// Open a streaming GET for an arbitrary image URL
    async fn download(&self, url: &Url) -> Result<UpstreamDownload, UpstreamFailure>;

    /// Get the provider name
    fn name(&self) -> &str;

    /// Host of the upstream API, for diagnostics
    fn host(&self) -> &str;
}

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Response, header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{ImageGenProvider, UpstreamDownload, UpstreamGeneration, UpstreamModel};
use crate::{
    error::{ImageGenError, Result},
    mapping::UpstreamFailure,
    types::GenerationRequest,
};

/// Bound on establishing a connection, independent of the call timeouts
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeouts applied to each kind of outbound call
#[derive(Debug, Clone, Copy)]
pub(crate) struct Timeouts {
    pub generation: Duration,
    pub catalog: Duration,
    pub download: Duration,
}

/// Provider for the `/v1/images/generations` API family
pub(crate) struct InfipProvider {
    name: String,
    host: String,
    client: Client,
    api_key: SecretString,
    base_url: Url,
    timeouts: Timeouts,
}

impl InfipProvider {
    /// Create a new provider
    pub fn new(
        name: String,
        api_key: SecretString,
        base_url: Url,
        user_agent: &str,
        timeouts: Timeouts,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(CONNECT_TIMEOUT.min(timeouts.generation))
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| ImageGenError::ConfigError(format!("failed to build HTTP client: {e}")))?;

        let host = base_url.host_str().unwrap_or_default().to_string();

        Ok(Self {
            name,
            host,
            client,
            api_key,
            base_url,
            timeouts,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.as_str().trim_end_matches('/'))
    }

    /// Turn a non-success response into a failure, keeping the body for detail
    async fn reject(&self, response: Response) -> UpstreamFailure {
        let code = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        tracing::error!(provider = %self.name, status = code, "upstream returned an error status");

        UpstreamFailure::Status { code, body }
    }

    fn transport_failure(&self, error: &reqwest::Error, operation: &'static str) -> UpstreamFailure {
        tracing::error!(provider = %self.name, operation, error = %error, "upstream request failed");
        UpstreamFailure::from_transport(error)
    }
}

/// Wire format for the upstream generation request
#[derive(Serialize)]
struct WireGenerationRequest<'a> {
    prompt: &'a str,
    model: &'a str,
    size: &'a str,
    num_images: u32,
}

/// Wire format for the upstream generation response
#[derive(Deserialize)]
struct WireGenerationResponse {
    #[serde(default)]
    images: Option<Vec<String>>,
    #[serde(default)]
    seed: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct WireModelList {
    data: Vec<WireModel>,
}

#[derive(Deserialize)]
struct WireModel {
    id: String,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

#[async_trait]
impl ImageGenProvider for InfipProvider {
    async fn generate(&self, request: &GenerationRequest) -> std::result::Result<UpstreamGeneration, UpstreamFailure> {
        let wire_request = WireGenerationRequest {
            prompt: &request.prompt,
            model: &request.model_id,
            size: request.size.as_str(),
            num_images: request.image_count,
        };

        tracing::debug!(
            provider = %self.name,
            model = %request.model_id,
            size = %request.size,
            count = request.image_count,
            "sending image generation request"
        );

        let response = self
            .client
            .post(self.endpoint("images/generations"))
            .bearer_auth(self.api_key.expose_secret())
            .timeout(self.timeouts.generation)
            .json(&wire_request)
            .send()
            .await
            .map_err(|e| self.transport_failure(&e, "generate"))?;

        if !response.status().is_success() {
            return Err(self.reject(response).await);
        }

        let wire_response: WireGenerationResponse = response
            .json()
            .await
            .map_err(|e| self.transport_failure(&e, "generate"))?;

        let images = wire_response.images.unwrap_or_default();
        tracing::debug!(provider = %self.name, images = images.len(), "image generation request complete");

        Ok(UpstreamGeneration {
            images,
            seed: wire_response.seed.as_ref().and_then(serde_json::Value::as_i64),
        })
    }

    async fn list_models(&self) -> std::result::Result<Vec<UpstreamModel>, UpstreamFailure> {
        let response = self
            .client
            .get(self.endpoint("models"))
            .bearer_auth(self.api_key.expose_secret())
            .timeout(self.timeouts.catalog)
            .send()
            .await
            .map_err(|e| self.transport_failure(&e, "list_models"))?;

        if !response.status().is_success() {
            return Err(self.reject(response).await);
        }

        let list: WireModelList = response
            .json()
            .await
            .map_err(|e| self.transport_failure(&e, "list_models"))?;

        Ok(list
            .data
            .into_iter()
            .map(|model| UpstreamModel {
                id: model.id,
                extra: model.extra,
            })
            .collect())
    }

    async fn download(&self, url: &Url) -> std::result::Result<UpstreamDownload, UpstreamFailure> {
        // No credential: the target is an arbitrary host chosen by the caller
        let response = self
            .client
            .get(url.clone())
            .timeout(self.timeouts.download)
            .send()
            .await
            .map_err(|e| self.transport_failure(&e, "download"))?;

        if !response.status().is_success() {
            return Err(self.reject(response).await);
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let content_length = response.content_length();

        let name = self.name.clone();
        let body = response
            .bytes_stream()
            .inspect(move |chunk| {
                if let Err(e) = chunk {
                    tracing::warn!(provider = %name, error = %e, "download stream aborted");
                }
            })
            .boxed();

        Ok(UpstreamDownload {
            content_type,
            content_length,
            body,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn host(&self) -> &str {
        &self.host
    }
}

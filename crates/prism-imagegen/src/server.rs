use std::sync::Arc;

use axum::response::Response;
use indexmap::IndexMap;
use mini_moka::sync::Cache;
use secrecy::SecretString;
use serde::Serialize;

use crate::{
    catalog::{self, Catalog},
    download,
    error::{ImageGenError, Result},
    mapping::{UpstreamFailure, map_download_failure, map_upstream_failure},
    provider::{
        ImageGenProvider, UpstreamModel,
        infip::{InfipProvider, Timeouts},
    },
    types::{Constraints, GenerationResult, ImageSize, ModelEntry, ModelsResponse, RawGenerationRequest},
    validate::{ValidationPolicy, validate},
};

const LIVE_MODELS_KEY: &str = "models";

/// Capability summary served by `/constraints`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintsResponse {
    pub constraints: IndexMap<String, Constraints>,
    pub supported_models: Vec<String>,
    pub supported_sizes: Vec<ImageSize>,
}

/// Outcome of a connectivity probe against the upstream listing
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_models: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub api_key: &'static str,
}

impl ProbeReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Facts about the running façade, embedded in the service info payload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub upstream_host: String,
    pub default_model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forced_model: Option<String>,
    pub enforce_model_catalog: bool,
    pub include_legacy_shape: bool,
    pub catalog_size: usize,
    pub supported_sizes: Vec<ImageSize>,
}

/// Image generation façade over a single upstream provider
pub struct Server {
    provider: Box<dyn ImageGenProvider>,
    catalog: Catalog,
    policy: ValidationPolicy,
    include_legacy_shape: bool,
    expose_details: bool,
    live_models: Cache<&'static str, Arc<Vec<UpstreamModel>>>,
}

impl Server {
    /// Validate a request, forward it upstream once and shape the result
    pub async fn generate(&self, raw: &RawGenerationRequest) -> Result<GenerationResult> {
        let request = validate(raw, &self.catalog, &self.policy)?;

        tracing::info!(
            provider = %self.provider.name(),
            model = %request.model_id,
            size = %request.size,
            count = request.image_count,
            prompt_chars = request.prompt.chars().count(),
            "generating images"
        );

        let upstream = self
            .provider
            .generate(&request)
            .await
            .map_err(|failure| self.map_failure(failure))?;

        if upstream.images.is_empty() {
            tracing::warn!(model = %request.model_id, "upstream returned no images");
        }

        Ok(GenerationResult::new(
            &request,
            upstream.images,
            upstream.seed,
            self.include_legacy_shape,
        ))
    }

    /// Live model listing annotated with constraints, or the static catalog
    ///
    /// Never fails: any upstream failure is logged and the catalog is served
    /// with `fallback` set.
    pub async fn models(&self) -> ModelsResponse {
        match self.live_models().await {
            Ok(models) => {
                let models: Vec<ModelEntry> = models
                    .iter()
                    .map(|model| {
                        let mut upstream = model.extra.clone();
                        upstream.remove("constraints");

                        ModelEntry {
                            id: model.id.clone(),
                            name: None,
                            upstream,
                            constraints: self.catalog.constraints_or_default(&model.id),
                        }
                    })
                    .collect();

                ModelsResponse {
                    total: models.len(),
                    models,
                    fallback: false,
                }
            }
            Err(failure) => {
                tracing::warn!(
                    provider = %self.provider.name(),
                    failure = ?failure,
                    "live model listing unavailable, serving static catalog"
                );
                self.fallback_models()
            }
        }
    }

    fn fallback_models(&self) -> ModelsResponse {
        let models: Vec<ModelEntry> = self
            .catalog
            .iter()
            .map(|capability| ModelEntry {
                id: capability.id.clone(),
                name: Some(catalog::display_name(&capability.id)),
                upstream: serde_json::Map::new(),
                constraints: capability.constraints(),
            })
            .collect();

        ModelsResponse {
            total: models.len(),
            models,
            fallback: true,
        }
    }

    async fn live_models(&self) -> std::result::Result<Arc<Vec<UpstreamModel>>, UpstreamFailure> {
        if let Some(models) = self.live_models.get(&LIVE_MODELS_KEY) {
            tracing::debug!("serving cached model listing");
            return Ok(models);
        }

        let models = Arc::new(self.provider.list_models().await?);
        tracing::debug!(count = models.len(), "refreshed live model listing");

        self.live_models.insert(LIVE_MODELS_KEY, Arc::clone(&models));

        Ok(models)
    }

    /// Static capability table, no upstream call
    pub fn constraints(&self) -> ConstraintsResponse {
        ConstraintsResponse {
            constraints: self
                .catalog
                .iter()
                .map(|capability| (capability.id.clone(), capability.constraints()))
                .collect(),
            supported_models: self.catalog.ids().map(str::to_string).collect(),
            supported_sizes: catalog::all_sizes().to_vec(),
        }
    }

    /// Check that the upstream listing answers with the configured credential
    ///
    /// Bypasses the listing cache.
    pub async fn probe(&self) -> ProbeReport {
        match self.provider.list_models().await {
            Ok(models) => ProbeReport {
                status: "API connection successful",
                available_models: Some(models.len()),
                error: None,
                api_key: "Configured",
            },
            Err(failure) => ProbeReport {
                status: "API connection failed",
                available_models: None,
                error: Some(self.map_failure(failure).client_message()),
                api_key: "Configured",
            },
        }
    }

    /// Stream a remote image back as an attachment
    pub async fn download(&self, url: Option<&str>) -> Result<Response> {
        let url = download::parse_target(url)?;

        tracing::debug!(host = url.host_str().unwrap_or_default(), "proxying image download");

        let upstream = self
            .provider
            .download(&url)
            .await
            .map_err(|failure| map_download_failure(failure, self.expose_details))?;

        download::attachment_response(upstream)
    }

    pub fn summary(&self) -> ServiceSummary {
        ServiceSummary {
            upstream_host: self.provider.host().to_string(),
            default_model: self.policy.default_model.clone(),
            forced_model: self.policy.forced_model.clone(),
            enforce_model_catalog: self.policy.enforce_model_catalog,
            include_legacy_shape: self.include_legacy_shape,
            catalog_size: self.catalog.len(),
            supported_sizes: catalog::all_sizes().to_vec(),
        }
    }

    fn map_failure(&self, failure: UpstreamFailure) -> ImageGenError {
        map_upstream_failure(failure, self.expose_details)
    }
}

/// Builder for constructing the image generation server from configuration
pub struct ImageGenServerBuilder<'a> {
    config: &'a prism_config::Config,
}

impl<'a> ImageGenServerBuilder<'a> {
    pub fn new(config: &'a prism_config::Config) -> Self {
        Self { config }
    }

    pub fn build(self) -> Result<Server> {
        let imagegen = &self.config.imagegen;

        let api_key = resolve_api_key(imagegen)?;
        let catalog = Catalog::from_config(&imagegen.models)?;

        let policy = ValidationPolicy {
            default_model: imagegen.default_model.clone(),
            forced_model: imagegen.forced_model.clone(),
            enforce_model_catalog: imagegen.enforce_model_catalog,
        };
        check_policy(&policy, &catalog)?;

        if !policy.enforce_model_catalog {
            tracing::warn!("model catalog enforcement is disabled; unknown models are forwarded upstream");
        }

        let user_agent = imagegen
            .user_agent
            .clone()
            .unwrap_or_else(|| concat!("prism/", env!("CARGO_PKG_VERSION")).to_string());

        let provider = InfipProvider::new(
            "infip".to_string(),
            api_key,
            imagegen.base_url.clone(),
            &user_agent,
            Timeouts {
                generation: imagegen.generation_timeout,
                catalog: imagegen.catalog_timeout,
                download: imagegen.download_timeout,
            },
        )?;

        tracing::debug!(
            host = provider.host(),
            models = catalog.len(),
            forced_model = ?policy.forced_model,
            "image generation server initialized"
        );

        Ok(Server::with_provider(
            Box::new(provider),
            catalog,
            policy,
            Settings {
                include_legacy_shape: imagegen.include_legacy_shape,
                expose_details: self.config.server.environment.is_development(),
                catalog_cache_ttl: imagegen.catalog_cache_ttl,
            },
        ))
    }
}

/// Server knobs that do not belong to validation
pub(crate) struct Settings {
    pub include_legacy_shape: bool,
    pub expose_details: bool,
    pub catalog_cache_ttl: std::time::Duration,
}

impl Server {
    pub(crate) fn with_provider(
        provider: Box<dyn ImageGenProvider>,
        catalog: Catalog,
        policy: ValidationPolicy,
        settings: Settings,
    ) -> Self {
        Self {
            provider,
            catalog,
            policy,
            include_legacy_shape: settings.include_legacy_shape,
            expose_details: settings.expose_details,
            live_models: Cache::builder()
                .max_capacity(1)
                .time_to_live(settings.catalog_cache_ttl)
                .build(),
        }
    }
}

fn resolve_api_key(config: &prism_config::ImageGenConfig) -> Result<SecretString> {
    config.api_key.clone().ok_or(ImageGenError::MissingCredential)
}

/// With enforcement on, the models the policy can fall back to must exist
fn check_policy(policy: &ValidationPolicy, catalog: &Catalog) -> Result<()> {
    if !policy.enforce_model_catalog {
        return Ok(());
    }

    for (role, model) in [
        ("default_model", Some(policy.default_model.as_str())),
        ("forced_model", policy.forced_model.as_deref()),
    ] {
        if let Some(model) = model
            && !catalog.contains(model)
        {
            return Err(ImageGenError::ConfigError(format!(
                "{role} '{model}' is not in the model catalog"
            )));
        }
    }

    Ok(())
}

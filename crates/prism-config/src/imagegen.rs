use std::time::Duration;

use indexmap::IndexMap;
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Hard upper bound on images per request, independent of the model
pub const MAX_IMAGES_PER_REQUEST: u32 = 4;

/// Default upstream API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.infip.pro/v1";

/// Upstream image generation configuration
///
/// The switches `forced_model`, `enforce_model_catalog` and
/// `include_legacy_shape` select the deployment variant.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageGenConfig {
    /// Base URL of the generation API, including the version segment
    #[serde(default = "default_base_url")]
    pub base_url: Url,
    /// Bearer credential sent to the upstream API
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// User agent sent upstream
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Timeout for a single generation call
    #[serde(default = "default_generation_timeout", with = "crate::duration")]
    pub generation_timeout: Duration,
    /// Timeout for upstream model listing
    #[serde(default = "default_catalog_timeout", with = "crate::duration")]
    pub catalog_timeout: Duration,
    /// Timeout for the download proxy, body included
    #[serde(default = "default_download_timeout", with = "crate::duration")]
    pub download_timeout: Duration,
    /// How long a live model listing is reused
    #[serde(default = "default_catalog_cache_ttl", with = "crate::duration")]
    pub catalog_cache_ttl: Duration,
    /// Model used when the request does not name one
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Model that replaces whatever the request asks for
    #[serde(default)]
    pub forced_model: Option<String>,
    /// Reject models that are not in the capability catalog
    #[serde(default = "default_true")]
    pub enforce_model_catalog: bool,
    /// Add the legacy `data: [{url}]` list to generation responses
    #[serde(default = "default_true")]
    pub include_legacy_shape: bool,
    /// Capability catalog override; the built-in catalog is used when empty
    #[serde(default)]
    pub models: IndexMap<String, ModelCapabilityConfig>,
}

impl Default for ImageGenConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            user_agent: None,
            generation_timeout: default_generation_timeout(),
            catalog_timeout: default_catalog_timeout(),
            download_timeout: default_download_timeout(),
            catalog_cache_ttl: default_catalog_cache_ttl(),
            default_model: default_model(),
            forced_model: None,
            enforce_model_catalog: true,
            include_legacy_shape: true,
            models: IndexMap::new(),
        }
    }
}

/// Capabilities of a single model in a catalog override
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelCapabilityConfig {
    /// Maximum images per request
    pub max_images: u32,
    /// Sizes such as `"1024x1024"`
    pub supported_sizes: Vec<String>,
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("default base URL must be valid")
}

const fn default_generation_timeout() -> Duration {
    Duration::from_secs(180)
}

const fn default_catalog_timeout() -> Duration {
    Duration::from_secs(10)
}

const fn default_download_timeout() -> Duration {
    Duration::from_secs(120)
}

const fn default_catalog_cache_ttl() -> Duration {
    Duration::from_secs(300)
}

fn default_model() -> String {
    "img3".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_true() -> bool {
    true
}

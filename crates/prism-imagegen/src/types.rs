use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, PickFirst, serde_as};
use strum::{Display, EnumString, IntoStaticStr, VariantArray};

/// Output dimensions accepted by the upstream API
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    IntoStaticStr,
    VariantArray,
)]
pub enum ImageSize {
    #[default]
    #[serde(rename = "1024x1024")]
    #[strum(serialize = "1024x1024")]
    Square,
    #[serde(rename = "1792x1024")]
    #[strum(serialize = "1792x1024")]
    Landscape,
    #[serde(rename = "1024x1792")]
    #[strum(serialize = "1024x1792")]
    Portrait,
}

impl ImageSize {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Generation request as received from the client, before validation
///
/// Every field is optional so that missing values reach the validator
/// instead of failing deserialization.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawGenerationRequest {
    /// Text description of the desired image
    #[serde(default)]
    pub prompt: Option<String>,
    /// Model identifier (e.g. "flux-schnell")
    #[serde(default)]
    pub model: Option<String>,
    /// Size such as "1024x1024"
    #[serde(default)]
    pub size: Option<String>,
    /// Number of images; numeric strings are accepted as well
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub num_images: Option<i64>,
}

/// A request that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Trimmed prompt
    pub prompt: String,
    /// Resolved model identifier
    pub model_id: String,
    pub size: ImageSize,
    pub image_count: u32,
}

/// Image URL wrapped in an object, as older clients expect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyImage {
    pub url: String,
}

/// Normalized generation response
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    /// Generated image URLs in upstream order
    pub images: Vec<String>,
    /// Same URLs in the legacy `{url}` shape, when enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<LegacyImage>>,
    /// Seed reported by the upstream API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    pub model: String,
    pub size: ImageSize,
    pub prompt: String,
    pub timestamp: Timestamp,
    pub success: bool,
}

impl GenerationResult {
    /// Build a result from the upstream image list and the request echo fields
    ///
    /// The legacy list is derived from `images`, so both always carry the
    /// same URLs in the same order.
    pub fn new(request: &GenerationRequest, images: Vec<String>, seed: Option<i64>, legacy_shape: bool) -> Self {
        let data = legacy_shape.then(|| images.iter().map(|url| LegacyImage { url: url.clone() }).collect());

        Self {
            images,
            data,
            seed,
            model: request.model_id.clone(),
            size: request.size,
            prompt: request.prompt.clone(),
            timestamp: Timestamp::now(),
            success: true,
        }
    }
}

/// Per-model constraints as exposed to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    pub max_images: u32,
    pub supported_sizes: Vec<ImageSize>,
}

/// Entry of the `/models` listing
#[derive(Debug, Clone, Serialize)]
pub struct ModelEntry {
    pub id: String,
    /// Display name, present on fallback entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Remaining upstream fields, passed through unchanged
    #[serde(flatten)]
    pub upstream: serde_json::Map<String, serde_json::Value>,
    pub constraints: Constraints,
}

/// Response of the `/models` listing
#[derive(Debug, Clone, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelEntry>,
    pub total: usize,
    /// Set when the static catalog was served because the upstream listing failed
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
}

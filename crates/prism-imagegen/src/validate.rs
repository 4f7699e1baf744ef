//! Request validation against the capability catalog
//!
//! Pure: the outcome depends only on the raw request, the catalog and the
//! policy. Rules run in a fixed order and the first failure wins.

use std::str::FromStr;

use thiserror::Error;

use crate::{
    catalog::{Catalog, GLOBAL_MAX_IMAGES, all_sizes},
    types::{GenerationRequest, ImageSize, RawGenerationRequest},
};

/// Maximum prompt length in characters, after trimming
pub const MAX_PROMPT_CHARS: usize = 1000;

/// Deployment-specific validation switches
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    /// Model used when the request omits one
    pub default_model: String,
    /// Model that overrides the request
    pub forced_model: Option<String>,
    /// Reject models outside the catalog
    pub enforce_model_catalog: bool,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            default_model: "img3".to_string(),
            forced_model: None,
            enforce_model_catalog: true,
        }
    }
}

/// Why a request was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Prompt is required and cannot be empty")]
    EmptyPrompt,

    #[error("Prompt too long ({length} characters). Maximum {max} characters allowed.", max = MAX_PROMPT_CHARS)]
    PromptTooLong { length: usize },

    #[error("Unsupported model '{model}'. Supported models: {}", .supported.join(", "))]
    UnsupportedModel { model: String, supported: Vec<String> },

    #[error("Size '{size}' not supported for model '{model}'. Supported sizes: {}", join_sizes(.supported))]
    UnsupportedSize {
        size: String,
        model: String,
        supported: Vec<ImageSize>,
    },

    #[error("Model '{model}' supports between 1 and {max} images. Requested: {requested}")]
    ModelImageCount { model: String, max: u32, requested: i64 },

    #[error("Number of images must be between 1 and {max}. Requested: {requested}", max = GLOBAL_MAX_IMAGES)]
    ImageCount { requested: i64 },
}

impl ValidationError {
    /// Machine-readable rejection reason
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::EmptyPrompt => "EMPTY_PROMPT",
            Self::PromptTooLong { .. } => "PROMPT_TOO_LONG",
            Self::UnsupportedModel { .. } => "UNSUPPORTED_MODEL",
            Self::UnsupportedSize { .. } => "UNSUPPORTED_SIZE",
            Self::ModelImageCount { .. } | Self::ImageCount { .. } => "IMAGE_COUNT_OUT_OF_RANGE",
        }
    }

    /// Allowed values that help the caller fix the request
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::EmptyPrompt => None,
            Self::PromptTooLong { length } => Some(serde_json::json!({
                "length": length,
                "maxLength": MAX_PROMPT_CHARS,
            })),
            Self::UnsupportedModel { supported, .. } => Some(serde_json::json!({ "supportedModels": supported })),
            Self::UnsupportedSize { supported, .. } => Some(serde_json::json!({ "supportedSizes": supported })),
            Self::ModelImageCount { max, requested, .. } => Some(serde_json::json!({
                "maxImages": max,
                "requested": requested,
            })),
            Self::ImageCount { requested } => Some(serde_json::json!({
                "maxImages": GLOBAL_MAX_IMAGES,
                "requested": requested,
            })),
        }
    }
}

fn join_sizes(sizes: &[ImageSize]) -> String {
    sizes.iter().map(|size| size.as_str()).collect::<Vec<_>>().join(", ")
}

/// Validate a raw request and resolve defaults
///
/// # Errors
///
/// Returns the first rule the request violates
pub fn validate(
    raw: &RawGenerationRequest,
    catalog: &Catalog,
    policy: &ValidationPolicy,
) -> Result<GenerationRequest, ValidationError> {
    let prompt = raw.prompt.as_deref().map(str::trim).unwrap_or_default();

    if prompt.is_empty() {
        return Err(ValidationError::EmptyPrompt);
    }

    let length = prompt.chars().count();
    if length > MAX_PROMPT_CHARS {
        return Err(ValidationError::PromptTooLong { length });
    }

    let model = policy
        .forced_model
        .as_deref()
        .or(raw.model.as_deref())
        .unwrap_or(&policy.default_model);

    let capability = catalog.get(model);
    if capability.is_none() && policy.enforce_model_catalog {
        return Err(ValidationError::UnsupportedModel {
            model: model.to_string(),
            supported: catalog.ids().map(str::to_string).collect(),
        });
    }

    let requested_size = raw.size.as_deref().unwrap_or(ImageSize::default().as_str());
    let supported = capability.map_or(all_sizes(), |c| c.supported_sizes.as_slice());
    let size = ImageSize::from_str(requested_size)
        .ok()
        .filter(|size| supported.contains(size))
        .ok_or_else(|| ValidationError::UnsupportedSize {
            size: requested_size.to_string(),
            model: model.to_string(),
            supported: supported.to_vec(),
        })?;

    let requested = raw.num_images.unwrap_or(1);

    if let Some(capability) = capability
        && !(1..=i64::from(capability.max_images)).contains(&requested)
    {
        return Err(ValidationError::ModelImageCount {
            model: model.to_string(),
            max: capability.max_images,
            requested,
        });
    }

    let image_count = u32::try_from(requested)
        .ok()
        .filter(|count| (1..=GLOBAL_MAX_IMAGES).contains(count))
        .ok_or(ValidationError::ImageCount { requested })?;

    Ok(GenerationRequest {
        prompt: prompt.to_string(),
        model_id: model.to_string(),
        size,
        image_count,
    })
}

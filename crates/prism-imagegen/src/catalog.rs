//! Static model capability catalog
//!
//! Built once at startup, either from the built-in table or from the
//! `[imagegen.models]` configuration override, and never mutated.

use std::str::FromStr;

use indexmap::IndexMap;
use prism_config::ModelCapabilityConfig;
use strum::VariantArray;

use crate::{
    error::{ImageGenError, Result},
    types::{Constraints, ImageSize},
};

/// Upper bound on images per request regardless of model
pub const GLOBAL_MAX_IMAGES: u32 = prism_config::MAX_IMAGES_PER_REQUEST;

const ALL_SIZES: &[ImageSize] = ImageSize::VARIANTS;
const SQUARE_ONLY: &[ImageSize] = &[ImageSize::Square];

const BUILTIN: &[(&str, u32, &[ImageSize])] = &[
    ("gemini-2.0-flash", 4, ALL_SIZES),
    ("img3", 4, ALL_SIZES),
    ("img4", 4, ALL_SIZES),
    ("uncen", 1, SQUARE_ONLY),
    ("qwen", 4, ALL_SIZES),
    ("kontext-max", 4, SQUARE_ONLY),
    ("kontext-pro", 4, SQUARE_ONLY),
    ("flux-1.1-pro", 1, SQUARE_ONLY),
    ("flux-pro", 1, SQUARE_ONLY),
    ("flux-schnell", 4, SQUARE_ONLY),
    ("flux-dev", 4, SQUARE_ONLY),
];

/// Capabilities of a single model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCapability {
    pub id: String,
    pub max_images: u32,
    pub supported_sizes: Vec<ImageSize>,
}

impl ModelCapability {
    pub fn supports(&self, size: ImageSize) -> bool {
        self.supported_sizes.contains(&size)
    }

    pub fn constraints(&self) -> Constraints {
        Constraints {
            max_images: self.max_images,
            supported_sizes: self.supported_sizes.clone(),
        }
    }
}

/// Ordered, immutable map from model id to capability
#[derive(Debug, Clone)]
pub struct Catalog {
    models: IndexMap<String, ModelCapability>,
}

impl Catalog {
    /// Catalog shipped with the service
    pub fn builtin() -> Self {
        let models = BUILTIN
            .iter()
            .map(|(id, max_images, sizes)| {
                let capability = ModelCapability {
                    id: (*id).to_string(),
                    max_images: *max_images,
                    supported_sizes: sizes.to_vec(),
                };
                ((*id).to_string(), capability)
            })
            .collect();

        Self { models }
    }

    /// Catalog from a configuration override, or the built-in one when empty
    pub fn from_config(models: &IndexMap<String, ModelCapabilityConfig>) -> Result<Self> {
        if models.is_empty() {
            return Ok(Self::builtin());
        }

        let mut catalog = IndexMap::with_capacity(models.len());

        for (id, config) in models {
            let supported_sizes = config
                .supported_sizes
                .iter()
                .map(|size| {
                    ImageSize::from_str(size).map_err(|_| {
                        ImageGenError::ConfigError(format!("model '{id}' lists unknown size '{size}'"))
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            catalog.insert(
                id.clone(),
                ModelCapability {
                    id: id.clone(),
                    max_images: config.max_images,
                    supported_sizes,
                },
            );
        }

        Ok(Self { models: catalog })
    }

    pub fn get(&self, id: &str) -> Option<&ModelCapability> {
        self.models.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.models.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelCapability> {
        self.models.values()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Constraints for a model, or the conservative default for unknown ids
    pub fn constraints_or_default(&self, id: &str) -> Constraints {
        self.get(id).map_or_else(
            || Constraints {
                max_images: 1,
                supported_sizes: vec![ImageSize::Square],
            },
            ModelCapability::constraints,
        )
    }
}

/// Every size the upstream API knows
pub fn all_sizes() -> &'static [ImageSize] {
    ImageSize::VARIANTS
}

/// Human-readable name for a model id, e.g. `flux-schnell` → `Flux schnell`
pub fn display_name(id: &str) -> String {
    let mut chars = id.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.map(|c| if c == '-' { ' ' } else { c })).collect()
    })
}

#![allow(clippy::must_use_candidate)]

pub mod cors;
mod duration;
mod env;
pub mod imagegen;
mod loader;
pub mod server;
pub mod telemetry;

use serde::Deserialize;

pub use cors::*;
pub use imagegen::*;
pub use server::*;
pub use telemetry::*;

/// Top-level Prism configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Upstream image generation configuration
    #[serde(default)]
    pub imagegen: ImageGenConfig,
    /// Logging configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

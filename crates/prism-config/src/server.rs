use std::net::SocketAddr;

use serde::Deserialize;

use crate::cors::CorsConfig;

/// Port used when neither `listen_address` nor `port` is set
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Full bind address; takes precedence over `port`
    pub listen_address: Option<SocketAddr>,
    /// Port to bind on all interfaces
    #[serde(default)]
    pub port: Option<u16>,
    /// Deployment environment, controls error detail exposure
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub cors: Option<CorsConfig>,
    /// Liveness endpoints (`/` and `/ping`)
    #[serde(default)]
    pub liveness: LivenessConfig,
}

impl ServerConfig {
    /// Resolve the address the server should bind to
    pub fn bind_address(&self) -> SocketAddr {
        self.listen_address.unwrap_or_else(|| {
            SocketAddr::from(([0, 0, 0, 0], self.port.unwrap_or(DEFAULT_PORT)))
        })
    }
}

/// Deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Internal error details are included in responses
    Development,
    /// Internal error details are hidden
    #[default]
    Production,
}

impl Environment {
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

/// Liveness endpoint toggles
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LivenessConfig {
    /// Serve the info payload on `/`
    #[serde(default = "default_enabled")]
    pub info: bool,
    /// Serve the ping probe on `/ping`
    #[serde(default = "default_enabled")]
    pub ping: bool,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self { info: true, ping: true }
    }
}

#[allow(clippy::missing_const_for_fn)]
fn default_enabled() -> bool {
    true
}

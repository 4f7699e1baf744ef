use std::time::Duration;

use serde::Deserialize;

/// Cross-origin access for browser frontends
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    /// Origin allowlist; a single `"*"` entry allows any origin
    #[serde(default)]
    pub origins: Vec<String>,
    /// Allow credentials
    #[serde(default)]
    pub credentials: bool,
    /// Max age for preflight cache in seconds
    #[serde(default)]
    pub max_age: Option<u64>,
}

impl CorsConfig {
    /// Whether every origin is allowed
    pub fn allows_any_origin(&self) -> bool {
        self.origins.iter().any(|origin| origin == "*")
    }

    /// Explicit origins, with blank entries from unset environment variables removed
    pub fn explicit_origins(&self) -> impl Iterator<Item = &str> {
        self.origins
            .iter()
            .map(|origin| origin.trim().trim_end_matches('/'))
            .filter(|origin| !origin.is_empty() && *origin != "*")
    }

    /// Get max age as Duration
    pub fn max_age_duration(&self) -> Option<Duration> {
        self.max_age.map(Duration::from_secs)
    }
}

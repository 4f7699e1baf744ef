//! Programmatic configuration builder for integration tests

use std::{net::SocketAddr, time::Duration};

use prism_config::{Config, CorsConfig, Environment, ServerConfig};
use secrecy::SecretString;

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Configuration pointed at an upstream base URL, with a test credential
    pub fn new(base_url: &str) -> Self {
        let mut config = Config {
            server: ServerConfig {
                listen_address: Some(SocketAddr::from(([127, 0, 0, 1], 0))),
                ..ServerConfig::default()
            },
            ..Config::default()
        };
        config.imagegen.base_url = base_url.parse().expect("valid URL");
        config.imagegen.api_key = Some(SecretString::from("test-key"));

        Self { config }
    }

    /// Expose internal error detail in responses
    pub fn development(mut self) -> Self {
        self.config.server.environment = Environment::Development;
        self
    }

    pub fn with_cors(mut self, config: CorsConfig) -> Self {
        self.config.server.cors = Some(config);
        self
    }

    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.config.imagegen.generation_timeout = timeout;
        self
    }

    pub fn with_catalog_cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.imagegen.catalog_cache_ttl = ttl;
        self
    }

    pub fn with_forced_model(mut self, model: &str) -> Self {
        self.config.imagegen.forced_model = Some(model.to_owned());
        self
    }

    pub fn without_catalog_enforcement(mut self) -> Self {
        self.config.imagegen.enforce_model_catalog = false;
        self
    }

    pub fn without_legacy_shape(mut self) -> Self {
        self.config.imagegen.include_legacy_shape = false;
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }
}

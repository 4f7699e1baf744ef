use std::path::Path;

use secrecy::ExposeSecret;

use crate::{Config, MAX_IMAGES_PER_REQUEST};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream credential is missing or the
    /// upstream or catalog settings are invalid
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_credential()?;
        self.validate_upstream()?;
        self.validate_catalog()?;
        Ok(())
    }

    /// The credential is a startup precondition, never a per-request check
    fn validate_credential(&self) -> anyhow::Result<()> {
        match self.imagegen.api_key {
            Some(ref key) if !key.expose_secret().trim().is_empty() => Ok(()),
            _ => anyhow::bail!("imagegen.api_key must be set (server misconfigured: API key not found)"),
        }
    }

    fn validate_upstream(&self) -> anyhow::Result<()> {
        let imagegen = &self.imagegen;

        if !matches!(imagegen.base_url.scheme(), "http" | "https") {
            anyhow::bail!("imagegen.base_url must use http or https, got '{}'", imagegen.base_url.scheme());
        }

        for (name, timeout) in [
            ("generation_timeout", imagegen.generation_timeout),
            ("catalog_timeout", imagegen.catalog_timeout),
            ("download_timeout", imagegen.download_timeout),
        ] {
            if timeout.is_zero() {
                anyhow::bail!("imagegen.{name} must be greater than 0");
            }
        }

        Ok(())
    }

    fn validate_catalog(&self) -> anyhow::Result<()> {
        let imagegen = &self.imagegen;

        if imagegen.default_model.trim().is_empty() {
            anyhow::bail!("imagegen.default_model must not be empty");
        }

        if let Some(ref forced) = imagegen.forced_model
            && forced.trim().is_empty()
        {
            anyhow::bail!("imagegen.forced_model must not be empty when set");
        }

        for (id, capability) in &imagegen.models {
            if !(1..=MAX_IMAGES_PER_REQUEST).contains(&capability.max_images) {
                anyhow::bail!("model '{id}' max_images must be between 1 and {MAX_IMAGES_PER_REQUEST}");
            }
            if capability.supported_sizes.is_empty() {
                anyhow::bail!("model '{id}' must support at least one size");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Config, Environment};

    #[test]
    fn minimal_config_loads() {
        let config = Config::from_toml(
            r#"
            [imagegen]
            api_key = "sk-test"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.environment, Environment::Production);
        assert_eq!(config.imagegen.default_model, "img3");
    }

    #[test]
    fn missing_api_key_fails_fast() {
        let err = Config::from_toml("[server]\nport = 3000").unwrap_err();
        assert!(err.to_string().contains("api_key"));
    }

    #[test]
    fn blank_api_key_from_environment_fails_fast() {
        temp_env::with_var_unset("PRISM_TEST_KEY", || {
            let err = Config::from_toml(
                r#"
                [imagegen]
                api_key = "{{ env.PRISM_TEST_KEY | default("") }}"
                "#,
            )
            .unwrap_err();
            assert!(err.to_string().contains("api_key"));
        });
    }

    #[test]
    fn environment_values_flow_into_config() {
        let vars = [("PRISM_TEST_KEY", Some("sk-env")), ("PRISM_TEST_PORT", Some("8088"))];
        temp_env::with_vars(vars, || {
            let config = Config::from_toml(
                r#"
                [server]
                port = {{ env.PRISM_TEST_PORT | default("3000") }}

                [imagegen]
                api_key = "{{ env.PRISM_TEST_KEY }}"
                "#,
            )
            .unwrap();

            assert_eq!(config.server.bind_address().port(), 8088);
        });
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = Config::from_toml(
            r#"
            [imagegen]
            api_key = "sk-test"
            strict = true
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("failed to parse config"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = Config::from_toml(
            r#"
            [imagegen]
            api_key = "sk-test"
            generation_timeout = "0s"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("generation_timeout"));
    }

    #[test]
    fn catalog_override_bounds_are_checked() {
        let err = Config::from_toml(
            r#"
            [imagegen]
            api_key = "sk-test"

            [imagegen.models.big]
            max_images = 8
            supported_sizes = ["1024x1024"]
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("max_images"));
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        let err = Config::from_toml(
            r#"
            [imagegen]
            api_key = "sk-test"
            base_url = "ftp://example.com/v1"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("http or https"));
    }
}

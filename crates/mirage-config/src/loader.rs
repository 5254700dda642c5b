use std::path::Path;

use secrecy::SecretString;

use crate::Config;

/// Template used when the service is configured purely through the environment
const ENV_TEMPLATE: &str = include_str!("default.toml");

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

        Self::parse(&raw)
    }

    /// Build configuration from environment variables alone
    ///
    /// Uses the embedded template, then falls back to the provider's
    /// conventional variables (`GEMINI_API_KEY`, `OPENAI_API_KEY`, ...)
    /// for the key and model when the generic ones are unset.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds a value that does not parse
    /// or validation fails
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::parse_unvalidated(ENV_TEMPLATE)?;
        config.apply_provider_env_fallbacks();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from raw TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing or validation fails
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let config = Self::parse_unvalidated(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn parse_unvalidated(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))
    }

    fn apply_provider_env_fallbacks(&mut self) {
        let provider_type = self.provider.provider_type;

        if self.provider.api_key.is_none() {
            self.provider.api_key = non_empty_var(provider_type.api_key_var()).map(SecretString::from);
        }

        if self.provider.model.is_none() {
            self.provider.model = non_empty_var(provider_type.model_var());
        }
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_urls()?;
        self.validate_limits()?;

        if !self.server.health.path.starts_with('/') {
            anyhow::bail!("server.health.path must start with '/'");
        }

        if self.storage.directory.as_os_str().is_empty() {
            anyhow::bail!("storage.directory must not be empty");
        }

        if self.auth.header_name.trim().is_empty() {
            anyhow::bail!("auth.header_name must not be empty");
        }

        Ok(())
    }

    fn validate_urls(&self) -> anyhow::Result<()> {
        if let Some(ref base) = self.server.public_base_url {
            let url = url::Url::parse(base)
                .map_err(|e| anyhow::anyhow!("server.public_base_url is not a valid URL: {e}"))?;

            if !matches!(url.scheme(), "http" | "https") {
                anyhow::bail!("server.public_base_url must use http or https");
            }
        }

        if let Some(ref base) = self.provider.base_url {
            url::Url::parse(base).map_err(|e| anyhow::anyhow!("provider.base_url is not a valid URL: {e}"))?;
        }

        Ok(())
    }

    fn validate_limits(&self) -> anyhow::Result<()> {
        if self.provider.timeout_secs == 0 {
            anyhow::bail!("provider.timeout_secs must be greater than 0");
        }

        if self.fetch.timeout_secs == 0 {
            anyhow::bail!("fetch.timeout_secs must be greater than 0");
        }

        if self.fetch.max_bytes == 0 {
            anyhow::bail!("fetch.max_bytes must be greater than 0");
        }

        if self.normalize.width == 0 || self.normalize.height == 0 {
            anyhow::bail!("normalize.width and normalize.height must be greater than 0");
        }

        if self.normalize.width > self.normalize.max_side || self.normalize.height > self.normalize.max_side {
            anyhow::bail!("normalize.width and normalize.height must not exceed normalize.max_side");
        }

        Ok(())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;

use mirage_config::{Config, ProviderConfig, ProviderType, ServerConfig, StorageConfig};
use secrecy::SecretString;
use tempfile::TempDir;

/// Builder for constructing test configurations
///
/// Owns a temporary output directory that lives as long as the built
/// [`TestConfig`].
pub struct ConfigBuilder {
    config: Config,
    output_dir: TempDir,
}

/// Configuration plus the output directory backing it
pub struct TestConfig {
    pub config: Config,
    pub output_dir: TempDir,
}

impl ConfigBuilder {
    /// Create a new builder with minimal defaults and no API key
    pub fn new() -> Self {
        let output_dir = tempfile::tempdir().expect("temp dir");

        Self {
            config: Config {
                server: ServerConfig {
                    listen_address: Some(SocketAddr::from(([127, 0, 0, 1], 0))),
                    ..ServerConfig::default()
                },
                storage: StorageConfig {
                    directory: output_dir.path().to_path_buf(),
                },
                ..Config::default()
            },
            output_dir,
        }
    }

    /// Use Gemini pointed at a mock backend
    pub fn with_gemini(mut self, base_url: &str) -> Self {
        self.config.provider = ProviderConfig {
            provider_type: ProviderType::Gemini,
            api_key: Some(SecretString::from("test-key")),
            base_url: Some(base_url.to_owned()),
            ..ProviderConfig::default()
        };
        self
    }

    /// Use `OpenAI` pointed at a mock backend
    pub fn with_openai(mut self, base_url: &str) -> Self {
        self.config.provider = ProviderConfig {
            provider_type: ProviderType::Openai,
            api_key: Some(SecretString::from("test-key")),
            base_url: Some(base_url.to_owned()),
            ..ProviderConfig::default()
        };
        self
    }

    /// Point at a provider but leave the API key unset
    pub fn without_api_key(mut self) -> Self {
        self.config.provider.api_key = None;
        self
    }

    /// Require a shared secret on the generation endpoints
    pub fn with_token(mut self, token: &str) -> Self {
        self.config.auth.token = Some(SecretString::from(token));
        self
    }

    /// Fix the base used for returned links
    pub fn with_public_base_url(mut self, base: &str) -> Self {
        self.config.server.public_base_url = Some(base.to_owned());
        self
    }

    /// Disable health endpoint
    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    /// Build the final config
    pub fn build(self) -> TestConfig {
        TestConfig {
            config: self.config,
            output_dir: self.output_dir,
        }
    }
}

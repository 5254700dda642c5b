use secrecy::SecretString;
use serde::Deserialize;

/// Upstream provider configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Provider type
    #[serde(rename = "type", default)]
    pub provider_type: ProviderType,
    /// API key; a missing key is reported per request, not at startup
    #[serde(default, deserialize_with = "crate::non_empty")]
    pub api_key: Option<SecretString>,
    /// Model override
    #[serde(default, deserialize_with = "crate::non_empty")]
    pub model: Option<String>,
    /// Base URL override
    #[serde(default, deserialize_with = "crate::non_empty")]
    pub base_url: Option<String>,
    /// Upstream request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Sampling temperature (Gemini only)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: ProviderType::default(),
            api_key: None,
            model: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
        }
    }
}

/// Supported image generation providers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    /// Google Gemini image models
    #[default]
    Gemini,
    /// `OpenAI` image generation and edits
    Openai,
}

impl ProviderType {
    /// Conventional environment variable holding this provider's key
    pub fn api_key_var(self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::Openai => "OPENAI_API_KEY",
        }
    }

    /// Conventional environment variable holding this provider's model
    pub fn model_var(self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_MODEL",
            Self::Openai => "OPENAI_IMAGE_MODEL",
        }
    }
}

#[allow(clippy::missing_const_for_fn)]
fn default_timeout_secs() -> u64 {
    180
}

#[allow(clippy::missing_const_for_fn)]
fn default_temperature() -> f32 {
    0.8
}

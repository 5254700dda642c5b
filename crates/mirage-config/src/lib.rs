#![allow(clippy::must_use_candidate)]

pub mod auth;
mod env;
pub mod fetch;
pub mod health;
mod loader;
pub mod normalize;
pub mod provider;
pub mod server;
pub mod storage;
pub mod telemetry;

use serde::{Deserialize, Deserializer};

pub use auth::*;
pub use fetch::*;
pub use health::*;
pub use normalize::*;
pub use provider::*;
pub use server::*;
pub use storage::*;
pub use telemetry::*;

/// Top-level Mirage configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Inbound shared-secret check
    #[serde(default)]
    pub auth: AuthConfig,
    /// Upstream image generation provider
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Outbound fetching of reference, input and mask images
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Canvas used when normalizing input images
    #[serde(default)]
    pub normalize: NormalizeConfig,
    /// Scratch directory for generated files
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Deserialize an optional string, treating blank values as unset
///
/// Environment placeholders with an empty default expand to `""`, so every
/// optional string in the config goes through here.
pub(crate) fn non_empty<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.trim().is_empty()).map(T::from))
}

use std::net::SocketAddr;

use serde::Deserialize;

use crate::health::HealthConfig;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub listen_address: Option<SocketAddr>,
    /// Base used when building returned file URLs
    ///
    /// Inferred from the request's host headers when unset
    #[serde(default, deserialize_with = "crate::non_empty")]
    pub public_base_url: Option<String>,
    #[serde(default)]
    pub health: HealthConfig,
}

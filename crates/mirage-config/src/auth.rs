use secrecy::SecretString;
use serde::Deserialize;

/// Shared-secret check for the generation endpoints
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Expected header value; when unset the endpoints are open
    #[serde(default, deserialize_with = "crate::non_empty")]
    pub token: Option<SecretString>,

    /// Header carrying the token
    #[serde(default = "default_header_name")]
    pub header_name: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token: None,
            header_name: default_header_name(),
        }
    }
}

fn default_header_name() -> String {
    "x-api-token".to_string()
}

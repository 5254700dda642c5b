use serde::Deserialize;

/// Settings for downloading caller-supplied image URLs
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetchConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// `User-Agent` sent with every fetch
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Largest accepted response body in bytes
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
        }
    }
}

#[allow(clippy::missing_const_for_fn)]
fn default_timeout_secs() -> u64 {
    60
}

fn default_user_agent() -> String {
    "MirageImageProxy/1.0".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_max_bytes() -> usize {
    20 * 1024 * 1024
}

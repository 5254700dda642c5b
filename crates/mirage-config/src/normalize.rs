use serde::Deserialize;

/// Canvas that input images are fitted onto before upload
///
/// Only used when the request carries no explicit size
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NormalizeConfig {
    #[serde(default = "default_side")]
    pub width: u32,
    #[serde(default = "default_side")]
    pub height: u32,
    /// RGB color that transparent pixels are composited onto
    #[serde(default = "default_background")]
    pub background: [u8; 3],
    /// Largest width or height a request may ask for
    #[serde(default = "default_max_side")]
    pub max_side: u32,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            width: default_side(),
            height: default_side(),
            background: default_background(),
            max_side: default_max_side(),
        }
    }
}

#[allow(clippy::missing_const_for_fn)]
fn default_side() -> u32 {
    1024
}

#[allow(clippy::missing_const_for_fn)]
fn default_background() -> [u8; 3] {
    [255, 255, 255]
}

#[allow(clippy::missing_const_for_fn)]
fn default_max_side() -> u32 {
    4096
}

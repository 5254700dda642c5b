use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Body of `POST /generate`
#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    /// Text description of the desired image
    #[serde(default)]
    pub prompt: Option<String>,
    /// Image that conditions the generation
    #[serde(default)]
    pub reference_image_url: Option<String>,
    /// Output size, `WIDTHxHEIGHT` or `auto`
    #[serde(default)]
    pub size: Option<String>,
}

/// Body of `POST /edit`
#[derive(Debug, Default, Deserialize)]
pub struct EditRequest {
    /// Edit instructions
    #[serde(default)]
    pub prompt: Option<String>,
    /// Image to edit
    #[serde(default)]
    pub image_url: Option<String>,
    /// PNG whose transparent area marks the region to edit
    #[serde(default)]
    pub mask_url: Option<String>,
    /// Output size, `WIDTHxHEIGHT` or `auto`
    #[serde(default)]
    pub size: Option<String>,
}

/// Successful response for both endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Requested output size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSize {
    Auto,
    Exact { width: u32, height: u32 },
}

/// Aspect ratios Gemini image models accept
const GEMINI_ASPECT_RATIOS: [&str; 10] = ["1:1", "2:3", "3:2", "3:4", "4:3", "4:5", "5:4", "9:16", "16:9", "21:9"];

impl ImageSize {
    /// Pixel dimensions, if explicit
    pub fn dimensions(self) -> Option<(u32, u32)> {
        match self {
            Self::Auto => None,
            Self::Exact { width, height } => Some((width, height)),
        }
    }

    /// Reduced `W:H` ratio when it is one Gemini supports
    pub fn gemini_aspect_ratio(self) -> Option<String> {
        let (width, height) = self.dimensions()?;
        let divisor = gcd(width, height);
        let ratio = format!("{}:{}", width / divisor, height / divisor);

        GEMINI_ASPECT_RATIOS.contains(&ratio.as_str()).then_some(ratio)
    }
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 { a } else { gcd(b, a % b) }
}

impl FromStr for ImageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }

        let invalid = || format!("Invalid size '{s}': expected WIDTHxHEIGHT or auto");

        let (width, height) = s.split_once(['x', 'X']).ok_or_else(invalid)?;
        let width: u32 = width.trim().parse().map_err(|_| invalid())?;
        let height: u32 = height.trim().parse().map_err(|_| invalid())?;

        if width == 0 || height == 0 {
            return Err(invalid());
        }

        Ok(Self::Exact { width, height })
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Exact { width, height } => write!(f, "{width}x{height}"),
        }
    }
}

/// Image formats accepted from callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMime {
    Png,
    Jpeg,
    Webp,
}

impl ImageMime {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }

    /// Parse a `Content-Type` header value, ignoring parameters
    pub fn from_content_type(value: &str) -> Option<Self> {
        let essence = value.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();

        match essence.as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Detect the format from magic bytes
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match image::guess_format(bytes).ok()? {
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::WebP => Some(Self::Webp),
            _ => None,
        }
    }
}

/// An image downloaded from a caller-supplied URL
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub bytes: Vec<u8>,
    pub mime: ImageMime,
}

/// Provider-neutral unit of work
#[derive(Debug)]
pub struct ImageJob {
    pub prompt: String,
    pub size: Option<ImageSize>,
    pub kind: JobKind,
}

#[derive(Debug)]
pub enum JobKind {
    /// New image, optionally conditioned on a reference
    Generate { reference: Option<SourceImage> },
    /// Modify `image`, limited to the transparent area of `mask` when given
    Edit {
        image: SourceImage,
        mask: Option<SourceImage>,
    },
}

/// Raw image bytes decoded from a provider response
#[derive(Debug)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
}

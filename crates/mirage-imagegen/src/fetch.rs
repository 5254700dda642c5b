use std::time::Duration;

use mirage_config::FetchConfig;
use reqwest::{Client, header::CONTENT_TYPE};

use crate::{
    error::{ImageGenError, Result},
    http_client::http_client,
    types::{ImageMime, SourceImage},
};

/// Downloads caller-supplied images
#[derive(Clone)]
pub(crate) struct Fetcher {
    client: Client,
    max_bytes: usize,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(Duration::from_secs(config.timeout_secs), &config.user_agent)?,
            max_bytes: config.max_bytes,
        })
    }

    /// Fetch an image of any accepted format
    ///
    /// `what` names the image in error messages ("reference image", "mask").
    pub async fn fetch(&self, url: &str, what: &str) -> Result<SourceImage> {
        let fail = |reason: String| ImageGenError::FetchFailed(format!("Cannot fetch {what}: {reason}"));

        let parsed = reqwest::Url::parse(url.trim()).map_err(|e| fail(format!("invalid URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(fail(format!("unsupported URL scheme '{}'", parsed.scheme())));
        }

        tracing::debug!(%url, what, "fetching image");

        let mut response = self.client.get(parsed).send().await.map_err(|e| fail(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("server responded with {status}")));
        }

        let declared = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let declared_mime = match declared.as_deref() {
            Some(content_type) if !is_opaque(content_type) => Some(
                ImageMime::from_content_type(content_type)
                    .ok_or_else(|| fail(format!("unsupported content type '{content_type}'")))?,
            ),
            _ => None,
        };

        if response.content_length().is_some_and(|len| len > self.max_bytes as u64) {
            return Err(fail(format!("image larger than {} bytes", self.max_bytes)));
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| fail(e.to_string()))? {
            if bytes.len() + chunk.len() > self.max_bytes {
                return Err(fail(format!("image larger than {} bytes", self.max_bytes)));
            }
            bytes.extend_from_slice(&chunk);
        }

        let mime = match declared_mime {
            Some(mime) => mime,
            None => ImageMime::sniff(&bytes).ok_or_else(|| fail("content is not a PNG, JPEG or WEBP image".to_string()))?,
        };

        tracing::debug!(what, size = bytes.len(), mime = mime.as_str(), "image fetched");

        Ok(SourceImage { bytes, mime })
    }

    /// Fetch an image that must be a PNG
    pub async fn fetch_png(&self, url: &str, what: &str) -> Result<SourceImage> {
        let image = self.fetch(url, what).await?;

        if image.mime != ImageMime::Png {
            return Err(ImageGenError::FetchFailed(format!(
                "Cannot use {what}: expected image/png, got {}",
                image.mime.as_str()
            )));
        }

        Ok(image)
    }
}

/// Content types that say nothing about the payload, so the bytes decide
fn is_opaque(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    essence.is_empty() || essence.eq_ignore_ascii_case("application/octet-stream")
}

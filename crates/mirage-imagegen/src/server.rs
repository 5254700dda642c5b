use std::time::Duration;

use axum::http::HeaderMap;
use mirage_config::{Config, ProviderType};
use serde::de::DeserializeOwned;

use crate::{
    error::{ImageGenError, Result},
    fetch::Fetcher,
    http_client::http_client,
    image_ops,
    provider::{ImageProvider, gemini::GeminiProvider, openai::OpenAiProvider},
    public_url::{file_url, public_base},
    storage::FileStore,
    types::{EditRequest, GenerateRequest, ImageJob, ImageSize, ImageUrl, JobKind},
};

const USER_AGENT: &str = concat!("mirage/", env!("CARGO_PKG_VERSION"));

/// Image proxy: validates requests, calls the provider, stores the result
pub struct Server {
    /// `None` when no API key is configured; every call then fails with 500
    provider: Option<Box<dyn ImageProvider>>,
    provider_type: ProviderType,
    fetcher: Fetcher,
    store: FileStore,
    public_base_url: Option<String>,
    /// Largest width or height accepted in `size`
    max_side: u32,
}

impl Server {
    /// Handle `POST /generate`
    pub async fn generate(&self, body: &[u8], headers: &HeaderMap) -> Result<ImageUrl> {
        let provider = self.provider()?;
        let request: GenerateRequest = parse_body(body)?;

        let prompt = required(request.prompt, "Missing prompt")?;
        let size = parse_size(request.size.as_deref(), self.max_side)?;

        let reference = match non_blank(request.reference_image_url.as_deref()) {
            Some(url) => Some(self.fetcher.fetch(url, "reference image").await?),
            None => None,
        };

        let job = ImageJob {
            prompt,
            size,
            kind: JobKind::Generate { reference },
        };

        self.run(provider, &job, headers).await
    }

    /// Handle `POST /edit`
    pub async fn edit(&self, body: &[u8], headers: &HeaderMap) -> Result<ImageUrl> {
        let provider = self.provider()?;
        let request: EditRequest = parse_body(body)?;

        let prompt = required(request.prompt, "Missing prompt")?;
        let image_url = required(request.image_url, "Missing image_url")?;
        let size = parse_size(request.size.as_deref(), self.max_side)?;

        let image = self.fetcher.fetch(&image_url, "image").await?;
        let mask = match non_blank(request.mask_url.as_deref()) {
            Some(url) => Some(self.fetcher.fetch_png(url, "mask").await?),
            None => None,
        };

        let job = ImageJob {
            prompt,
            size,
            kind: JobKind::Edit { image, mask },
        };

        self.run(provider, &job, headers).await
    }

    /// Read a previously stored image
    pub async fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        self.store.read(name).await
    }

    async fn run(&self, provider: &dyn ImageProvider, job: &ImageJob, headers: &HeaderMap) -> Result<ImageUrl> {
        tracing::debug!(provider = provider.name(), size = ?job.size.map(|s| s.to_string()), "rendering image");

        let generated = provider.render(job).await?;
        let png = image_ops::blocking(move || image_ops::ensure_png(generated.bytes)).await?;
        let name = self.store.save(&png).await?;

        let url = file_url(&public_base(self.public_base_url.as_deref(), headers), &name);

        tracing::info!(provider = provider.name(), file = %name, "image stored");

        Ok(ImageUrl { url })
    }

    fn provider(&self) -> Result<&dyn ImageProvider> {
        self.provider.as_deref().ok_or_else(|| {
            ImageGenError::ConfigError(format!(
                "{} is not set on server",
                self.provider_type.api_key_var()
            ))
        })
    }
}

/// Parse a JSON body, treating an empty body as `{}`
fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    serde_json::from_slice(body).map_err(|e| {
        if e.is_data() {
            ImageGenError::InvalidRequest(format!("Invalid request body: {e}"))
        } else {
            ImageGenError::InvalidRequest("Invalid JSON".to_string())
        }
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn required(value: Option<String>, message: &str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ImageGenError::InvalidRequest(message.to_string()))
}

/// Parse an optional size, rejecting dimensions above `max_side`
///
/// Pixel buffers are sized from this value, so it must be bounded before
/// any decoding or canvas work happens.
fn parse_size(value: Option<&str>, max_side: u32) -> Result<Option<ImageSize>> {
    let size = non_blank(value)
        .map(str::parse::<ImageSize>)
        .transpose()
        .map_err(ImageGenError::InvalidRequest)?;

    if let Some((width, height)) = size.and_then(ImageSize::dimensions)
        && (width > max_side || height > max_side)
    {
        return Err(ImageGenError::InvalidRequest(format!(
            "Invalid size '{width}x{height}': width and height must not exceed {max_side}"
        )));
    }

    Ok(size)
}

/// Builder for constructing the image proxy from configuration
pub struct ImageGenServerBuilder<'a> {
    config: &'a Config,
}

impl<'a> ImageGenServerBuilder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn build(self) -> Result<Server> {
        let provider_config = &self.config.provider;
        let fetcher = Fetcher::new(&self.config.fetch)?;

        let provider: Option<Box<dyn ImageProvider>> = match provider_config.api_key.clone() {
            None => {
                tracing::warn!(
                    provider = ?provider_config.provider_type,
                    "no upstream API key configured; generation requests will fail"
                );
                None
            }
            Some(api_key) => {
                let client = http_client(Duration::from_secs(provider_config.timeout_secs), USER_AGENT)?;

                let provider: Box<dyn ImageProvider> = match provider_config.provider_type {
                    ProviderType::Gemini => Box::new(GeminiProvider::new(
                        client,
                        api_key,
                        provider_config.base_url.clone(),
                        provider_config.model.clone(),
                        provider_config.temperature,
                    )),
                    ProviderType::Openai => Box::new(OpenAiProvider::new(
                        client,
                        api_key,
                        provider_config.base_url.clone(),
                        provider_config.model.clone(),
                        self.config.normalize.clone(),
                        fetcher.clone(),
                    )),
                };

                Some(provider)
            }
        };

        let store = FileStore::new(self.config.storage.directory.clone());

        if let Some(ref provider) = provider {
            tracing::debug!(
                provider = provider.name(),
                directory = %store.directory().display(),
                "image proxy initialized"
            );
        }

        Ok(Server {
            provider,
            provider_type: provider_config.provider_type,
            fetcher,
            store,
            public_base_url: self.config.server.public_base_url.clone(),
            max_side: self.config.normalize.max_side,
        })
    }
}

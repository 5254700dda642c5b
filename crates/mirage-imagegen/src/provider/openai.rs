use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use mirage_config::NormalizeConfig;
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ImageProvider, check_status, read_body};
use crate::{
    error::{ImageGenError, Result},
    fetch::Fetcher,
    image_ops,
    types::{GeneratedImage, ImageJob, JobKind, SourceImage},
};

/// Default `OpenAI` API base URL
pub(crate) const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default image model
pub(crate) const DEFAULT_MODEL: &str = "gpt-image-1";

const PROVIDER: &str = "OpenAI";

/// `OpenAI` image generation and edit provider
///
/// Edits need a PNG canvas and a mask of the same dimensions, so input
/// images are normalized here before upload.
pub(crate) struct OpenAiProvider {
    client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    canvas: NormalizeConfig,
    fetcher: Fetcher,
}

impl OpenAiProvider {
    pub fn new(
        client: Client,
        api_key: SecretString,
        base_url: Option<String>,
        model: Option<String>,
        canvas: NormalizeConfig,
        fetcher: Fetcher,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            canvas,
            fetcher,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/images/{path}", self.base_url.trim_end_matches('/'))
    }

    /// Canvas dimensions: the requested size, else the configured default
    fn canvas_dimensions(&self, job: &ImageJob) -> (u32, u32) {
        job.size
            .and_then(|size| size.dimensions())
            .unwrap_or((self.canvas.width, self.canvas.height))
    }

    async fn generate(&self, job: &ImageJob) -> Result<reqwest::Response> {
        let wire_request = OpenAiImageRequest {
            model: &self.model,
            prompt: &job.prompt,
            n: 1,
            size: job.size.map(|size| size.to_string()),
        };

        self.client
            .post(self.endpoint("generations"))
            .bearer_auth(self.api_key.expose_secret())
            .json(&wire_request)
            .send()
            .await
            .map_err(connection_error)
    }

    async fn edit(&self, job: &ImageJob, image: &SourceImage, mask: Option<&SourceImage>) -> Result<reqwest::Response> {
        let (width, height) = self.canvas_dimensions(job);
        let background = self.canvas.background;
        let image_bytes = image.bytes.clone();
        let mask_bytes = mask.map(|mask| mask.bytes.clone());

        let (image_png, mask_png) = image_ops::blocking(move || {
            let image_png = image_ops::normalize(&image_bytes, width, height, background)?;
            let mask_png = match mask_bytes {
                Some(bytes) => image_ops::fit_mask(&bytes, width, height)?,
                None => image_ops::transparent_mask(width, height)?,
            };
            Ok((image_png, mask_png))
        })
        .await?;

        tracing::debug!(
            provider = PROVIDER,
            width,
            height,
            explicit_mask = mask.is_some(),
            "normalized edit input"
        );

        let mut form = Form::new()
            .text("model", self.model.clone())
            .text("prompt", job.prompt.clone())
            .text("n", "1")
            .part("image", png_part(image_png, "image.png")?)
            .part("mask", png_part(mask_png, "mask.png")?);

        if let Some(size) = job.size {
            form = form.text("size", size.to_string());
        }

        self.client
            .post(self.endpoint("edits"))
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(connection_error)
    }

    /// Decode the first entry of `data`, downloading it when only a URL is given
    async fn extract_image(&self, body: Value) -> Result<GeneratedImage> {
        let entry = OpenAiImageResponse::deserialize(&body)
            .ok()
            .and_then(|response| response.data.into_iter().next());

        match entry {
            Some(OpenAiImageData { b64_json: Some(b64), .. }) => match STANDARD.decode(b64.trim()) {
                Ok(bytes) => Ok(GeneratedImage { bytes }),
                Err(_) => Err(ImageGenError::NoImageInResponse { raw: body }),
            },
            Some(OpenAiImageData { url: Some(url), .. }) => {
                tracing::debug!(provider = PROVIDER, "downloading generated image");

                let image = self.fetcher.fetch(&url, "generated image").await.map_err(|e| {
                    ImageGenError::ConnectionError {
                        provider: PROVIDER,
                        message: e.to_string(),
                    }
                })?;

                Ok(GeneratedImage { bytes: image.bytes })
            }
            _ => Err(ImageGenError::NoImageInResponse { raw: body }),
        }
    }
}

fn png_part(bytes: Vec<u8>, file_name: &'static str) -> Result<Part> {
    Part::bytes(bytes)
        .file_name(file_name)
        .mime_str("image/png")
        .map_err(|e| ImageGenError::InternalError(Some(format!("invalid multipart content type: {e}"))))
}

fn connection_error(e: reqwest::Error) -> ImageGenError {
    tracing::error!(provider = PROVIDER, error = %e, "image generation request failed");
    ImageGenError::ConnectionError {
        provider: PROVIDER,
        message: e.to_string(),
    }
}

/// Wire format for `POST /images/generations`
#[derive(Serialize)]
struct OpenAiImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<String>,
}

/// Wire format shared by generation and edit responses
#[derive(Deserialize)]
struct OpenAiImageResponse {
    #[serde(default)]
    data: Vec<OpenAiImageData>,
}

#[derive(Deserialize)]
struct OpenAiImageData {
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[async_trait]
impl ImageProvider for OpenAiProvider {
    async fn render(&self, job: &ImageJob) -> Result<GeneratedImage> {
        tracing::debug!(provider = PROVIDER, model = %self.model, "sending image generation request");

        let response = match &job.kind {
            JobKind::Generate { reference: None } => self.generate(job).await?,
            JobKind::Generate {
                reference: Some(reference),
            } => self.edit(job, reference, None).await?,
            JobKind::Edit { image, mask } => self.edit(job, image, mask.as_ref()).await?,
        };

        let status = response.status();
        let body = check_status(PROVIDER, status, read_body(PROVIDER, response).await?)?;

        let image = self.extract_image(body).await?;

        tracing::debug!(provider = PROVIDER, size = image.bytes.len(), "image generation request complete");

        Ok(image)
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}

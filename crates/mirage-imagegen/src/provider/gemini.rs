//! Google Gemini `generateContent` adapter

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ImageProvider, check_status, read_body};
use crate::{
    error::{ImageGenError, Result},
    types::{GeneratedImage, ImageJob, JobKind, SourceImage},
};

/// Default Google Generative Language API base URL
pub(crate) const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default image-capable model
pub(crate) const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

const PROVIDER: &str = "Gemini";

/// Gemini image generation provider
pub(crate) struct GeminiProvider {
    client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    temperature: f32,
}

impl GeminiProvider {
    pub fn new(
        client: Client,
        api_key: SecretString,
        base_url: Option<String>,
        model: Option<String>,
        temperature: f32,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature,
        }
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn build_request<'a>(&self, job: &'a ImageJob) -> GeminiRequest<'a> {
        let mut parts = Vec::new();

        match &job.kind {
            JobKind::Generate { reference } => {
                parts.push(Part::text(format!(
                    "Create a NEW photorealistic image from the instructions below. \
                     Do not copy any reference image exactly.\n\nInstructions: {}",
                    job.prompt
                )));
                if let Some(reference) = reference {
                    parts.push(Part::inline(reference));
                }
            }
            JobKind::Edit { image, mask } => {
                parts.push(Part::text(format!(
                    "Edit the provided image according to the instructions below. \
                     Keep everything that the instructions do not mention.\n\nInstructions: {}",
                    job.prompt
                )));
                parts.push(Part::inline(image));
                if let Some(mask) = mask {
                    parts.push(Part::text(
                        "Only change the regions that are transparent in the following mask image.".to_string(),
                    ));
                    parts.push(Part::inline(mask));
                }
            }
        }

        GeminiRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                response_modalities: ["IMAGE"],
                temperature: self.temperature,
                image_config: job
                    .size
                    .and_then(|size| size.gemini_aspect_ratio())
                    .map(|aspect_ratio| ImageConfig { aspect_ratio }),
            },
        }
    }
}

/// Wire format for `generateContent`
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: String },
    Inline { inline_data: InlineData<'a> },
}

impl<'a> Part<'a> {
    fn text(text: String) -> Self {
        Self::Text { text }
    }

    fn inline(image: &'a SourceImage) -> Self {
        Self::Inline {
            inline_data: InlineData {
                mime_type: image.mime.as_str(),
                data: STANDARD.encode(&image.bytes),
            },
        }
    }
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: [&'static str; 1],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<ImageConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: String,
}

/// Response shape, tolerant of both field naming conventions
///
/// Current responses use `inlineData`/`mimeType`, older ones
/// `inline_data`/`mime_type`; anything else is ignored.
#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(rename = "inlineData", alias = "inline_data")]
    inline_data: Option<ResponseInlineData>,
}

#[derive(Deserialize)]
struct ResponseInlineData {
    data: String,
}

/// Pull the first decodable inline image out of a response body
fn extract_image(body: &Value) -> Option<Vec<u8>> {
    let response = GeminiResponse::deserialize(body).ok()?;

    response
        .candidates
        .into_iter()
        .filter_map(|candidate| candidate.content)
        .flat_map(|content| content.parts)
        .filter_map(|part| part.inline_data)
        .find_map(|inline| STANDARD.decode(inline.data.trim()).ok())
}

#[async_trait]
impl ImageProvider for GeminiProvider {
    async fn render(&self, job: &ImageJob) -> Result<GeneratedImage> {
        let wire_request = self.build_request(job);

        tracing::debug!(
            provider = PROVIDER,
            model = %self.model,
            parts = wire_request.contents[0].parts.len(),
            "sending image generation request"
        );

        let response = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&wire_request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(provider = PROVIDER, error = %e, "image generation request failed");
                ImageGenError::ConnectionError {
                    provider: PROVIDER,
                    message: e.to_string(),
                }
            })?;

        let status = response.status();
        let body = check_status(PROVIDER, status, read_body(PROVIDER, response).await?)?;

        let Some(bytes) = extract_image(&body) else {
            tracing::error!(provider = PROVIDER, "no image in upstream response");
            return Err(ImageGenError::NoImageInResponse { raw: body });
        };

        tracing::debug!(provider = PROVIDER, size = bytes.len(), "image generation request complete");

        Ok(GeneratedImage { bytes })
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}

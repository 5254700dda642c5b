pub(crate) mod gemini;
pub(crate) mod openai;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    error::{ImageGenError, Result},
    types::{GeneratedImage, ImageJob},
};

/// Trait for image generation provider implementations
#[async_trait]
pub(crate) trait ImageProvider: Send + Sync {
    /// Produce one image for the job
    async fn render(&self, job: &ImageJob) -> Result<GeneratedImage>;

    /// Get the provider name
    fn name(&self) -> &'static str;
}

/// Read an upstream response, keeping non-JSON bodies as raw text
async fn read_body(provider: &'static str, response: reqwest::Response) -> Result<Value> {
    let text = response.text().await.map_err(|e| {
        tracing::error!(provider, error = %e, "failed to read upstream response body");
        ImageGenError::ConnectionError {
            provider,
            message: e.to_string(),
        }
    })?;

    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

/// Turn a non-success status into an error carrying the payload
fn check_status(provider: &'static str, status: reqwest::StatusCode, body: Value) -> Result<Value> {
    if status.is_success() {
        return Ok(body);
    }

    tracing::error!(provider, status = %status, "upstream API error");

    Err(ImageGenError::ProviderApiError {
        provider,
        status: status.as_u16(),
        payload: body,
    })
}

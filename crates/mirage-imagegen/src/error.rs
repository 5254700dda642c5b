use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ImageGenError>;

/// Image proxy errors with appropriate HTTP status codes
#[derive(Debug, Error)]
pub enum ImageGenError {
    /// Missing or malformed request fields
    #[error("{0}")]
    InvalidRequest(String),

    /// A caller-supplied image URL could not be used
    #[error("{0}")]
    FetchFailed(String),

    /// Inbound shared secret missing or wrong
    #[error("Unauthorized")]
    Unauthorized,

    /// Requested output file does not exist
    #[error("File not found")]
    FileNotFound,

    /// Server-side configuration is incomplete
    #[error("{0}")]
    ConfigError(String),

    /// Network failure talking to the provider
    #[error("{provider} network error: {message}")]
    ConnectionError { provider: &'static str, message: String },

    /// Provider answered with a non-success status
    #[error("{provider} API error ({status})")]
    ProviderApiError {
        provider: &'static str,
        status: u16,
        payload: Value,
    },

    /// Provider answered without a recognizable image
    #[error("No image in response")]
    NoImageInResponse { raw: Value },

    /// Provider returned bytes that are not a decodable image
    #[error("Upstream returned an undecodable image: {0}")]
    UndecodableImage(String),

    /// Internal server error
    /// If Some(message), it is safe to show to the caller
    /// If None, details stay in the logs
    #[error("Internal server error")]
    InternalError(Option<String>),
}

impl ImageGenError {
    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::FetchFailed(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::FileNotFound => StatusCode::NOT_FOUND,
            Self::ConfigError(_) | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConnectionError { .. }
            | Self::ProviderApiError { .. }
            | Self::NoImageInResponse { .. }
            | Self::UndecodableImage(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Value placed under the `error` key of the response body
    ///
    /// Upstream failures keep the provider's payload intact
    pub fn client_payload(&self) -> Value {
        match self {
            Self::ProviderApiError { status, payload, .. } => json!({
                "upstream_status": status,
                "upstream_error": payload,
            }),
            Self::NoImageInResponse { raw } => json!({
                "message": self.to_string(),
                "raw": raw,
            }),
            Self::InternalError(Some(message)) => Value::String(message.clone()),
            _ => Value::String(self.to_string()),
        }
    }
}

impl IntoResponse for ImageGenError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({ "error": self.client_payload() });

        (status, Json(body)).into_response()
    }
}

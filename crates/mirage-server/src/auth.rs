use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::HeaderName;
use mirage_imagegen::ImageGenError;
use secrecy::{ExposeSecret, SecretString};

/// Require the configured shared secret on the wrapped routes
///
/// Compares the full header value against the token; any mismatch,
/// including a missing header, is a 401.
pub async fn token_middleware(header_name: HeaderName, token: SecretString, request: Request, next: Next) -> Response {
    let presented = request.headers().get(&header_name).and_then(|v| v.to_str().ok());

    match presented {
        Some(value) if constant_time_eq(value.as_bytes(), token.expose_secret().as_bytes()) => {
            next.run(request).await
        }
        _ => {
            tracing::warn!(path = %request.uri().path(), "rejected request with missing or invalid token");
            ImageGenError::Unauthorized.into_response()
        }
    }
}

/// Compare without short-circuiting on the first differing byte
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

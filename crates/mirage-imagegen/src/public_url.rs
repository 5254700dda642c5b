use axum::http::{HeaderMap, header::HOST};

/// Route prefix under which stored files are served
pub const FILES_PATH: &str = "/files";

/// Base URL for links handed back to callers
///
/// The configured base wins; otherwise the request's forwarding and host
/// headers are used. Without any host the link is relative.
pub(crate) fn public_base(configured: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(base) = configured {
        return base.trim_end_matches('/').to_string();
    }

    let host = first_value(headers, "x-forwarded-host").or_else(|| first_value(headers, HOST.as_str()));

    match host {
        Some(host) => {
            let scheme = first_value(headers, "x-forwarded-proto").unwrap_or("http");
            format!("{scheme}://{host}")
        }
        None => String::new(),
    }
}

/// First entry of a possibly comma-separated header
fn first_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Link to a stored file
pub(crate) fn file_url(base: &str, name: &str) -> String {
    format!("{base}{FILES_PATH}/{name}")
}

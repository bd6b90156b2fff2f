//! Endpoint URL handling
//!
//! Users may configure either a server base URL (`http://host:11434`) or the
//! full chat URL (`http://host:11434/api/chat`); both resolve to the same
//! request target.

use std::error::Error;

pub const CHAT_PATH: &str = "api/chat";

/// Normalize a base URL by removing trailing slashes
///
/// ```
/// use promptstream::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:11434/"), "http://localhost:11434");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Join a base URL and an endpoint path with exactly one slash between them
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{normalized_base}/{endpoint}")
}

/// Resolve a configured endpoint to the chat URL, validating it on the way.
///
/// ```
/// use promptstream::utils::url::chat_endpoint;
///
/// assert_eq!(
///     chat_endpoint("http://localhost:11434").unwrap(),
///     "http://localhost:11434/api/chat"
/// );
/// ```
pub fn chat_endpoint(configured: &str) -> Result<String, Box<dyn Error>> {
    let normalized = normalize_base_url(configured);
    let full = if normalized.ends_with(&format!("/{CHAT_PATH}")) {
        normalized
    } else {
        construct_api_url(&normalized, CHAT_PATH)
    };

    let parsed = reqwest::Url::parse(&full)
        .map_err(|err| format!("Invalid endpoint URL '{configured}': {err}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(full),
        other => Err(format!("Unsupported endpoint scheme '{other}' in '{configured}'").into()),
    }
}

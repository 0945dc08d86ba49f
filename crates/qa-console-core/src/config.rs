//! Environment-resolved configuration for reaching the QA server.

use crate::error::{ClientError, Result};

/// Default server location; the original menu binds port 9000.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:9000";
pub const ENV_BASE_URL: &str = "QA_CONSOLE_BASE_URL";

/// Resolve the base URL from the environment, reporting the source that
/// supplied it.
pub fn resolve_base_url() -> Result<(String, &'static str)> {
    if let Some(base_url) = env_non_empty(ENV_BASE_URL) {
        return normalize_base_url(&base_url).map(|normalized| (normalized, ENV_BASE_URL));
    }
    normalize_base_url(DEFAULT_BASE_URL).map(|normalized| (normalized, "default_local"))
}

/// Trim and validate a base URL: http(s) scheme, a host, no trailing slash.
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ClientError::InvalidUrl("base url must not be empty".to_string()));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ClientError::InvalidUrl(
            "base url must use http:// or https:// and include a host".to_string(),
        ));
    }
    let Some((_, remainder)) = trimmed.split_once("://") else {
        return Err(ClientError::InvalidUrl("base url has no host".to_string()));
    };
    if remainder.trim().is_empty() || remainder.starts_with('/') {
        return Err(ClientError::InvalidUrl("base url has no host".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Derive the push-channel URL from a normalized base URL: the scheme flips
/// to ws(s) and the channel lives at `/ws`.
pub fn push_channel_url(base_url: &str) -> Result<String> {
    let normalized = normalize_base_url(base_url)?;
    let ws = if let Some(rest) = normalized.strip_prefix("https://") {
        format!("wss://{rest}/ws")
    } else if let Some(rest) = normalized.strip_prefix("http://") {
        format!("ws://{rest}/ws")
    } else {
        return Err(ClientError::InvalidUrl(normalized));
    };
    Ok(ws)
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

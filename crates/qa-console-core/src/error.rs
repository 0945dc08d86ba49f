//! Client error types.

use thiserror::Error;

/// Error taxonomy shared by all console components.
///
/// Every variant is handled locally by the component that produced it; none
/// of them escalate past a log line and the last known-good UI state.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure on a submission POST or debug GET.
    #[error("network error: {0}")]
    Network(String),

    /// Response body does not match the expected JSON shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Push frame is not valid JSON or lacks a recognized key.
    #[error("push frame parse error: {0}")]
    Parse(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("not connected")]
    NotConnected,

    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
}

/// Client result type.
pub type Result<T> = std::result::Result<T, ClientError>;

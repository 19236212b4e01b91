use alloy::rpc::json_rpc::ErrorPayload;
use http::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Errors returned by an [`Upstream`](super::Upstream).
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The request could not be sent or the response could not be read.
    #[error("upstream transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The upstream node answered with a non-success HTTP status.
    #[error("upstream answered with http status {0}")]
    Status(StatusCode),
    /// The response is not a JSON-RPC response object.
    #[error("invalid upstream response: {0}")]
    Json(#[from] serde_json::Error),
    /// The upstream node answered with a JSON-RPC error.
    #[error("upstream rpc error {}: {}", .0.code, .0.message)]
    ErrorResponse(ErrorPayload<Value>),
    /// The response carries neither `result` nor `error`.
    #[error("upstream response has no result")]
    MissingResult,
}

impl UpstreamError {
    /// Returns the JSON-RPC error returned by upstream, if any.
    pub const fn as_error_resp(&self) -> Option<&ErrorPayload<Value>> {
        match self {
            Self::ErrorResponse(payload) => Some(payload),
            _ => None,
        }
    }
}

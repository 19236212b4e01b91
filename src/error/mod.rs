//! Relay error types.
use crate::upstream::UpstreamError;
use alloy::rpc::json_rpc::ErrorPayload;
use serde_json::Value;
use thiserror::Error;

mod abi;
pub use abi::{DecodingError, EncodingError};

mod signing;
pub use signing::SigningError;

mod transaction;
pub use transaction::DecodeError;

/// The overarching error type of an intercepted request.
///
/// Every variant is terminal for the request it occurred in and is answered with an empty HTTP
/// 500 response.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The inbound raw transaction could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// A contract call could not be encoded.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    /// A contract call result could not be decoded.
    #[error(transparent)]
    Decoding(#[from] DecodingError),
    /// One of the signers failed.
    #[error(transparent)]
    Signing(#[from] SigningError),
    /// The upstream node could not be reached or answered with an error.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    /// The inbound JSON-RPC request is missing or has malformed parameters.
    #[error("invalid params for {method}: {reason}")]
    InvalidParams {
        /// The inbound method.
        method: &'static str,
        /// What is wrong with the parameters.
        reason: String,
    },
    /// A batch request carries a method the relay has to intercept.
    #[error("{0} is not supported in batch requests")]
    InterceptedInBatch(&'static str),
    /// The inbound body is not valid JSON.
    #[error("invalid request body: {0}")]
    InvalidBody(#[from] serde_json::Error),
}

impl RelayError {
    /// Creates a [`RelayError::InvalidParams`].
    pub fn invalid_params(method: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParams { method, reason: reason.into() }
    }

    /// Returns `true` if the error points at a defect in the relay itself rather than at bad
    /// input or an unavailable upstream.
    pub const fn is_internal_defect(&self) -> bool {
        matches!(self, Self::Encoding(_))
    }

    /// Returns `true` if the error was caused by the upstream node.
    pub const fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream(_))
    }

    /// Returns the JSON-RPC error the upstream node answered with, if any.
    pub const fn rpc_error(&self) -> Option<&ErrorPayload<Value>> {
        match self {
            Self::Upstream(err) => err.as_error_resp(),
            _ => None,
        }
    }

    /// A short label of the error class, used as a log field.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::Encoding(_) => "encoding",
            Self::Decoding(_) => "decoding",
            Self::Signing(_) => "signing",
            Self::Upstream(_) => "upstream",
            Self::InvalidParams { .. } | Self::InterceptedInBatch(_) | Self::InvalidBody(_) => {
                "request"
            }
        }
    }
}

use thiserror::Error;

/// Errors returned by the relay signers.
#[derive(Debug, Error)]
pub enum SigningError {
    /// Key material could not be parsed.
    #[error("invalid {scheme} key: {reason}")]
    InvalidKey {
        /// The signature scheme of the key.
        scheme: &'static str,
        /// Why the key is rejected.
        reason: String,
    },
    /// The post-quantum signer failed to produce a signature.
    #[error("post-quantum signer failed: {0}")]
    PostQuantum(String),
    /// The ECDSA signer failed to produce a signature.
    #[error(transparent)]
    Ecdsa(#[from] alloy::signers::Error),
}

//! Relay signers.

mod bundle;
pub use bundle::DualSignatureBundle;

mod falcon;
pub use falcon::FalconSigner;

mod operator;
pub use operator::OperatorSigner;

use crate::error::SigningError;
use alloy::primitives::Bytes;

/// Trait for a post-quantum payload signer.
///
/// Signing is a pure function of the key and the payload, so a signer is shared read-only by all
/// requests.
pub trait PayloadSigner: std::fmt::Debug + Send + Sync {
    /// Returns the encoded public key matching the signatures.
    fn public_key(&self) -> Bytes;

    /// Signs the raw payload bytes, returning a detached signature.
    fn sign_payload(&self, payload: &[u8]) -> Result<Bytes, SigningError>;
}

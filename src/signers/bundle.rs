//! Dual signature bundle.
use super::PayloadSigner;
use crate::{
    error::{EncodingError, SigningError},
    types::abi,
};
use alloy::{
    dyn_abi::DynSolValue,
    primitives::{B256, Bytes, Signature, U256},
};

/// The arguments of `relayMetaTx`: the original sender's ECDSA signature and a post-quantum
/// signature, both over the same signing payload.
///
/// Constructed per request and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DualSignatureBundle {
    /// The signing payload of the original transaction.
    pub signing_payload: Bytes,
    /// Recovery id of the original signature, `0` or `1`.
    pub v: u8,
    /// `r` of the original signature.
    pub r: B256,
    /// `s` of the original signature.
    pub s: B256,
    /// Public key of the post-quantum signer.
    pub pq_public_key: Bytes,
    /// Post-quantum signature over [`Self::signing_payload`].
    pub pq_signature: Bytes,
}

impl DualSignatureBundle {
    /// Composes a bundle.
    ///
    /// The ECDSA signature is taken as is, it is neither re-derived nor verified. The
    /// post-quantum signer is invoked exactly once, on the exact payload bytes.
    pub fn compose(
        signing_payload: Bytes,
        signature: &Signature,
        pq_signer: &dyn PayloadSigner,
    ) -> Result<Self, SigningError> {
        let pq_signature = pq_signer.sign_payload(&signing_payload)?;
        Ok(Self {
            signing_payload,
            v: signature.v() as u8,
            r: B256::from(signature.r().to_be_bytes::<32>()),
            s: B256::from(signature.s().to_be_bytes::<32>()),
            pq_public_key: pq_signer.public_key(),
            pq_signature,
        })
    }

    /// Returns the six positional `relayMetaTx` arguments.
    pub fn into_call_arguments(self) -> Result<Vec<DynSolValue>, EncodingError> {
        Ok(vec![
            DynSolValue::Bytes(self.signing_payload.into()),
            DynSolValue::Uint(U256::from(self.v), 8),
            abi::fixed_bytes(self.r.as_slice())?,
            abi::fixed_bytes(self.s.as_slice())?,
            DynSolValue::Bytes(self.pq_public_key.into()),
            DynSolValue::Bytes(self.pq_signature.into()),
        ])
    }
}

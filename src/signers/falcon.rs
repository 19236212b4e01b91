//! Falcon-512 payload signer.
use super::PayloadSigner;
use crate::error::SigningError;
use alloy::{hex, primitives::Bytes};
use pqcrypto_falcon::falcon512;
use pqcrypto_traits::sign::{DetachedSignature as _, PublicKey as _, SecretKey as _};
use std::fmt;

const SCHEME: &str = "falcon-512";

/// A [`PayloadSigner`] producing detached Falcon-512 signatures.
#[derive(Clone)]
pub struct FalconSigner {
    secret_key: falcon512::SecretKey,
    public_key: falcon512::PublicKey,
}

impl fmt::Debug for FalconSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FalconSigner")
            .field(&hex::encode_prefixed(&self.public_key.as_bytes()[..8]))
            .finish()
    }
}

impl FalconSigner {
    /// Generates a fresh keypair.
    pub fn random() -> Self {
        let (public_key, secret_key) = falcon512::keypair();
        Self { secret_key, public_key }
    }

    /// Loads a keypair from its raw encodings.
    pub fn from_bytes(secret_key: &[u8], public_key: &[u8]) -> Result<Self, SigningError> {
        let secret_key = falcon512::SecretKey::from_bytes(secret_key).map_err(invalid_key)?;
        let public_key = falcon512::PublicKey::from_bytes(public_key).map_err(invalid_key)?;
        Ok(Self { secret_key, public_key })
    }

    /// Loads a keypair from hex encodings, with or without `0x` prefix.
    pub fn from_hex(secret_key: &str, public_key: &str) -> Result<Self, SigningError> {
        Self::from_bytes(
            &hex::decode(secret_key).map_err(invalid_key)?,
            &hex::decode(public_key).map_err(invalid_key)?,
        )
    }

    /// Returns the raw secret key.
    pub fn secret_key_bytes(&self) -> &[u8] {
        self.secret_key.as_bytes()
    }

    /// Verifies a detached signature produced by this signer.
    pub fn verify(&self, payload: &[u8], signature: &[u8]) -> bool {
        falcon512::DetachedSignature::from_bytes(signature).is_ok_and(|signature| {
            falcon512::verify_detached_signature(&signature, payload, &self.public_key).is_ok()
        })
    }
}

impl PayloadSigner for FalconSigner {
    fn public_key(&self) -> Bytes {
        Bytes::copy_from_slice(self.public_key.as_bytes())
    }

    fn sign_payload(&self, payload: &[u8]) -> Result<Bytes, SigningError> {
        let signature = falcon512::detached_sign(payload, &self.secret_key);
        Ok(Bytes::copy_from_slice(signature.as_bytes()))
    }
}

fn invalid_key(err: impl fmt::Display) -> SigningError {
    SigningError::InvalidKey { scheme: SCHEME, reason: err.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let signer = FalconSigner::random();
        let payload = b"signing payload";

        let signature = signer.sign_payload(payload).unwrap();
        assert!(signer.verify(payload, &signature));
        assert!(!signer.verify(b"another payload", &signature));
    }

    #[test]
    fn loads_from_hex() {
        let signer = FalconSigner::random();
        let loaded = FalconSigner::from_hex(
            &hex::encode_prefixed(signer.secret_key_bytes()),
            &hex::encode(signer.public_key()),
        )
        .unwrap();

        assert_eq!(loaded.public_key(), signer.public_key());
        let signature = loaded.sign_payload(b"payload").unwrap();
        assert!(signer.verify(b"payload", &signature));
    }

    #[test]
    fn rejects_invalid_keys() {
        let signer = FalconSigner::random();
        let err = FalconSigner::from_bytes(&[0u8; 12], &signer.public_key()).unwrap_err();
        assert!(matches!(err, SigningError::InvalidKey { scheme: SCHEME, .. }));

        let err = FalconSigner::from_hex("0xnothex", "00").unwrap_err();
        assert!(matches!(err, SigningError::InvalidKey { .. }));
    }
}

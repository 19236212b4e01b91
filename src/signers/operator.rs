//! Relay operator signer.
//!
//! The operator key signs and pays for the outer transactions submitted to the relay hub.
use crate::{
    error::SigningError,
    types::{LegacyTransaction, SignedTransaction},
};
use alloy::{primitives::Address, signers::local::PrivateKeySigner};
use std::{fmt, str::FromStr, sync::Arc};

/// The relay operator's ECDSA key.
#[derive(Clone)]
pub struct OperatorSigner(Arc<PrivateKeySigner>);

impl fmt::Debug for OperatorSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OperatorSigner").field(&self.address()).finish()
    }
}

impl OperatorSigner {
    /// Load a hex encoded private key.
    pub fn from_signing_key(key: &str) -> Result<Self, SigningError> {
        PrivateKeySigner::from_str(key)
            .map(Self::from)
            .map_err(|err| SigningError::InvalidKey { scheme: "secp256k1", reason: err.to_string() })
    }

    /// Returns the operator's Ethereum address.
    pub fn address(&self) -> Address {
        self.0.address()
    }

    /// Signs a transaction with the operator key.
    pub fn sign_transaction(
        &self,
        tx: LegacyTransaction,
    ) -> Result<SignedTransaction, SigningError> {
        tx.sign(self.0.as_ref())
    }
}

impl From<PrivateKeySigner> for OperatorSigner {
    fn from(signer: PrivateKeySigner) -> Self {
        Self(Arc::new(signer))
    }
}

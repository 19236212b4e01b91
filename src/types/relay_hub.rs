//! Calls into the relay hub contract.
use super::abi;
use crate::{
    error::{DecodingError, EncodingError},
    signers::DualSignatureBundle,
};
use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, Bytes, U256},
};

/// Name of the meta transaction entry point.
pub const RELAY_META_TX: &str = "relayMetaTx";

/// Parameter types of `relayMetaTx`, in call order.
pub const RELAY_META_TX_PARAMS: [&str; 6] =
    ["bytes", "uint8", "bytes32", "bytes32", "bytes", "bytes"];

/// Name of the per-sender nonce getter.
pub const GET_NONCE: &str = "getNonce";

/// Parameter types of `getNonce`.
pub const GET_NONCE_PARAMS: [&str; 1] = ["address"];

/// Return types of `getNonce`.
pub const GET_NONCE_RETURNS: [&str; 1] = ["uint256"];

/// Encodes `relayMetaTx(signingData, v, r, s, publicKey, signature)`.
pub fn relay_meta_tx_call(bundle: DualSignatureBundle) -> Result<Bytes, EncodingError> {
    abi::encode_call(RELAY_META_TX, &RELAY_META_TX_PARAMS, bundle.into_call_arguments()?)
}

/// Encodes `getNonce(from)`.
pub fn get_nonce_call(from: Address) -> Result<Bytes, EncodingError> {
    abi::encode_call(GET_NONCE, &GET_NONCE_PARAMS, vec![DynSolValue::Address(from)])
}

/// Decodes the return data of `getNonce`.
pub fn decode_nonce(data: &[u8]) -> Result<U256, DecodingError> {
    match abi::decode_result(&GET_NONCE_RETURNS, data)?.as_slice() {
        [DynSolValue::Uint(nonce, _)] => Ok(*nonce),
        _ => Err(DecodingError::UnexpectedValue("uint256")),
    }
}

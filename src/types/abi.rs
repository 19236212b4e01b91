//! Dynamic contract call encoding.
//!
//! Calls are described by a function name, the solidity types of its parameters and the runtime
//! values to pass. The selector is the first four bytes of the keccak256 hash of the canonical
//! signature `name(type1,type2,...)` and the arguments follow in the standard head/tail layout.
use crate::error::{DecodingError, EncodingError};
use alloy::{
    dyn_abi::{DynSolType, DynSolValue},
    primitives::{B256, Bytes, Selector, keccak256},
};

fn parse_types(types: &[&str]) -> Result<Vec<DynSolType>, EncodingError> {
    types
        .iter()
        .map(|ty| {
            DynSolType::parse(ty)
                .map_err(|source| EncodingError::InvalidType { ty: ty.to_string(), source })
        })
        .collect()
}

/// Returns the canonical signature string of a function.
pub fn function_signature(name: &str, types: &[DynSolType]) -> String {
    let params = types.iter().map(|ty| ty.sol_type_name()).collect::<Vec<_>>();
    format!("{name}({})", params.join(","))
}

/// Returns the 4-byte selector of a function.
pub fn function_selector(name: &str, types: &[DynSolType]) -> Selector {
    Selector::from_slice(&keccak256(function_signature(name, types))[..4])
}

/// Checks that `value` lies in the domain of `ty`.
fn check_domain(index: usize, ty: &DynSolType, value: &DynSolValue) -> Result<(), EncodingError> {
    if let (DynSolType::Uint(bits), DynSolValue::Uint(value, _)) = (ty, value)
        && value.bit_len() > *bits
    {
        return Err(EncodingError::ValueOutOfDomain {
            ty: ty.sol_type_name().into_owned(),
            reason: format!("{value} does not fit into {bits} bits"),
        });
    }

    if !ty.matches(value) {
        return Err(EncodingError::TypeMismatch { index, ty: ty.sol_type_name().into_owned() });
    }
    Ok(())
}

/// Encodes a call to `name` with the given argument types and values.
pub fn encode_call(
    name: &str,
    types: &[&str],
    values: Vec<DynSolValue>,
) -> Result<Bytes, EncodingError> {
    let types = parse_types(types)?;
    if types.len() != values.len() {
        return Err(EncodingError::ArgumentCount { expected: types.len(), got: values.len() });
    }
    for (index, (ty, value)) in types.iter().zip(&values).enumerate() {
        check_domain(index, ty, value)?;
    }

    let mut out = function_selector(name, &types).to_vec();
    out.extend(DynSolValue::Tuple(values).abi_encode_params());
    Ok(out.into())
}

/// Decodes the return data of a call into values of the given types.
pub fn decode_result(types: &[&str], data: &[u8]) -> Result<Vec<DynSolValue>, DecodingError> {
    let types = types
        .iter()
        .map(|ty| {
            DynSolType::parse(ty)
                .map_err(|source| DecodingError::InvalidType { ty: ty.to_string(), source })
        })
        .collect::<Result<Vec<_>, _>>()?;

    // every parameter occupies at least one head word
    let expected = types.len() * 32;
    if data.len() < expected {
        return Err(DecodingError::TooShort { expected, got: data.len() });
    }

    match DynSolType::Tuple(types).abi_decode_params(data)? {
        DynSolValue::Tuple(values) => Ok(values),
        value => Ok(vec![value]),
    }
}

/// Builds a `bytes32` value from at most 32 bytes.
///
/// Shorter input is right padded with zeroes, as `bytesN` values are left aligned.
pub fn fixed_bytes(input: &[u8]) -> Result<DynSolValue, EncodingError> {
    if input.len() > 32 {
        return Err(EncodingError::ValueOutOfDomain {
            ty: "bytes32".to_string(),
            reason: format!("{} bytes do not fit into 32", input.len()),
        });
    }
    let mut word = B256::ZERO;
    word[..input.len()].copy_from_slice(input);
    Ok(DynSolValue::FixedBytes(word, 32))
}

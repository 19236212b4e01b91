use thiserror::Error;

/// Errors returned when encoding a contract call.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// A declared argument type is not a valid solidity type.
    #[error("invalid abi type `{ty}`: {source}")]
    InvalidType {
        /// The type as declared.
        ty: String,
        /// The parser error.
        #[source]
        source: alloy::dyn_abi::Error,
    },
    /// The number of values does not match the number of declared types.
    #[error("expected {expected} arguments, got {got}")]
    ArgumentCount {
        /// Number of declared types.
        expected: usize,
        /// Number of supplied values.
        got: usize,
    },
    /// A value does not have the shape of its declared type.
    #[error("argument {index} is not a valid {ty}")]
    TypeMismatch {
        /// Position of the argument.
        index: usize,
        /// The declared type.
        ty: String,
    },
    /// A value has the right shape but lies outside the domain of its declared type.
    #[error("value out of domain for {ty}: {reason}")]
    ValueOutOfDomain {
        /// The declared type.
        ty: String,
        /// Why the value is rejected.
        reason: String,
    },
}

/// Errors returned when decoding a contract call result.
#[derive(Debug, Error)]
pub enum DecodingError {
    /// A declared return type is not a valid solidity type.
    #[error("invalid abi type `{ty}`: {source}")]
    InvalidType {
        /// The type as declared.
        ty: String,
        /// The parser error.
        #[source]
        source: alloy::dyn_abi::Error,
    },
    /// The return data is shorter than the head of the declared types.
    #[error("return data too short: expected at least {expected} bytes, got {got}")]
    TooShort {
        /// Minimum number of bytes.
        expected: usize,
        /// Number of bytes returned.
        got: usize,
    },
    /// The return data is malformed.
    #[error(transparent)]
    Abi(#[from] alloy::dyn_abi::Error),
    /// The decoded value does not have the expected shape.
    #[error("unexpected return value, expected {0}")]
    UnexpectedValue(&'static str),
}

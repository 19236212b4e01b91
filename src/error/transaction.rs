use thiserror::Error;

/// Errors returned when decoding a raw signed transaction.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The raw transaction is not valid hex.
    #[error("raw transaction is not valid hex: {0}")]
    Hex(#[from] alloy::hex::FromHexError),
    /// The raw transaction is empty.
    #[error("raw transaction is empty")]
    Empty,
    /// The raw transaction is a typed envelope, which the relay does not support.
    #[error("unsupported transaction type {0:#04x}")]
    UnsupportedType(u8),
    /// The RLP encoding is malformed.
    #[error("malformed transaction rlp: {0}")]
    Rlp(#[from] alloy::rlp::Error),
    /// The payload continues after the transaction list or after its last field.
    #[error("unexpected trailing bytes in transaction")]
    TrailingBytes,
    /// The `v` value of the signature is neither pre nor post EIP-155.
    #[error("invalid signature v value {0}")]
    InvalidV(u64),
}

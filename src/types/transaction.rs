//! Legacy transaction codec.
//!
//! Only the untyped RLP envelope is supported:
//!
//! ```text
//! rlp([nonce, gasPrice, gasLimit, to, value, data, v, r, s])
//! ```
//!
//! The signing payload follows [EIP-155] when a chain id is present and the pre EIP-155 layout
//! otherwise.
//!
//! [EIP-155]: https://eips.ethereum.org/EIPS/eip-155
use crate::error::{DecodeError, SigningError};
use alloy::{
    hex,
    primitives::{Address, B256, Bytes, ChainId, Signature, SignatureError, TxKind, U256, keccak256},
    rlp::{Decodable, Encodable, Header},
    signers::SignerSync,
};

/// Largest leading byte of an [EIP-2718] typed envelope.
///
/// [EIP-2718]: https://eips.ethereum.org/EIPS/eip-2718
const TYPED_ENVELOPE_MAX: u8 = 0x7f;

/// The unsigned fields of a legacy transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LegacyTransaction {
    /// Sender nonce.
    pub nonce: u64,
    /// Gas price in wei.
    pub gas_price: u128,
    /// Gas limit.
    pub gas_limit: u64,
    /// Destination, or [`TxKind::Create`] for contract creation.
    pub to: TxKind,
    /// Value in wei.
    pub value: U256,
    /// Call data.
    pub input: Bytes,
    /// Chain id for replay protection, `None` for pre EIP-155 transactions.
    pub chain_id: Option<ChainId>,
}

impl LegacyTransaction {
    fn fields_len(&self) -> usize {
        self.nonce.length()
            + self.gas_price.length()
            + self.gas_limit.length()
            + self.to.length()
            + self.value.length()
            + self.input.length()
    }

    fn encode_fields(&self, out: &mut dyn alloy::rlp::BufMut) {
        self.nonce.encode(out);
        self.gas_price.encode(out);
        self.gas_limit.encode(out);
        self.to.encode(out);
        self.value.encode(out);
        self.input.encode(out);
    }

    /// The pre-image of the transaction signature.
    ///
    /// Signature fields are never part of it. With a chain id the list is extended by
    /// `[chainId, 0, 0]`.
    pub fn signing_payload(&self) -> Bytes {
        let mut payload_length = self.fields_len();
        if let Some(chain_id) = self.chain_id {
            payload_length += chain_id.length() + 0u8.length() * 2;
        }

        let mut out = Vec::new();
        Header { list: true, payload_length }.encode(&mut out);
        self.encode_fields(&mut out);
        if let Some(chain_id) = self.chain_id {
            chain_id.encode(&mut out);
            0u8.encode(&mut out);
            0u8.encode(&mut out);
        }
        out.into()
    }

    /// The hash that is signed with ECDSA.
    pub fn signature_hash(&self) -> B256 {
        keccak256(self.signing_payload())
    }

    /// Signs the transaction over [`Self::signature_hash`].
    pub fn sign<S: SignerSync>(self, signer: &S) -> Result<SignedTransaction, SigningError> {
        let signature = signer.sign_hash_sync(&self.signature_hash())?;
        Ok(SignedTransaction { tx: self, signature })
    }

    /// Attaches an existing signature without checking it.
    pub const fn into_signed(self, signature: Signature) -> SignedTransaction {
        SignedTransaction { tx: self, signature }
    }
}

/// A legacy transaction together with its ECDSA signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    tx: LegacyTransaction,
    signature: Signature,
}

impl SignedTransaction {
    /// Returns the unsigned fields.
    pub const fn tx(&self) -> &LegacyTransaction {
        &self.tx
    }

    /// Returns the signature.
    pub const fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The `v` value as it appears on the wire.
    pub fn v(&self) -> u64 {
        let parity = self.signature.v() as u64;
        match self.tx.chain_id {
            Some(chain_id) => chain_id * 2 + 35 + parity,
            None => 27 + parity,
        }
    }

    /// Recovers the sender from the signature.
    pub fn recover_signer(&self) -> Result<Address, SignatureError> {
        self.signature.recover_address_from_prehash(&self.tx.signature_hash())
    }

    /// Decodes a hex encoded raw transaction, with or without `0x` prefix.
    pub fn decode_hex(raw: impl AsRef<[u8]>) -> Result<Self, DecodeError> {
        Self::decode(&hex::decode(raw)?)
    }

    /// Decodes a raw transaction.
    pub fn decode(raw: &[u8]) -> Result<Self, DecodeError> {
        let Some(&first) = raw.first() else {
            return Err(DecodeError::Empty);
        };
        if first <= TYPED_ENVELOPE_MAX {
            return Err(DecodeError::UnsupportedType(first));
        }

        let mut buf = raw;
        let header = Header::decode(&mut buf)?;
        if !header.list {
            return Err(alloy::rlp::Error::UnexpectedString.into());
        }
        if buf.len() < header.payload_length {
            return Err(alloy::rlp::Error::InputTooShort.into());
        }
        if buf.len() > header.payload_length {
            return Err(DecodeError::TrailingBytes);
        }

        let fields = &mut buf;
        let nonce = u64::decode(fields)?;
        let gas_price = u128::decode(fields)?;
        let gas_limit = u64::decode(fields)?;
        let to = TxKind::decode(fields)?;
        let value = U256::decode(fields)?;
        let input = Bytes::decode(fields)?;
        let v = u64::decode(fields)?;
        let r = U256::decode(fields)?;
        let s = U256::decode(fields)?;
        if !fields.is_empty() {
            return Err(DecodeError::TrailingBytes);
        }

        let (parity, chain_id) = match v {
            27 | 28 => (v == 28, None),
            35.. => ((v - 35) % 2 == 1, Some((v - 35) / 2)),
            _ => return Err(DecodeError::InvalidV(v)),
        };

        Ok(Self {
            tx: LegacyTransaction { nonce, gas_price, gas_limit, to, value, input, chain_id },
            signature: Signature::new(r, s, parity),
        })
    }

    /// Encodes the transaction into its wire format.
    pub fn encode(&self) -> Bytes {
        let v = self.v();
        let r = self.signature.r();
        let s = self.signature.s();
        let payload_length = self.tx.fields_len() + v.length() + r.length() + s.length();

        let mut out = Vec::new();
        Header { list: true, payload_length }.encode(&mut out);
        self.tx.encode_fields(&mut out);
        v.encode(&mut out);
        r.encode(&mut out);
        s.encode(&mut out);
        out.into()
    }

    /// Encodes the transaction into a `0x` prefixed hex string.
    pub fn encode_hex(&self) -> String {
        hex::encode_prefixed(self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::{
        primitives::{address, b256, bytes, uint},
        signers::local::PrivateKeySigner,
    };

    // https://eips.ethereum.org/EIPS/eip-155#example
    const EIP155_RAW: &str = "0xf86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83";
    const EIP155_KEY: &str = "0x4646464646464646464646464646464646464646464646464646464646464646";

    fn eip155_tx() -> LegacyTransaction {
        LegacyTransaction {
            nonce: 9,
            gas_price: 20_000_000_000,
            gas_limit: 21_000,
            to: TxKind::Call(address!("0x3535353535353535353535353535353535353535")),
            value: uint!(1_000_000_000_000_000_000_U256),
            input: Bytes::new(),
            chain_id: Some(1),
        }
    }

    #[test]
    fn decode_eip155_example() {
        let signed = SignedTransaction::decode_hex(EIP155_RAW).unwrap();

        assert_eq!(signed.tx(), &eip155_tx());
        assert_eq!(signed.v(), 37);
        assert!(!signed.signature().v());
        assert_eq!(
            signed.signature().r(),
            uint!(
                18515461264373351373200002665853028612451056578545711640558177340181847433846_U256
            )
        );
        assert_eq!(
            signed.signature().s(),
            uint!(
                46948507304638947509940763649030358759909902576025900602547168820602576006531_U256
            )
        );
        assert_eq!(signed.encode_hex(), EIP155_RAW);
    }

    #[test]
    fn eip155_signing_payload() {
        let tx = eip155_tx();
        assert_eq!(
            tx.signing_payload(),
            bytes!(
                "ec098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a764000080018080"
            )
        );
        assert_eq!(
            tx.signature_hash(),
            b256!("0xdaf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53")
        );
    }

    #[test]
    fn sign_matches_eip155_example() {
        let signer: PrivateKeySigner = EIP155_KEY.parse().unwrap();
        let signed = eip155_tx().sign(&signer).unwrap();

        assert_eq!(signed.encode_hex(), EIP155_RAW);
        assert_eq!(signed.recover_signer().unwrap(), signer.address());
    }

    #[test]
    fn signing_payload_ignores_signature() {
        let signer = PrivateKeySigner::random();
        let tx = eip155_tx();
        let signed = tx.clone().sign(&signer).unwrap();
        let other = tx.clone().into_signed(Signature::new(U256::from(1), U256::from(2), true));

        assert_eq!(signed.tx().signing_payload(), other.tx().signing_payload());
        assert_eq!(tx.signing_payload(), tx.signing_payload());
    }

    #[test]
    fn roundtrip_contract_creation_without_chain_id() {
        let signer = PrivateKeySigner::random();
        let tx = LegacyTransaction {
            nonce: 0,
            gas_price: 1,
            gas_limit: 3_000_000,
            to: TxKind::Create,
            value: U256::ZERO,
            input: bytes!("6080604052"),
            chain_id: None,
        };
        let signed = tx.sign(&signer).unwrap();
        assert!(matches!(signed.v(), 27 | 28));

        let decoded = SignedTransaction::decode(&signed.encode()).unwrap();
        assert_eq!(decoded, signed);
        assert_eq!(decoded.recover_signer().unwrap(), signer.address());
    }

    #[test]
    fn roundtrip_large_chain_id() {
        let signer = PrivateKeySigner::random();
        let tx = LegacyTransaction { chain_id: Some(648_529), ..eip155_tx() };
        let signed = tx.sign(&signer).unwrap();

        let decoded = SignedTransaction::decode_hex(signed.encode_hex()).unwrap();
        assert_eq!(decoded, signed);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(SignedTransaction::decode(&[]), Err(DecodeError::Empty)));
        assert!(matches!(SignedTransaction::decode_hex("0xzz"), Err(DecodeError::Hex(_))));
        assert!(matches!(
            SignedTransaction::decode_hex("0x02f8710182"),
            Err(DecodeError::UnsupportedType(0x02))
        ));
        assert!(matches!(
            SignedTransaction::decode_hex("0x8180"),
            Err(DecodeError::Rlp(alloy::rlp::Error::UnexpectedString))
        ));

        // truncated
        let truncated = &EIP155_RAW[..EIP155_RAW.len() - 4];
        assert!(matches!(SignedTransaction::decode_hex(truncated), Err(DecodeError::Rlp(_))));

        // trailing garbage after the list
        let trailing = format!("{EIP155_RAW}00");
        assert!(matches!(
            SignedTransaction::decode_hex(trailing),
            Err(DecodeError::TrailingBytes)
        ));
    }

    #[test]
    fn rejects_invalid_v() {
        let signed = SignedTransaction::decode_hex(EIP155_RAW).unwrap();
        let tx = signed.tx();
        let payload_length = tx.fields_len() + 1u64.length() + 1u8.length() * 2;
        let mut out = Vec::new();
        Header { list: true, payload_length }.encode(&mut out);
        tx.encode_fields(&mut out);
        1u64.encode(&mut out);
        1u8.encode(&mut out);
        1u8.encode(&mut out);

        assert!(matches!(SignedTransaction::decode(&out), Err(DecodeError::InvalidV(1))));
    }
}

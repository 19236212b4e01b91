//! # Relay
//!
//! Handles inbound JSON-RPC requests.
//!
//! - `eth_sendRawTransaction` wraps the signed transaction into a `relayMetaTx` call carrying the
//!   sender's ECDSA signature next to a post-quantum signature, and submits it to the relay hub
//!   from the operator account.
//! - `eth_getTransactionCount` answers with the nonce the relay hub tracks for the address.
//! - Everything else is forwarded to the upstream node as is.
use crate::{
    config::OuterTxConfig,
    constants::{ETH_CALL, GET_TRANSACTION_COUNT, LATEST_BLOCK, SEND_RAW_TRANSACTION},
    error::RelayError,
    metrics::RelayMetrics,
    signers::{DualSignatureBundle, OperatorSigner, PayloadSigner},
    types::{LegacyTransaction, SignedTransaction, relay_hub},
    upstream::{RpcResponse, Upstream},
};
use alloy::primitives::{self, Address, TxKind, U64, U256};
use bytes::Bytes;
use http::StatusCode;
use serde_json::{Value, json};
use std::{fmt, sync::Arc};
use tracing::{Instrument, Level, debug, error, span, trace};

/// The stage an intercepted request is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// The request was parsed and dispatched.
    Received,
    /// The request parameters are being decoded.
    Decoding,
    /// Waiting for the upstream node to return a nonce.
    NonceFetchPending,
    /// The relay hub call and the outer transaction are being built.
    BuildingBundle,
    /// Waiting for the upstream node to accept the outer transaction.
    SubmitPending,
    /// A response was produced.
    Responded,
    /// The request failed.
    Error,
}

/// Per request state of an intercepted call.
#[derive(Debug)]
struct RelayContext {
    /// The inbound request id, any JSON value.
    id: Value,
    state: RelayState,
}

impl RelayContext {
    const fn new(id: Value) -> Self {
        Self { id, state: RelayState::Received }
    }

    fn advance(&mut self, state: RelayState) {
        trace!(from = ?self.state, to = ?state, "Advancing request");
        self.state = state;
    }
}

/// A response to write back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Body, empty on failures.
    pub body: Bytes,
}

impl RelayResponse {
    /// A successful response.
    pub const fn ok(body: Bytes) -> Self {
        Self { status: StatusCode::OK, body }
    }

    /// An empty HTTP 500 response.
    pub const fn internal_error() -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, body: Bytes::new() }
    }
}

/// The intercepted methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intercepted {
    SendRawTransaction,
    GetTransactionCount,
}

impl Intercepted {
    fn from_method(method: &str) -> Option<Self> {
        match method {
            SEND_RAW_TRANSACTION => Some(Self::SendRawTransaction),
            GET_TRANSACTION_COUNT => Some(Self::GetTransactionCount),
            _ => None,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::SendRawTransaction => SEND_RAW_TRANSACTION,
            Self::GetTransactionCount => GET_TRANSACTION_COUNT,
        }
    }
}

/// A classified inbound body.
#[derive(Debug, PartialEq)]
enum Inbound {
    Intercepted { method: Intercepted, id: Value, params: Value },
    Passthrough,
}

impl Inbound {
    /// Classifies a body.
    ///
    /// Only single request objects naming an intercepted method are intercepted. A batch carrying
    /// an intercepted method is rejected, any other JSON goes upstream untouched.
    fn classify(body: &[u8]) -> Result<Self, RelayError> {
        let mut envelope = match serde_json::from_slice(body)? {
            Value::Object(envelope) => envelope,
            Value::Array(batch) => {
                if let Some(method) = batch.iter().find_map(|request| {
                    request.get("method").and_then(Value::as_str).and_then(Intercepted::from_method)
                }) {
                    return Err(RelayError::InterceptedInBatch(method.name()));
                }
                return Ok(Self::Passthrough);
            }
            _ => return Ok(Self::Passthrough),
        };
        let Some(method) =
            envelope.get("method").and_then(Value::as_str).and_then(Intercepted::from_method)
        else {
            return Ok(Self::Passthrough);
        };

        Ok(Self::Intercepted {
            method,
            id: envelope.remove("id").unwrap_or(Value::Null),
            params: envelope.remove("params").unwrap_or(Value::Null),
        })
    }
}

/// Returns the first positional parameter as a string.
fn first_param<'a>(method: &'static str, params: &'a Value) -> Result<&'a str, RelayError> {
    params
        .as_array()
        .and_then(|params| params.first())
        .and_then(Value::as_str)
        .ok_or_else(|| RelayError::invalid_params(method, "expected a string as first parameter"))
}

/// Implementation of the relay.
pub struct Relay<U> {
    inner: Arc<RelayInner<U>>,
}

impl<U> Clone for Relay<U> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<U: fmt::Debug> fmt::Debug for Relay<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relay")
            .field("upstream", &self.inner.upstream)
            .field("relay_hub", &self.inner.relay_hub)
            .field("operator", &self.inner.operator)
            .field("pq_signer", &self.inner.pq_signer)
            .field("outer_tx", &self.inner.outer_tx)
            .finish_non_exhaustive()
    }
}

impl<U: Upstream> Relay<U> {
    /// Create a new relay.
    pub fn new(
        upstream: U,
        relay_hub: Address,
        operator: OperatorSigner,
        pq_signer: Arc<dyn PayloadSigner>,
        outer_tx: OuterTxConfig,
    ) -> Self {
        let inner = RelayInner {
            upstream,
            relay_hub,
            operator,
            pq_signer,
            outer_tx,
            metrics: RelayMetrics::default(),
        };
        Self { inner: Arc::new(inner) }
    }

    /// The relay hub address.
    pub fn relay_hub(&self) -> Address {
        self.inner.relay_hub
    }

    /// The address of the relay operator.
    pub fn operator_address(&self) -> Address {
        self.inner.operator.address()
    }

    /// The upstream node.
    pub fn upstream(&self) -> &U {
        &self.inner.upstream
    }

    /// Handles one inbound request body.
    ///
    /// Never fails: errors are logged and answered with an empty HTTP 500.
    pub async fn handle(&self, body: Bytes) -> RelayResponse {
        let response = match Inbound::classify(&body) {
            Ok(Inbound::Intercepted { method, id, params }) => {
                let span = span!(Level::INFO, "relay", method = method.name(), id = %id);
                self.intercept(method, RelayContext::new(id), params).instrument(span).await
            }
            Ok(Inbound::Passthrough) => self.passthrough(body).await,
            Err(err) => {
                error!(kind = err.kind(), %err, "Rejected inbound request");
                RelayResponse::internal_error()
            }
        };

        if !response.status.is_success() {
            self.inner.metrics.failures.increment(1);
        }
        response
    }

    async fn intercept(
        &self,
        method: Intercepted,
        mut ctx: RelayContext,
        params: Value,
    ) -> RelayResponse {
        let result = match method {
            Intercepted::SendRawTransaction => self.send_raw_transaction(&mut ctx, params).await,
            Intercepted::GetTransactionCount => self.get_transaction_count(&mut ctx, params).await,
        };

        let body = result.and_then(|response| Ok(response.with_id(ctx.id.clone()).to_bytes()?));
        match body {
            Ok(body) => {
                ctx.advance(RelayState::Responded);
                match method {
                    Intercepted::SendRawTransaction => {
                        self.inner.metrics.intercepted_transactions.increment(1)
                    }
                    Intercepted::GetTransactionCount => self.inner.metrics.nonce_lookups.increment(1),
                }
                RelayResponse::ok(body)
            }
            Err(err) => {
                error!(
                    state = ?ctx.state,
                    kind = err.kind(),
                    internal_defect = err.is_internal_defect(),
                    upstream = err.is_upstream(),
                    rpc_code = ?err.rpc_error().map(|payload| payload.code),
                    %err,
                    "Request failed"
                );
                ctx.advance(RelayState::Error);
                ctx.advance(RelayState::Responded);
                RelayResponse::internal_error()
            }
        }
    }

    /// Wraps the inbound transaction and submits it to the relay hub.
    ///
    /// The transaction is decoded before anything is sent upstream. The operator nonce is fetched
    /// first and a failed fetch ends the request without a submission.
    async fn send_raw_transaction(
        &self,
        ctx: &mut RelayContext,
        params: Value,
    ) -> Result<RpcResponse, RelayError> {
        ctx.advance(RelayState::Decoding);
        let tx = SignedTransaction::decode_hex(first_param(SEND_RAW_TRANSACTION, &params)?)?;
        debug!(nonce = tx.tx().nonce, chain_id = ?tx.tx().chain_id, "Decoded inbound transaction");

        ctx.advance(RelayState::NonceFetchPending);
        let nonce = self.operator_nonce().await?;

        ctx.advance(RelayState::BuildingBundle);
        let outer = self.build_outer_transaction(&tx, nonce)?;

        ctx.advance(RelayState::SubmitPending);
        let response =
            self.inner.upstream.call(SEND_RAW_TRANSACTION, json!([outer.encode_hex()])).await?;
        debug!(nonce, result = %response.result(), "Submitted relay hub transaction");

        Ok(response)
    }

    /// Reads the nonce the relay hub tracks for an address.
    async fn get_transaction_count(
        &self,
        ctx: &mut RelayContext,
        params: Value,
    ) -> Result<RpcResponse, RelayError> {
        ctx.advance(RelayState::Decoding);
        let address: Address =
            first_param(GET_TRANSACTION_COUNT, &params)?.parse().map_err(|err| {
                RelayError::invalid_params(GET_TRANSACTION_COUNT, format!("invalid address: {err}"))
            })?;
        let data = relay_hub::get_nonce_call(address)?;

        ctx.advance(RelayState::NonceFetchPending);
        let response = self
            .inner
            .upstream
            .call(ETH_CALL, json!([{ "to": self.inner.relay_hub, "data": data }, LATEST_BLOCK]))
            .await?;

        let nonce = relay_hub::decode_nonce(&response.deserialize_result::<primitives::Bytes>()?)?;
        debug!(%address, %nonce, "Fetched relay hub nonce");

        Ok(response)
    }

    /// Returns the pending nonce of the operator account.
    async fn operator_nonce(&self) -> Result<u64, RelayError> {
        let response = self
            .inner
            .upstream
            .call(GET_TRANSACTION_COUNT, json!([self.operator_address(), LATEST_BLOCK]))
            .await?;
        let nonce = response.deserialize_result::<U64>()?.to::<u64>();
        trace!(nonce, operator = %self.operator_address(), "Fetched operator nonce");
        Ok(nonce)
    }

    /// Builds and signs the relay hub transaction wrapping `tx`.
    ///
    /// The outer transaction is sent from the operator account with the given nonce and reuses
    /// the chain id of `tx`.
    pub fn build_outer_transaction(
        &self,
        tx: &SignedTransaction,
        nonce: u64,
    ) -> Result<SignedTransaction, RelayError> {
        let bundle = DualSignatureBundle::compose(
            tx.tx().signing_payload(),
            tx.signature(),
            self.inner.pq_signer.as_ref(),
        )?;
        let input = relay_hub::relay_meta_tx_call(bundle)?;

        let outer = LegacyTransaction {
            nonce,
            gas_price: self.inner.outer_tx.gas_price.into(),
            gas_limit: self.inner.outer_tx.gas_limit,
            to: TxKind::Call(self.inner.relay_hub),
            value: U256::ZERO,
            input,
            chain_id: tx.tx().chain_id,
        };
        Ok(self.inner.operator.sign_transaction(outer)?)
    }

    /// Forwards the body unmodified and returns the upstream response unmodified.
    async fn passthrough(&self, body: Bytes) -> RelayResponse {
        match self.inner.upstream.forward(body).await {
            Ok(forwarded) => {
                self.inner.metrics.passthrough.increment(1);
                RelayResponse { status: forwarded.status, body: forwarded.body }
            }
            Err(err) => {
                error!(kind = "upstream", %err, "Passthrough failed");
                RelayResponse::internal_error()
            }
        }
    }
}

/// Implementation of the relay.
struct RelayInner<U> {
    /// The upstream node.
    upstream: U,
    /// The relay hub address.
    relay_hub: Address,
    /// Signs and pays for the relay hub transactions.
    operator: OperatorSigner,
    /// Post-quantum signer.
    pq_signer: Arc<dyn PayloadSigner>,
    /// Gas settings of the relay hub transactions.
    outer_tx: OuterTxConfig,
    metrics: RelayMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_intercepted_methods() {
        let inbound = Inbound::classify(
            br#"{"jsonrpc":"2.0","id":"a","method":"eth_sendRawTransaction","params":["0x00"]}"#,
        )
        .unwrap();
        assert_eq!(
            inbound,
            Inbound::Intercepted {
                method: Intercepted::SendRawTransaction,
                id: json!("a"),
                params: json!(["0x00"]),
            }
        );

        let inbound =
            Inbound::classify(br#"{"jsonrpc":"2.0","method":"eth_getTransactionCount"}"#).unwrap();
        assert_eq!(
            inbound,
            Inbound::Intercepted {
                method: Intercepted::GetTransactionCount,
                id: Value::Null,
                params: Value::Null,
            }
        );
    }

    #[test]
    fn classifies_passthrough() {
        for body in [
            &br#"{"jsonrpc":"2.0","id":1,"method":"eth_chainId","params":[]}"#[..],
            br#"[{"jsonrpc":"2.0","id":1,"method":"eth_chainId"},{"id":2,"method":"net_version"}]"#,
            br#"{"jsonrpc":"2.0","id":1}"#,
            br#"{"method":7}"#,
            b"42",
        ] {
            assert_eq!(Inbound::classify(body).unwrap(), Inbound::Passthrough);
        }

        assert!(matches!(Inbound::classify(b"{"), Err(RelayError::InvalidBody(_))));
    }

    #[test]
    fn rejects_batches_with_intercepted_methods() {
        for body in [
            &br#"[{"jsonrpc":"2.0","id":1,"method":"eth_sendRawTransaction","params":["0x00"]}]"#[..],
            br#"[{"id":1,"method":"eth_chainId"},{"id":2,"method":"eth_getTransactionCount"}]"#,
        ] {
            assert!(matches!(Inbound::classify(body), Err(RelayError::InterceptedInBatch(_))));
        }
    }

    #[test]
    fn extracts_first_param() {
        assert_eq!(first_param(SEND_RAW_TRANSACTION, &json!(["0xab", 1])).unwrap(), "0xab");

        for params in [json!([]), json!([1]), json!("0xab"), Value::Null] {
            assert!(matches!(
                first_param(SEND_RAW_TRANSACTION, &params),
                Err(RelayError::InvalidParams { method: SEND_RAW_TRANSACTION, .. })
            ));
        }
    }

    #[test]
    fn context_tracks_state() {
        let mut ctx = RelayContext::new(json!(7));
        assert_eq!(ctx.state, RelayState::Received);
        ctx.advance(RelayState::Decoding);
        ctx.advance(RelayState::NonceFetchPending);
        assert_eq!(ctx.state, RelayState::NonceFetchPending);
        assert_eq!(ctx.id, json!(7));
    }
}

//! Upstream node client.
//!
//! Every call is a single HTTP request. There is no batching, pipelining or retrying.
use alloy::rpc::json_rpc::{ErrorPayload, Id, Request};
use async_trait::async_trait;
use bytes::Bytes;
use http::{StatusCode, header::CONTENT_TYPE};
use serde_json::{Map, Value};
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tracing::trace;
use url::Url;

mod error;
pub use error::UpstreamError;

/// A JSON-RPC response envelope with a `result`.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcResponse(Map<String, Value>);

impl RpcResponse {
    /// Parses a response body.
    ///
    /// Responses carrying an `error` member are turned into [`UpstreamError::ErrorResponse`].
    pub fn from_body(body: &[u8]) -> Result<Self, UpstreamError> {
        Self::from_envelope(serde_json::from_slice(body)?)
    }

    /// Validates an already parsed response envelope.
    pub fn from_envelope(envelope: Map<String, Value>) -> Result<Self, UpstreamError> {
        if let Some(error) = envelope.get("error").filter(|error| !error.is_null()) {
            let payload: ErrorPayload<Value> = serde_json::from_value(error.clone())?;
            return Err(UpstreamError::ErrorResponse(payload));
        }
        if !envelope.contains_key("result") {
            return Err(UpstreamError::MissingResult);
        }
        Ok(Self(envelope))
    }

    /// Returns the `result` member.
    pub fn result(&self) -> &Value {
        &self.0["result"]
    }

    /// Returns the `id` member, [`Value::Null`] if absent.
    pub fn id(&self) -> &Value {
        self.0.get("id").unwrap_or(&Value::Null)
    }

    /// Replaces the `id` member.
    pub fn with_id(mut self, id: Value) -> Self {
        self.0.insert("id".to_string(), id);
        self
    }

    /// Deserializes the `result` member.
    pub fn deserialize_result<T: serde::de::DeserializeOwned>(&self) -> Result<T, UpstreamError> {
        Ok(T::deserialize(self.result())?)
    }

    /// Serializes the envelope.
    pub fn to_bytes(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(&self.0).map(Into::into)
    }
}

/// A response forwarded as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardedResponse {
    /// HTTP status of the upstream response.
    pub status: StatusCode,
    /// Raw body of the upstream response.
    pub body: Bytes,
}

/// The upstream node.
#[async_trait]
pub trait Upstream: fmt::Debug + Send + Sync + 'static {
    /// Issues one JSON-RPC request.
    async fn call(&self, method: &'static str, params: Value) -> Result<RpcResponse, UpstreamError>;

    /// Forwards a raw request body, returning the raw response.
    async fn forward(&self, body: Bytes) -> Result<ForwardedResponse, UpstreamError>;
}

#[async_trait]
impl<T: Upstream> Upstream for Arc<T> {
    async fn call(&self, method: &'static str, params: Value) -> Result<RpcResponse, UpstreamError> {
        (**self).call(method, params).await
    }

    async fn forward(&self, body: Bytes) -> Result<ForwardedResponse, UpstreamError> {
        (**self).forward(body).await
    }
}

/// An [`Upstream`] reached over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    url: Url,
    /// Ids of the requests issued by the relay itself.
    next_id: Arc<AtomicU64>,
}

impl HttpUpstream {
    /// Creates a client for `url`.
    ///
    /// Without a timeout a request waits for the upstream node indefinitely.
    pub fn new(url: Url, timeout: Option<Duration>) -> Result<Self, UpstreamError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self { client: builder.build()?, url, next_id: Arc::default() })
    }

    /// Returns the url of the upstream node.
    pub const fn url(&self) -> &Url {
        &self.url
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn call(&self, method: &'static str, params: Value) -> Result<RpcResponse, UpstreamError> {
        let id = self.next_id();
        trace!(%method, id, "Sending upstream request");

        let request = Request::new(method, Id::Number(id), params);
        let response = self.client.post(self.url.clone()).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status));
        }

        let response = RpcResponse::from_body(&response.bytes().await?)?;
        trace!(%method, id = %response.id(), "Received upstream response");
        Ok(response)
    }

    async fn forward(&self, body: Bytes) -> Result<ForwardedResponse, UpstreamError> {
        let response = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        Ok(ForwardedResponse { status: response.status(), body: response.bytes().await? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_result() {
        let response =
            RpcResponse::from_body(br#"{"jsonrpc":"2.0","id":3,"result":"0x5"}"#).unwrap();
        assert_eq!(response.result(), &json!("0x5"));
        assert_eq!(response.id(), &json!(3));
        assert_eq!(response.deserialize_result::<String>().unwrap(), "0x5");
    }

    #[test]
    fn null_result_is_a_result() {
        let response =
            RpcResponse::from_body(br#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
        assert!(response.result().is_null());
    }

    #[test]
    fn rejects_error_responses() {
        let err = RpcResponse::from_body(
            br#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"nonce too low"}}"#,
        )
        .unwrap_err();

        let payload = err.as_error_resp().unwrap();
        assert_eq!(payload.code, -32000);
        assert_eq!(payload.message, "nonce too low");
    }

    #[test]
    fn rejects_malformed_responses() {
        assert!(matches!(
            RpcResponse::from_body(br#"{"jsonrpc":"2.0","id":1}"#),
            Err(UpstreamError::MissingResult)
        ));
        assert!(matches!(RpcResponse::from_body(b"not json"), Err(UpstreamError::Json(_))));
        assert!(matches!(RpcResponse::from_body(b"[]"), Err(UpstreamError::Json(_))));
    }

    #[test]
    fn replaces_id() {
        let response = RpcResponse::from_body(br#"{"jsonrpc":"2.0","id":0,"result":"0x1"}"#)
            .unwrap()
            .with_id(json!("abc"));
        assert_eq!(response.id(), &json!("abc"));

        let body: Value = serde_json::from_slice(&response.to_bytes().unwrap()).unwrap();
        assert_eq!(body, json!({"jsonrpc": "2.0", "id": "abc", "result": "0x1"}));
    }

    #[test]
    fn ids_start_at_zero() {
        let upstream =
            HttpUpstream::new("http://127.0.0.1:8545".parse().unwrap(), None).unwrap();
        assert_eq!(upstream.next_id(), 0);
        assert_eq!(upstream.next_id(), 1);
        assert_eq!(upstream.clone().next_id(), 2);
    }
}

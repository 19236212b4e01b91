//! Relay metrics.
use eyre::{Context, eyre};
use metrics::Counter;
use metrics_derive::Metrics;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::{
    net::SocketAddr,
    sync::{Mutex, PoisonError},
    time::Duration,
};

/// Metrics of a [`Relay`](crate::rpc::Relay).
#[derive(Metrics, Clone)]
#[metrics(scope = "relay")]
pub struct RelayMetrics {
    /// Number of `eth_sendRawTransaction` requests wrapped and submitted to the relay hub.
    pub intercepted_transactions: Counter,
    /// Number of `eth_getTransactionCount` requests answered by the relay hub.
    pub nonce_lookups: Counter,
    /// Number of requests forwarded unmodified.
    pub passthrough: Counter,
    /// Number of requests answered with an error.
    pub failures: Counter,
}

/// Builds a Prometheus exporter listening on `metrics_addr`, returning a handle.
///
/// The recorder will perform upkeep every 5 seconds. Subsequent calls return the handle of the
/// exporter installed first.
pub fn setup_exporter(metrics_addr: impl Into<SocketAddr>) -> eyre::Result<PrometheusHandle> {
    static HANDLE: Mutex<Option<PrometheusHandle>> = Mutex::new(None);

    let mut lock = HANDLE.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(handle) = &*lock {
        return Ok(handle.clone());
    }

    let addr: SocketAddr = metrics_addr.into();
    let (recorder, exporter) = PrometheusBuilder::new()
        .with_http_listener(addr)
        .upkeep_timeout(Duration::from_secs(5))
        .build()
        .wrap_err("failed to build metrics recorder")?;

    let handle = recorder.handle();
    metrics::set_global_recorder(recorder)
        .map_err(|_| eyre!("could not set metrics recorder"))?;
    tokio::spawn(exporter);

    tracing::info!(target: "relay::spawn", %addr, "Started metrics server");

    *lock = Some(handle.clone());

    Ok(handle)
}

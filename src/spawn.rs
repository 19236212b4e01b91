//! Relay spawn utilities.
use crate::{
    cli::Args,
    config::RelayConfig,
    metrics,
    rpc::{Relay, RelayResponse},
    signers::{FalconSigner, OperatorSigner},
    upstream::{HttpUpstream, Upstream},
};
use alloy::primitives::Address;
use bytes::Bytes;
use eyre::Context;
use http::{HeaderValue, Method, StatusCode, header};
use http_body_util::{BodyExt, Full};
use hyper::{Request, Response, body::Incoming, server::conn::http1, service::service_fn};
use hyper_util::rt::TokioIo;
use metrics_exporter_prometheus::PrometheusHandle;
use std::{net::SocketAddr, path::Path, sync::Arc};
use tokio::{net::TcpListener, task::JoinHandle};
use tracing::{debug, info, warn};

/// Context returned once relay is launched.
#[derive(Debug)]
pub struct RelayHandle {
    /// The socket address to which the server is bound.
    pub local_addr: SocketAddr,
    /// The accept loop of the server.
    pub server: JoinHandle<()>,
    /// The relay operator address.
    pub operator: Address,
    /// Metrics collector handle, if an exporter was started.
    pub metrics: Option<PrometheusHandle>,
}

impl RelayHandle {
    /// Returns the url to the http server
    pub fn http_url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    /// Stops accepting connections.
    pub fn stop(&self) {
        self.server.abort();
    }

    /// Waits until the server stopped.
    pub async fn stopped(self) -> eyre::Result<()> {
        match self.server.await {
            Err(err) if !err.is_cancelled() => Err(err).wrap_err("relay server panicked"),
            _ => Ok(()),
        }
    }
}

/// Attempts to spawn the relay service using CLI arguments and a configuration file.
pub async fn try_spawn_with_args<P: AsRef<Path>>(
    args: Args,
    config_path: P,
) -> eyre::Result<RelayHandle> {
    let config = if !config_path.as_ref().exists() {
        let config = args.merge_relay_config(RelayConfig::default())?;
        config.save_to_file(&config_path)?;
        config
    } else {
        // File exists: load and override with CLI values.
        args.merge_relay_config(RelayConfig::load_from_file(&config_path)?)?
    };

    try_spawn(config).await
}

/// Spawns the relay service using the provided [`RelayConfig`].
pub async fn try_spawn(config: RelayConfig) -> eyre::Result<RelayHandle> {
    let operator = OperatorSigner::from_signing_key(&config.secrets.operator_key)
        .wrap_err("invalid relay operator key")?;
    let pq_signer =
        FalconSigner::from_hex(&config.secrets.pq_secret_key, &config.secrets.pq_public_key)
            .wrap_err("invalid post-quantum keypair")?;

    let metrics = config
        .server
        .metrics_port
        .map(|port| metrics::setup_exporter((config.server.address, port)))
        .transpose()?;

    let upstream_url = config.upstream.url()?;
    let upstream = HttpUpstream::new(upstream_url.clone(), config.upstream.timeout)?;

    let relay =
        Relay::new(upstream, config.relay_hub, operator, Arc::new(pq_signer), config.outer_tx);

    let listener = TcpListener::bind((config.server.address, config.server.port))
        .await
        .wrap_err_with(|| {
            format!("failed to bind {}:{}", config.server.address, config.server.port)
        })?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "Started relay service");
    info!("Relay operator: {}", relay.operator_address());
    info!("Relay hub: {}", relay.relay_hub());
    info!("Upstream: {}", upstream_url);

    let operator = relay.operator_address();
    let server = tokio::spawn(serve(listener, relay));

    Ok(RelayHandle { local_addr, server, operator, metrics })
}

/// Serves `relay` on every connection accepted by `listener`.
pub async fn serve<U: Upstream>(listener: TcpListener, relay: Relay<U>) {
    loop {
        let (tcp, remote) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                warn!(%err, "Failed to accept connection");
                continue;
            }
        };
        let io = TokioIo::new(tcp);
        let relay = relay.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| handle_request(relay.clone(), remote, req));

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                debug!(%remote, %err, "Error serving connection");
            }
        });
    }
}

async fn handle_request<U: Upstream>(
    relay: Relay<U>,
    remote: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    debug!(method = %req.method(), path = %req.uri().path(), %remote, "Inbound request");

    if req.method() != Method::POST {
        return Ok(into_http_response(RelayResponse {
            status: StatusCode::METHOD_NOT_ALLOWED,
            body: Bytes::new(),
        }));
    }

    let body = req.collect().await?.to_bytes();
    Ok(into_http_response(relay.handle(body).await))
}

fn into_http_response(response: RelayResponse) -> Response<Full<Bytes>> {
    let has_body = !response.body.is_empty();
    let mut http_response = Response::new(Full::new(response.body));
    *http_response.status_mut() = response.status;
    if has_body {
        http_response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
    http_response
}

//! # Relay CLI
use crate::{
    config::{RelayConfig, UpstreamConfig},
    constants::DEFAULT_PORT,
    spawn::try_spawn_with_args,
};
use alloy::primitives::Address;
use clap::Parser;
use std::{
    net::{IpAddr, Ipv4Addr},
    path::PathBuf,
    time::Duration,
};
use url::Url;

/// The post-quantum relay wraps signed transactions into relay hub calls carrying an additional
/// Falcon-512 signature.
#[derive(Debug, Parser)]
#[command(author, about = "Post-quantum relay", long_about = None)]
pub struct Args {
    /// The configuration file.
    ///
    /// If missing, a default one will be used and stored in the working directory under
    /// `relay.yaml`.
    #[arg(long, value_name = "CONFIG", env = "RELAY_CONFIG", default_value = "relay.yaml")]
    pub config: PathBuf,
    /// The address to serve the RPC on.
    #[arg(long = "http.addr", value_name = "ADDR", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub address: IpAddr,
    /// The port to serve the RPC on.
    #[arg(long = "http.port", value_name = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// The port to serve the metrics on.
    #[arg(long = "http.metrics-port", value_name = "PORT")]
    pub metrics_port: Option<u16>,
    /// The RPC endpoint of the node to relay to.
    ///
    /// Must be a valid HTTP or HTTPS URL pointing to an Ethereum JSON-RPC endpoint.
    #[arg(long, required_unless_present("config_only"), value_name = "RPC_ENDPOINT")]
    pub upstream: Option<Url>,
    /// The timeout of upstream requests.
    #[arg(long = "upstream-timeout", value_name = "SECONDS", value_parser = parse_duration_secs)]
    pub upstream_timeout: Option<Duration>,
    /// The address of the relay hub contract.
    #[arg(long = "relay-hub", required_unless_present("config_only"), value_name = "ADDRESS")]
    pub relay_hub: Option<Address>,
    /// Gas price of the transactions sent to the relay hub.
    ///
    /// Defaults to the config file value, or `0xFFFFF` if unset there.
    #[arg(long = "outer-gas-price", value_name = "WEI")]
    pub outer_gas_price: Option<u64>,
    /// Gas limit of the transactions sent to the relay hub.
    ///
    /// Defaults to the config file value, or `0xFFFFFFFFFF` if unset there.
    #[arg(long = "outer-gas-limit", value_name = "GAS")]
    pub outer_gas_limit: Option<u64>,
    /// The secret key to sign relay hub transactions with.
    #[arg(long = "secret-key", value_name = "SECRET_KEY", env = "RELAY_SK")]
    pub secret_key: Option<String>,
    /// The hex encoded Falcon-512 secret key.
    #[arg(long = "pq-secret-key", value_name = "SECRET_KEY", env = "RELAY_PQ_SK")]
    pub pq_secret_key: Option<String>,
    /// The hex encoded Falcon-512 public key.
    #[arg(long = "pq-public-key", value_name = "PUBLIC_KEY", env = "RELAY_PQ_PK")]
    pub pq_public_key: Option<String>,
    /// Reads all values from the config file.
    ///
    /// This makes required CLI args not required, but it is important that any required CLI args
    /// have been configured in the config and do not use default values, as this is likely not
    /// what you want.
    #[arg(long = "config-only", default_value_t = false)]
    pub config_only: bool,
}

impl Args {
    /// Run the relayer service.
    pub async fn run(self) -> eyre::Result<()> {
        let config_path = self.config.clone();
        try_spawn_with_args(self, &config_path).await?.stopped().await?;

        Ok(())
    }

    /// Merges [`Args`] values into an existing [`RelayConfig`] instance.
    pub fn merge_relay_config(self, config: RelayConfig) -> eyre::Result<RelayConfig> {
        if self.config_only {
            return Ok(config);
        }

        let mut config = config
            .with_address(self.address)
            .with_port(self.port)
            .with_metrics_port(self.metrics_port)
            .with_relay_hub(self.relay_hub)
            .with_outer_gas_price(self.outer_gas_price)
            .with_outer_gas_limit(self.outer_gas_limit)
            .with_operator_key(self.secret_key)
            .with_pq_keys(self.pq_secret_key, self.pq_public_key);
        if let Some(upstream) = &self.upstream {
            config = config.with_upstream(UpstreamConfig::from_url(upstream)?);
        }

        Ok(config.with_upstream_timeout(self.upstream_timeout))
    }
}

/// Parses a string representing seconds to a [`Duration`].
fn parse_duration_secs(arg: &str) -> Result<std::time::Duration, std::num::ParseIntError> {
    let seconds = arg.parse()?;
    Ok(std::time::Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_args() {
        let args = Args::try_parse_from([
            "pq-relay",
            "--upstream",
            "https://rpc.example.org/v1",
            "--relay-hub",
            "0x1111111111111111111111111111111111111111",
            "--http.port",
            "8080",
            "--upstream-timeout",
            "7",
            "--secret-key",
            "0x01",
        ])
        .unwrap();

        let config = args.merge_relay_config(RelayConfig::default()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.relay_hub, Address::repeat_byte(0x11));
        assert_eq!(config.upstream.host, "rpc.example.org");
        assert!(config.upstream.ssl);
        assert_eq!(config.upstream.path, "/v1");
        assert_eq!(config.upstream.timeout, Some(Duration::from_secs(7)));
        assert_eq!(config.secrets.operator_key, "0x01");
        assert_eq!(config.outer_tx.gas_price, 0xFFFFF);
    }

    #[test]
    fn keeps_file_values_without_flags() {
        let file = RelayConfig::default()
            .with_upstream(UpstreamConfig {
                timeout: Some(Duration::from_secs(30)),
                ..Default::default()
            })
            .with_outer_gas_price(Some(7))
            .with_outer_gas_limit(Some(100_000));

        let args = Args::try_parse_from([
            "pq-relay",
            "--upstream",
            "http://node.example.org:8545",
            "--relay-hub",
            "0x1111111111111111111111111111111111111111",
        ])
        .unwrap();
        let config = args.merge_relay_config(file.clone()).unwrap();

        assert_eq!(config.outer_tx.gas_price, 7);
        assert_eq!(config.outer_tx.gas_limit, 100_000);
        assert_eq!(config.upstream.host, "node.example.org");
        assert_eq!(config.upstream.timeout, Some(Duration::from_secs(30)));

        let args = Args::try_parse_from([
            "pq-relay",
            "--upstream",
            "http://node.example.org:8545",
            "--relay-hub",
            "0x1111111111111111111111111111111111111111",
            "--outer-gas-price",
            "9",
            "--upstream-timeout",
            "5",
        ])
        .unwrap();
        let config = args.merge_relay_config(file).unwrap();

        assert_eq!(config.outer_tx.gas_price, 9);
        assert_eq!(config.outer_tx.gas_limit, 100_000);
        assert_eq!(config.upstream.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn requires_upstream_and_relay_hub() {
        assert!(Args::try_parse_from(["pq-relay", "--upstream", "http://localhost:8545"]).is_err());
        assert!(Args::try_parse_from(["pq-relay", "--config-only"]).is_ok());
    }

    #[test]
    fn config_only_keeps_file_values() {
        let args = Args::try_parse_from(["pq-relay", "--config-only", "--http.port", "1"]).unwrap();
        let config = args.merge_relay_config(RelayConfig::default().with_port(2)).unwrap();
        assert_eq!(config.server.port, 2);
    }
}

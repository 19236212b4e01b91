//! Relay configuration.
use crate::constants::{
    DEFAULT_OUTER_GAS_LIMIT, DEFAULT_OUTER_GAS_PRICE, DEFAULT_PORT, DEFAULT_UPSTREAM_PORT,
};
use alloy::primitives::Address;
use eyre::{Context, OptionExt, bail};
use serde::{Deserialize, Serialize};
use std::{
    net::{IpAddr, Ipv4Addr},
    path::Path,
    time::Duration,
};
use url::Url;

/// Relay configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Upstream node configuration.
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Relay hub address.
    pub relay_hub: Address,
    /// Gas settings of the transactions sent to the relay hub.
    #[serde(default)]
    pub outer_tx: OuterTxConfig,
    /// Secrets.
    #[serde(skip_serializing, default)]
    pub secrets: SecretsConfig,
}

impl RelayConfig {
    /// Sets the IP address to serve the RPC on.
    pub fn with_address(mut self, address: IpAddr) -> Self {
        self.server.address = address;
        self
    }

    /// Sets the port to serve the RPC on.
    pub fn with_port(mut self, port: u16) -> Self {
        self.server.port = port;
        self
    }

    /// Sets the port to serve the metrics on.
    pub fn with_metrics_port(mut self, port: Option<u16>) -> Self {
        self.server.metrics_port = port.or(self.server.metrics_port);
        self
    }

    /// Sets the upstream node.
    ///
    /// The current timeout is kept if `upstream` does not set one.
    pub fn with_upstream(mut self, upstream: UpstreamConfig) -> Self {
        let timeout = upstream.timeout.or(self.upstream.timeout);
        self.upstream = UpstreamConfig { timeout, ..upstream };
        self
    }

    /// Sets the timeout of upstream requests.
    pub fn with_upstream_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.upstream.timeout = timeout.or(self.upstream.timeout);
        self
    }

    /// Sets the relay hub address.
    pub fn with_relay_hub(mut self, relay_hub: Option<Address>) -> Self {
        if let Some(relay_hub) = relay_hub {
            self.relay_hub = relay_hub;
        }
        self
    }

    /// Sets the gas price of the transactions sent to the relay hub.
    pub fn with_outer_gas_price(mut self, gas_price: Option<u64>) -> Self {
        if let Some(gas_price) = gas_price {
            self.outer_tx.gas_price = gas_price;
        }
        self
    }

    /// Sets the gas limit of the transactions sent to the relay hub.
    pub fn with_outer_gas_limit(mut self, gas_limit: Option<u64>) -> Self {
        if let Some(gas_limit) = gas_limit {
            self.outer_tx.gas_limit = gas_limit;
        }
        self
    }

    /// Sets the secret key of the relay operator.
    pub fn with_operator_key(mut self, operator_key: Option<String>) -> Self {
        if let Some(operator_key) = operator_key {
            self.secrets.operator_key = operator_key;
        }
        self
    }

    /// Sets the post-quantum keypair.
    pub fn with_pq_keys(mut self, secret_key: Option<String>, public_key: Option<String>) -> Self {
        if let Some(secret_key) = secret_key {
            self.secrets.pq_secret_key = secret_key;
        }
        if let Some(public_key) = public_key {
            self.secrets.pq_public_key = public_key;
        }
        self
    }

    /// Load from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> eyre::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .wrap_err_with(|| format!("failed to read config file: {}", path.display()))?;
        let config = serde_yaml::from_reader(&file)
            .wrap_err_with(|| format!("failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save to a YAML file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> eyre::Result<()> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)
            .wrap_err_with(|| format!("failed to write config file: {}", path.display()))?;
        Ok(())
    }
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address to serve the RPC on.
    pub address: IpAddr,
    /// The port to serve the RPC on.
    pub port: u16,
    /// The port to serve the metrics on.
    ///
    /// No exporter is started if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_port: Option<u16>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { address: IpAddr::V4(Ipv4Addr::LOCALHOST), port: DEFAULT_PORT, metrics_port: None }
    }
}

/// Upstream node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Host of the upstream node.
    pub host: String,
    /// Port of the upstream node.
    pub port: u16,
    /// Whether to connect over TLS.
    #[serde(default)]
    pub ssl: bool,
    /// Path of the JSON-RPC endpoint.
    #[serde(default = "default_path")]
    pub path: String,
    /// Timeout of a single upstream request.
    ///
    /// Requests wait indefinitely if unset.
    #[serde(default, with = "duration_secs", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::LOCALHOST.to_string(),
            port: DEFAULT_UPSTREAM_PORT,
            ssl: false,
            path: default_path(),
            timeout: None,
        }
    }
}

impl UpstreamConfig {
    /// Splits an HTTP(S) URL into its parts.
    pub fn from_url(url: &Url) -> eyre::Result<Self> {
        let ssl = match url.scheme() {
            "http" => false,
            "https" => true,
            scheme => bail!("unsupported upstream scheme: {scheme}"),
        };
        let host = url.host_str().ok_or_eyre("upstream url has no host")?.to_string();
        let port = url.port_or_known_default().ok_or_eyre("upstream url has no port")?;

        Ok(Self { host, port, ssl, path: url.path().to_string(), timeout: None })
    }

    /// Returns the URL of the JSON-RPC endpoint.
    pub fn url(&self) -> eyre::Result<Url> {
        let scheme = if self.ssl { "https" } else { "http" };
        let separator = if self.path.starts_with('/') { "" } else { "/" };
        let url = format!("{scheme}://{}:{}{separator}{}", self.host, self.port, self.path);
        url.parse().wrap_err_with(|| format!("invalid upstream url: {url}"))
    }
}

fn default_path() -> String {
    "/".to_string()
}

/// Gas settings of the transactions sent to the relay hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OuterTxConfig {
    /// Gas price.
    pub gas_price: u64,
    /// Gas limit.
    pub gas_limit: u64,
}

impl Default for OuterTxConfig {
    fn default() -> Self {
        Self { gas_price: DEFAULT_OUTER_GAS_PRICE, gas_limit: DEFAULT_OUTER_GAS_LIMIT }
    }
}

/// Secrets, never written to the config file.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SecretsConfig {
    /// Hex encoded secp256k1 secret key of the relay operator.
    #[serde(default)]
    pub operator_key: String,
    /// Hex encoded Falcon-512 secret key.
    #[serde(default)]
    pub pq_secret_key: String,
    /// Hex encoded Falcon-512 public key.
    #[serde(default)]
    pub pq_public_key: String,
}

impl std::fmt::Debug for SecretsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretsConfig").finish_non_exhaustive()
    }
}

/// (De)serializes an optional [`Duration`] as whole seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_u64(duration.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn test_config_yaml() {
        let s = r#"
server:
  address: 0.0.0.0
  port: 8080
  metrics_port: 9000
upstream:
  host: node.example.org
  port: 443
  ssl: true
  path: /rpc
  timeout: 10
relay_hub: "0x1111111111111111111111111111111111111111"
outer_tx:
  gas_price: 1048575
  gas_limit: 1099511627775
"#;
        let config = serde_yaml::from_str::<RelayConfig>(s).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.metrics_port, Some(9000));
        assert_eq!(config.upstream.timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.relay_hub, address!("0x1111111111111111111111111111111111111111"));
        assert_eq!(config.outer_tx, OuterTxConfig::default());
        assert_eq!(config.upstream.url().unwrap().as_str(), "https://node.example.org/rpc");

        let yaml = serde_yaml::to_string(&config).unwrap();
        let from_yaml = serde_yaml::from_str::<RelayConfig>(&yaml).unwrap();
        assert_eq!(from_yaml.server, config.server);
        assert_eq!(from_yaml.upstream, config.upstream);
    }

    #[test]
    fn test_minimal_config_yaml() {
        let s = r#"
server:
  address: 127.0.0.1
  port: 9119
relay_hub: "0x1111111111111111111111111111111111111111"
"#;
        let config = serde_yaml::from_str::<RelayConfig>(s).unwrap();
        assert_eq!(config.server.metrics_port, None);
        assert_eq!(config.upstream, UpstreamConfig::default());
        assert_eq!(config.outer_tx.gas_price, 0xFFFFF);
        assert_eq!(config.outer_tx.gas_limit, 0xFFFFFFFFFF);
    }

    #[test]
    fn secrets_are_not_serialized() {
        let config = RelayConfig::default()
            .with_operator_key(Some("0xdead".into()))
            .with_pq_keys(Some("0xbeef".into()), Some("0xcafe".into()));

        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(!yaml.contains("secrets"));
        assert!(!yaml.contains("dead"));
        assert!(!format!("{config:?}").contains("beef"));
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.yaml");

        let config = RelayConfig::default()
            .with_port(1234)
            .with_relay_hub(Some(Address::repeat_byte(0x22)))
            .with_upstream_timeout(Some(Duration::from_secs(3)));
        config.save_to_file(&path).unwrap();

        let loaded = RelayConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.server.port, 1234);
        assert_eq!(loaded.relay_hub, Address::repeat_byte(0x22));
        assert_eq!(loaded.upstream.timeout, Some(Duration::from_secs(3)));

        assert!(RelayConfig::load_from_file(dir.path().join("missing.yaml")).is_err());
    }

    #[test]
    fn upstream_url() {
        let upstream =
            UpstreamConfig::from_url(&"http://localhost:8545/".parse().unwrap()).unwrap();
        assert_eq!(upstream.host, "localhost");
        assert_eq!(upstream.port, 8545);
        assert!(!upstream.ssl);
        assert_eq!(upstream.url().unwrap().as_str(), "http://localhost:8545/");

        let upstream =
            UpstreamConfig::from_url(&"https://rpc.example.org/v1".parse().unwrap()).unwrap();
        assert_eq!(upstream.port, 443);
        assert!(upstream.ssl);
        assert_eq!(upstream.url().unwrap().as_str(), "https://rpc.example.org/v1");

        let upstream = UpstreamConfig { path: "rpc".into(), ..Default::default() };
        assert_eq!(upstream.url().unwrap().as_str(), "http://127.0.0.1:8545/rpc");

        assert!(UpstreamConfig::from_url(&"ws://localhost:8546".parse().unwrap()).is_err());
    }

    #[test]
    fn cli_overrides_only_when_set() {
        let config = RelayConfig::default()
            .with_metrics_port(Some(9000))
            .with_metrics_port(None)
            .with_relay_hub(Some(Address::repeat_byte(1)))
            .with_relay_hub(None);
        assert_eq!(config.server.metrics_port, Some(9000));
        assert_eq!(config.relay_hub, Address::repeat_byte(1));
    }
}

//! Gateway configuration
//!
//! Settings come from a YAML file and are then overridden by `LOAN_GATEWAY_*`
//! environment variables, so the signing key never has to live on disk.

use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_RPC_URL: &str = "LOAN_GATEWAY_RPC_URL";
pub const ENV_PRIVATE_KEY: &str = "LOAN_GATEWAY_PRIVATE_KEY";
pub const ENV_CONTRACT_ADDRESS: &str = "LOAN_GATEWAY_CONTRACT_ADDRESS";
pub const ENV_ABI_PATH: &str = "LOAN_GATEWAY_ABI_PATH";
pub const ENV_HOST: &str = "LOAN_GATEWAY_HOST";
pub const ENV_PORT: &str = "LOAN_GATEWAY_PORT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("missing required setting `{0}`")]
    Missing(&'static str),
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Top-level gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub ledger: LedgerConfig,
    pub endpoint: EndpointConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Everything needed to build the contract binding
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint of the ledger network
    pub rpc_url: String,
    /// Hex-encoded signing key
    pub private_key: String,
    /// Address of the loan contract
    pub contract_address: String,
    /// Path to the contract ABI (JSON)
    pub abi_path: PathBuf,
    /// Name of the write method invoked per request
    pub method: String,
    /// Fetched from the provider when absent
    pub chain_id: Option<u64>,
    /// Blocks to wait for before a transaction counts as confirmed
    pub confirmations: usize,
    /// Decimal places applied to `amount` before encoding (18 converts ether to wei)
    pub amount_decimals: u32,
    pub gas_limit: Option<u64>,
    pub gas_price_gwei: Option<u64>,
    /// Receipt polling interval
    pub poll_interval_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: String::new(),
            private_key: String::new(),
            contract_address: String::new(),
            abi_path: PathBuf::from("config/loan_contract.abi.json"),
            method: "requestLoan".to_string(),
            chain_id: None,
            confirmations: 1,
            amount_decimals: 0,
            gas_limit: None,
            gas_price_gwei: None,
            poll_interval_ms: 7000,
        }
    }
}

// Keeps the signing key out of logs.
impl fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &"<redacted>")
            .field("contract_address", &self.contract_address)
            .field("abi_path", &self.abi_path)
            .field("method", &self.method)
            .field("chain_id", &self.chain_id)
            .field("confirmations", &self.confirmations)
            .field("amount_decimals", &self.amount_decimals)
            .field("gas_limit", &self.gas_limit)
            .field("gas_price_gwei", &self.gas_price_gwei)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .finish()
    }
}

impl LedgerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Behaviour of the loan endpoint itself
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Upper bound on submission plus confirmation. `None` waits forever.
    pub confirmation_timeout_secs: Option<u64>,
    /// Reject missing or non-numeric fields with 400 instead of forwarding them
    pub validate_input: bool,
}

impl EndpointConfig {
    pub fn confirmation_timeout(&self) -> Option<Duration> {
        self.confirmation_timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// Parse a YAML config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Load the file if it exists, apply environment overrides and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            info!("Config file {:?} not found, using defaults", path);
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup`, normally the process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_RPC_URL) {
            self.ledger.rpc_url = url;
        }
        if let Some(key) = lookup(ENV_PRIVATE_KEY) {
            self.ledger.private_key = key;
        }
        if let Some(address) = lookup(ENV_CONTRACT_ADDRESS) {
            self.ledger.contract_address = address;
        }
        if let Some(abi_path) = lookup(ENV_ABI_PATH) {
            self.ledger.abi_path = PathBuf::from(abi_path);
        }
        if let Some(host) = lookup(ENV_HOST) {
            self.server.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.server.port = port.parse().map_err(|e| ConfigError::Invalid {
                field: "server.port",
                reason: format!("{}", e),
            })?;
        }
        Ok(())
    }

    /// Check that the contract binding can be built from these settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ledger.rpc_url.trim().is_empty() {
            return Err(ConfigError::Missing("ledger.rpc_url"));
        }
        if self.ledger.private_key.trim().is_empty() {
            return Err(ConfigError::Missing("ledger.private_key"));
        }
        if self.ledger.contract_address.trim().is_empty() {
            return Err(ConfigError::Missing("ledger.contract_address"));
        }
        if self.ledger.method.trim().is_empty() {
            return Err(ConfigError::Missing("ledger.method"));
        }
        if self.ledger.confirmations == 0 {
            return Err(ConfigError::Invalid {
                field: "ledger.confirmations",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn complete_yaml() -> &'static str {
        r#"
server:
  port: 9090
ledger:
  rpc_url: "http://127.0.0.1:8545"
  private_key: "0xdeadbeef"
  contract_address: "0x5FbDB2315678afecb367f032d93F642f64180aa3"
  amount_decimals: 18
  gas_limit: 2000000
endpoint:
  confirmation_timeout_secs: 30
"#
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.ledger.method, "requestLoan");
        assert_eq!(config.ledger.confirmations, 1);
        assert!(config.endpoint.confirmation_timeout().is_none());
        assert!(!config.endpoint.validate_input);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml(complete_yaml()).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.ledger.amount_decimals, 18);
        assert_eq!(config.ledger.gas_limit, Some(2_000_000));
        assert_eq!(config.ledger.gas_price_gwei, None);
        assert_eq!(
            config.endpoint.confirmation_timeout(),
            Some(Duration::from_secs(30))
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(complete_yaml().as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.ledger.rpc_url, "http://127.0.0.1:8545");
    }

    #[test]
    fn test_from_missing_file_is_io_error() {
        let err = Config::from_file("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_overrides_win_over_file() {
        let mut config = Config::from_yaml(complete_yaml()).unwrap();
        let env: HashMap<&str, &str> = [
            (ENV_PRIVATE_KEY, "0xfeedface"),
            (ENV_PORT, "7000"),
            (ENV_ABI_PATH, "/etc/loan.abi.json"),
        ]
        .into_iter()
        .collect();

        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.ledger.private_key, "0xfeedface");
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.ledger.abi_path, PathBuf::from("/etc/loan.abi.json"));
        assert_eq!(config.ledger.rpc_url, "http://127.0.0.1:8545");
    }

    #[test]
    fn test_bad_port_override() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(|key| (key == ENV_PORT).then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "server.port", .. }));
    }

    #[test]
    fn test_validate_reports_missing_fields() {
        let config = Config::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing("ledger.rpc_url"))
        ));

        let mut config = Config::from_yaml(complete_yaml()).unwrap();
        config.ledger.private_key.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing("ledger.private_key"))
        ));

        let mut config = Config::from_yaml(complete_yaml()).unwrap();
        config.ledger.confirmations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let config = Config::from_yaml(complete_yaml()).unwrap();
        let rendered = format!("{:?}", config.ledger);
        assert!(!rendered.contains("deadbeef"));
        assert!(rendered.contains("<redacted>"));
    }
}

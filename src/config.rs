//! Oracle configuration
//!
//! Network selection, funding address, fee and node RPC endpoint, read from
//! `BET_ORACLE_*` environment variables (the binary loads `.env` first).

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::runtime::{PipelineSettings, DEFAULT_TX_FEE};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid chain network {0:?}: must be one of mainnet, testnet, regtest")]
    InvalidNetwork(String),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Regtest,
}

impl Network {
    pub fn as_str(self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Regtest => "regtest",
        }
    }

    /// Operator address that funds opcode transactions on this network
    pub fn default_funding_address(self) -> &'static str {
        match self {
            Network::Mainnet => "Weqz3PFBq3SniYF5HS8kuj72q9FABKzDrP",
            Network::Testnet => "TLceyDrdPLBu8DK6UZjKu4vCDUQBGPybc",
            Network::Regtest => "TFvZVYGdrxxNunQLzSnRSC58BSRA7si6zu",
        }
    }

    pub fn default_rpc_port(self) -> u16 {
        match self {
            Network::Mainnet => 55003,
            Network::Testnet => 55005,
            Network::Regtest => 55007,
        }
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "regtest" => Ok(Network::Regtest),
            _ => Err(ConfigError::InvalidNetwork(s.to_string())),
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcConfig {
    pub url: String,
    pub user: String,
    pub password: String,
}

impl RpcConfig {
    pub fn local(network: Network) -> Self {
        Self {
            url: format!("http://127.0.0.1:{}", network.default_rpc_port()),
            user: String::new(),
            password: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleConfig {
    pub network: Network,
    /// Overrides the network's default funding address
    pub funding_address: Option<String>,
    pub fee: u64,
    pub rpc: RpcConfig,
    pub dry_run: bool,
    /// JSON snapshot of the mapping registry
    pub mappings_path: Option<PathBuf>,
}

impl OracleConfig {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            funding_address: None,
            fee: DEFAULT_TX_FEE,
            rpc: RpcConfig::local(network),
            dry_run: false,
            mappings_path: None,
        }
    }

    /// Read `BET_ORACLE_*` variables from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (environment, test map)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let network = match lookup("BET_ORACLE_NETWORK") {
            Some(value) => value.parse()?,
            None => Network::Mainnet,
        };
        let mut config = Self::new(network);

        config.funding_address = lookup("BET_ORACLE_ADDRESS").filter(|a| !a.trim().is_empty());

        if let Some(value) = lookup("BET_ORACLE_FEE") {
            config.fee = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "BET_ORACLE_FEE",
                value: value.clone(),
            })?;
        }

        if let Some(url) = lookup("BET_ORACLE_RPC_URL") {
            config.rpc.url = url;
        }
        if let Some(user) = lookup("BET_ORACLE_RPC_USER") {
            config.rpc.user = user;
        }
        if let Some(password) = lookup("BET_ORACLE_RPC_PASSWORD") {
            config.rpc.password = password;
        }

        if let Some(value) = lookup("BET_ORACLE_DRY_RUN") {
            config.dry_run = parse_flag(&value).ok_or(ConfigError::InvalidValue {
                key: "BET_ORACLE_DRY_RUN",
                value,
            })?;
        }

        config.mappings_path = lookup("BET_ORACLE_MAPPINGS").map(PathBuf::from);

        Ok(config)
    }

    /// Funding address in effect for the configured network
    pub fn funding_address(&self) -> &str {
        self.funding_address
            .as_deref()
            .unwrap_or_else(|| self.network.default_funding_address())
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            funding_address: self.funding_address().to_string(),
            fee: self.fee,
            dry_run: self.dry_run,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<OracleConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        OracleConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.network, Network::Mainnet);
        assert_eq!(config.fee, DEFAULT_TX_FEE);
        assert_eq!(config.funding_address(), "Weqz3PFBq3SniYF5HS8kuj72q9FABKzDrP");
        assert_eq!(config.rpc.url, "http://127.0.0.1:55003");
        assert!(!config.dry_run);
    }

    #[test]
    fn test_network_selects_address() {
        let config = config_from(&[("BET_ORACLE_NETWORK", "regtest")]).unwrap();
        assert_eq!(config.funding_address(), "TFvZVYGdrxxNunQLzSnRSC58BSRA7si6zu");
        assert_eq!(config.pipeline_settings().funding_address, config.funding_address());
    }

    #[test]
    fn test_address_override() {
        let config = config_from(&[
            ("BET_ORACLE_NETWORK", "testnet"),
            ("BET_ORACLE_ADDRESS", "TMyOwnAddress"),
            ("BET_ORACLE_FEE", "250000"),
            ("BET_ORACLE_DRY_RUN", "yes"),
        ])
        .unwrap();
        let settings = config.pipeline_settings();
        assert_eq!(settings.funding_address, "TMyOwnAddress");
        assert_eq!(settings.fee, 250_000);
        assert!(settings.dry_run);
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            config_from(&[("BET_ORACLE_NETWORK", "devnet")]).unwrap_err(),
            ConfigError::InvalidNetwork("devnet".to_string())
        );
        assert!(matches!(
            config_from(&[("BET_ORACLE_FEE", "0.001")]).unwrap_err(),
            ConfigError::InvalidValue { key: "BET_ORACLE_FEE", .. }
        ));
        assert!(config_from(&[("BET_ORACLE_DRY_RUN", "maybe")]).is_err());
    }
}

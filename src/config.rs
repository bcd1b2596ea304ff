//! Configuration for the wallet, its chain collaborator and logging.
//!
//! Values come from defaults, an optional JSON file and `HDWALLET_*`
//! environment variables, in that order of increasing precedence.

use crate::chain::{ChainError, JsonRpcClient, TokenContract, DEFAULT_TOKEN_ADDRESS};
use crate::core::constants::{
    DEFAULT_NETWORK, LOCAL_CHAIN_ID, LOCAL_ENDPOINT, MAINNET_CHAIN_ID, MAINNET_ENDPOINT,
    NETWORK_LOCAL, NETWORK_MAINNET, NETWORK_SEPOLIA, SEPOLIA_CHAIN_ID, SEPOLIA_ENDPOINT,
};
use crate::logging::LoggingConfig;
use crate::wallet::{default_keystore_path, Address, ScryptParams, SigningScheme, Wallet};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
    #[error("Unknown network '{0}'. Valid options: local, sepolia, mainnet")]
    UnknownNetwork(String),
}

/// Endpoint and chain id of a named network.
pub fn network_endpoint(network: &str) -> Result<(&'static str, u64), ConfigError> {
    match network {
        NETWORK_LOCAL => Ok((LOCAL_ENDPOINT, LOCAL_CHAIN_ID)),
        NETWORK_SEPOLIA => Ok((SEPOLIA_ENDPOINT, SEPOLIA_CHAIN_ID)),
        NETWORK_MAINNET => Ok((MAINNET_ENDPOINT, MAINNET_CHAIN_ID)),
        other => Err(ConfigError::UnknownNetwork(other.to_string())),
    }
}

/// Where keystores live and how they are encrypted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeystoreConfig {
    pub dir: PathBuf,
    pub scrypt: ScryptParams,
}

impl Default for KeystoreConfig {
    fn default() -> Self {
        Self {
            dir: default_keystore_path(),
            scrypt: ScryptParams::light(),
        }
    }
}

/// Node connection and signing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub network: String,
    pub endpoint: String,
    pub chain_id: u64,
    pub token_contract: Address,
    /// Sign with EIP-155 replay protection instead of the Homestead scheme.
    pub replay_protection: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            network: DEFAULT_NETWORK.to_string(),
            endpoint: LOCAL_ENDPOINT.to_string(),
            chain_id: LOCAL_CHAIN_ID,
            token_contract: DEFAULT_TOKEN_ADDRESS,
            replay_protection: false,
        }
    }
}

impl ChainConfig {
    pub fn signing_scheme(&self) -> SigningScheme {
        if self.replay_protection {
            SigningScheme::Eip155 {
                chain_id: self.chain_id,
            }
        } else {
            SigningScheme::Homestead
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub keystore: KeystoreConfig,
    pub chain: ChainConfig,
    pub logging: LoggingConfig,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Config for a named network (`local`, `sepolia`, `mainnet`).
    pub fn for_network(network: &str) -> Result<Self, ConfigError> {
        Self::default().with_network(network)
    }

    /// Switch network, resetting endpoint and chain id to that network's.
    pub fn with_network(mut self, network: &str) -> Result<Self, ConfigError> {
        let (endpoint, chain_id) = network_endpoint(network)?;
        self.chain.network = network.to_string();
        self.chain.endpoint = endpoint.to_string();
        self.chain.chain_id = chain_id;
        Ok(self)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.chain.endpoint = endpoint.into();
        self
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain.chain_id = chain_id;
        self
    }

    pub fn with_keystore_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.keystore.dir = dir.into();
        self
    }

    pub fn with_replay_protection(mut self, enabled: bool) -> Self {
        self.chain.replay_protection = enabled;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.logging.debug = debug;
        self
    }

    /// Load a JSON config file. Missing fields keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Defaults overlaid with environment variables
    ///
    /// - `HDWALLET_KEYSTORE_DIR`
    /// - `HDWALLET_NETWORK`
    /// - `HDWALLET_RPC`
    /// - `HDWALLET_CHAIN_ID`
    /// - `HDWALLET_TOKEN_CONTRACT`
    /// - `HDWALLET_EIP155`
    /// - `HDWALLET_DEBUG`, plus the logging variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env()
    }

    /// Overlay environment variables onto `self`.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        let mut config = self.apply_vars(|key| std::env::var(key).ok())?;
        config.logging = config.logging.apply_env();
        Ok(config)
    }

    fn apply_vars(
        mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(dir) = var("HDWALLET_KEYSTORE_DIR") {
            self.keystore.dir = PathBuf::from(dir);
        }

        if let Some(network) = var("HDWALLET_NETWORK") {
            self = self.with_network(&network)?;
        }

        if let Some(endpoint) = var("HDWALLET_RPC") {
            self.chain.endpoint = endpoint;
        }

        if let Some(chain_id) = var("HDWALLET_CHAIN_ID") {
            self.chain.chain_id = chain_id.parse().map_err(|_| ConfigError::InvalidValue {
                key: "HDWALLET_CHAIN_ID".to_string(),
                value: chain_id.clone(),
            })?;
        }

        if let Some(contract) = var("HDWALLET_TOKEN_CONTRACT") {
            self.chain.token_contract =
                contract.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "HDWALLET_TOKEN_CONTRACT".to_string(),
                    value: contract.clone(),
                })?;
        }

        if var("HDWALLET_EIP155").is_some() {
            self.chain.replay_protection = true;
        }

        if var("HDWALLET_DEBUG").is_some() {
            self.logging.debug = true;
        }

        Ok(self)
    }

    /// Merge with another config; fields of `other` that differ from the
    /// defaults take precedence.
    pub fn merge(mut self, other: Config) -> Self {
        let defaults = Config::default();
        if other.keystore != defaults.keystore {
            self.keystore = other.keystore;
        }
        if other.chain != defaults.chain {
            self.chain = other.chain;
        }
        if other.logging != defaults.logging {
            self.logging = other.logging;
        }
        self
    }

    /// Wallet facade over the configured keystore directory.
    pub fn wallet(&self) -> Wallet {
        Wallet::new(&self.keystore.dir)
            .with_scrypt_params(self.keystore.scrypt)
            .with_signing_scheme(self.chain.signing_scheme())
    }

    pub fn token(&self) -> TokenContract {
        TokenContract::new(self.chain.token_contract)
    }

    pub fn rpc_client(&self) -> Result<JsonRpcClient, ChainError> {
        JsonRpcClient::new(&self.chain.endpoint)
    }
}

//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file with an environment variable
//! override for the admin signer key (`GAVEL_PRIVATE_KEY`), which is never
//! read from the config file.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use serde::Deserialize;

use crate::domain::{ScorePolicy, MAX_DRAWS_PER_BETTOR};
use crate::error::{ConfigError, Result};

mod logging;

pub use logging::LoggingConfig;

/// Chain-facing configuration: RPC endpoint and the auction contract.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub contract_address: String,
    pub chain_id: u64,
    /// Admin signer key; populated from `GAVEL_PRIVATE_KEY` only.
    #[serde(skip)]
    pub private_key: Option<String>,
}

/// Backend bet store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    10
}

/// Settlement workflow tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct SettlementConfig {
    /// Reward per winner in whole tokens, scaled by `token_decimals`.
    pub reward_per_winner: u64,
    #[serde(default = "default_token_decimals")]
    pub token_decimals: u8,
    /// Draws issued per shortlisted bettor, at most 10.
    #[serde(default = "default_draws_per_bettor")]
    pub draws_per_bettor: u8,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_fulfillment_timeout_secs")]
    pub fulfillment_timeout_secs: u64,
    /// Concurrent randomness requests in flight.
    #[serde(default = "default_request_concurrency")]
    pub request_concurrency: usize,
    #[serde(default = "default_transfer_attempts")]
    pub transfer_attempts: u32,
    #[serde(default = "default_transfer_backoff_ms")]
    pub transfer_backoff_ms: u64,
    /// How long a run lock stays valid before a new run may take it over
    /// from a crashed or interrupted holder.
    #[serde(default = "default_run_lock_lease_secs")]
    pub run_lock_lease_secs: u64,
    #[serde(default)]
    pub score_policy: ScorePolicy,
}

fn default_token_decimals() -> u8 {
    18
}

fn default_draws_per_bettor() -> u8 {
    MAX_DRAWS_PER_BETTOR
}

fn default_poll_interval_secs() -> u64 {
    15
}

fn default_fulfillment_timeout_secs() -> u64 {
    30 * 60
}

fn default_request_concurrency() -> usize {
    4
}

fn default_transfer_attempts() -> u32 {
    3
}

fn default_transfer_backoff_ms() -> u64 {
    500
}

fn default_run_lock_lease_secs() -> u64 {
    60 * 60
}

impl SettlementConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    #[must_use]
    pub fn fulfillment_timeout(&self) -> Duration {
        Duration::from_secs(self.fulfillment_timeout_secs)
    }

    #[must_use]
    pub fn transfer_backoff(&self) -> Duration {
        Duration::from_millis(self.transfer_backoff_ms)
    }

    #[must_use]
    pub fn run_lock_lease(&self) -> Duration {
        Duration::from_secs(self.run_lock_lease_secs)
    }

    /// Reward per winner in base token units.
    #[must_use]
    pub fn reward_amount(&self) -> U256 {
        U256::from(self.reward_per_winner)
            * U256::from(10u64).pow(U256::from(u64::from(self.token_decimals)))
    }
}

/// Durable settlement store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("gavel.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub chain: ChainConfig,
    pub backend: BackendConfig,
    pub settlement: SettlementConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;

        let mut config: Self = toml::from_str(&content).map_err(ConfigError::Parse)?;

        // Signer key comes from the environment only, never the config file
        config.chain.private_key = std::env::var("GAVEL_PRIVATE_KEY").ok();

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        url::Url::parse(&self.chain.rpc_url).map_err(|e| ConfigError::InvalidValue {
            field: "chain.rpc_url",
            reason: e.to_string(),
        })?;
        self.contract_address()?;
        url::Url::parse(&self.backend.base_url).map_err(|e| ConfigError::InvalidValue {
            field: "backend.base_url",
            reason: e.to_string(),
        })?;

        if self.settlement.reward_per_winner == 0 {
            return Err(ConfigError::InvalidValue {
                field: "settlement.reward_per_winner",
                reason: "must be positive".into(),
            }
            .into());
        }
        if self.settlement.draws_per_bettor == 0
            || self.settlement.draws_per_bettor > MAX_DRAWS_PER_BETTOR
        {
            return Err(ConfigError::InvalidValue {
                field: "settlement.draws_per_bettor",
                reason: format!("must be between 1 and {MAX_DRAWS_PER_BETTOR}"),
            }
            .into());
        }
        if self.settlement.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "settlement.poll_interval_secs",
                reason: "must be positive".into(),
            }
            .into());
        }
        if self.settlement.fulfillment_timeout_secs < self.settlement.poll_interval_secs {
            return Err(ConfigError::InvalidValue {
                field: "settlement.fulfillment_timeout_secs",
                reason: "must be at least the poll interval".into(),
            }
            .into());
        }
        if self.settlement.request_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "settlement.request_concurrency",
                reason: "must be positive".into(),
            }
            .into());
        }
        if self.settlement.transfer_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "settlement.transfer_attempts",
                reason: "must be positive".into(),
            }
            .into());
        }
        // A live run may legitimately hold the lock for the whole
        // fulfillment wait; a shorter lease would let a second trigger
        // steal it mid-run.
        if self.settlement.run_lock_lease_secs < self.settlement.fulfillment_timeout_secs {
            return Err(ConfigError::InvalidValue {
                field: "settlement.run_lock_lease_secs",
                reason: "must be at least the fulfillment timeout".into(),
            }
            .into());
        }
        self.logging.validate()?;
        Ok(())
    }

    /// Parsed auction contract address.
    pub fn contract_address(&self) -> Result<Address> {
        Address::from_str(&self.chain.contract_address).map_err(|e| {
            ConfigError::InvalidValue {
                field: "chain.contract_address",
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// The admin signer key, required for any run that touches the chain.
    pub fn private_key(&self) -> Result<&str> {
        self.chain
            .private_key
            .as_deref()
            .ok_or_else(|| {
                ConfigError::MissingField {
                    field: "GAVEL_PRIVATE_KEY",
                }
                .into()
            })
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

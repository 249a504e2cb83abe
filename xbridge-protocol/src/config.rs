use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse bridge config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid bridge config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    // Amounts
    pub coin_scale: u64, // Base units per whole coin

    // Address checks
    pub create_address_min_len: usize,
    pub create_address_max_len: usize,
    pub accept_address_lengths: Vec<usize>, // Exact lengths allowed on accept

    // Registry bounds
    pub historic_retention: usize, // Oldest historic entries evicted past this
    pub max_parked_packets: usize,
    #[serde(with = "humantime_serde")]
    pub parked_packet_ttl: Duration,

    // Deduplication bounds
    pub dedup_broadcast_capacity: usize,
    pub dedup_directed_capacity: usize,

    // Swaps still pending/active after this are cancelled by the sweep
    #[serde(with = "humantime_serde")]
    pub swap_timeout: Duration,

    pub protocol_version: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            coin_scale: 100_000_000,

            create_address_min_len: 12,
            create_address_max_len: 36,
            accept_address_lengths: vec![33, 34],

            historic_retention: 1000,
            max_parked_packets: 512,
            parked_packet_ttl: Duration::from_secs(120),

            dedup_broadcast_capacity: 10_000,
            dedup_directed_capacity: 2_000,

            swap_timeout: Duration::from_secs(3600), // 1 hour

            protocol_version: 1,
        }
    }
}

impl BridgeConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.coin_scale == 0 {
            return Err(ConfigError::Invalid("coin_scale must be positive".to_string()));
        }
        if self.create_address_min_len > self.create_address_max_len {
            return Err(ConfigError::Invalid(format!(
                "create address range {}..={} is empty",
                self.create_address_min_len, self.create_address_max_len
            )));
        }
        if self.accept_address_lengths.is_empty() {
            return Err(ConfigError::Invalid("accept_address_lengths must not be empty".to_string()));
        }
        if self.historic_retention == 0 || self.dedup_broadcast_capacity == 0 || self.dedup_directed_capacity == 0 {
            return Err(ConfigError::Invalid("retention and dedup bounds must be positive".to_string()));
        }
        Ok(())
    }

    pub fn is_valid_create_address(&self, address: &str) -> bool {
        let len = address.chars().count();
        len >= self.create_address_min_len && len <= self.create_address_max_len
    }

    pub fn is_valid_accept_address(&self, address: &str) -> bool {
        self.accept_address_lengths.contains(&address.chars().count())
    }
}

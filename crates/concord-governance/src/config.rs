//! Governance configuration.
//!
//! Quorum, timelock and input limits. Loaded from TOML or built from one of
//! the presets below.

use std::path::Path;

use concord_types::Amount;
use serde::{Deserialize, Serialize};

use crate::error::{GovernanceError, GovernanceResult};

/// Tunable governance parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// Quorum as a share of total staked supply (basis points)
    pub quorum_bps: u16,
    /// Absolute quorum floor, applied when the supply share is smaller
    pub min_quorum: Amount,
    /// Seconds between queueing and earliest execution
    pub timelock_delay: u64,
    /// Longest accepted proposal description (bytes)
    pub max_description_len: usize,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl GovernanceConfig {
    /// Production parameters: 4% quorum with a one-unit floor, two-day delay.
    pub fn mainnet() -> Self {
        Self {
            quorum_bps: 400,
            min_quorum: Amount::UNIT,
            timelock_delay: 172_800,
            max_description_len: 4_096,
        }
    }

    pub fn testnet() -> Self {
        let mut config = Self::mainnet();
        config.timelock_delay = 60;
        config
    }

    /// Local development: same quorum rule, one-minute delay.
    pub fn devnet() -> Self {
        let mut config = Self::testnet();
        config.max_description_len = 65_536;
        config
    }

    /// Quorum threshold over the given staked supply. Votes cast must
    /// strictly exceed this value.
    pub fn quorum_threshold(&self, total_staked: Amount) -> Amount {
        total_staked.mul_bps(self.quorum_bps).max(self.min_quorum)
    }

    pub fn validate(&self) -> GovernanceResult<()> {
        if self.quorum_bps == 0 || self.quorum_bps > 10_000 {
            return Err(GovernanceError::InvalidConfig(format!(
                "quorum_bps must be in 1..=10000, got {}",
                self.quorum_bps
            )));
        }
        if self.min_quorum.is_zero() {
            return Err(GovernanceError::InvalidConfig(
                "min_quorum must be greater than zero".to_string(),
            ));
        }
        if self.max_description_len == 0 {
            return Err(GovernanceError::InvalidConfig(
                "max_description_len must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let config: GovernanceConfig = toml::from_str(contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse governance config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file.
    /// Paths containing `..` are rejected.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        if path.to_string_lossy().contains("..") {
            anyhow::bail!("Invalid path: directory traversal detected");
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;
        Self::from_toml_str(&contents)
            .map_err(|e| anyhow::anyhow!("{} ('{}')", e, path.display()))
    }

    pub fn to_file(&self, path: &Path) -> anyhow::Result<()> {
        if path.to_string_lossy().contains("..") {
            anyhow::bail!("Invalid path: directory traversal detected");
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(|e| {
            anyhow::anyhow!("Failed to write config file '{}': {}", path.display(), e)
        })?;
        Ok(())
    }
}

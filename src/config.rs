use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::engine::{RankEngineConfig, TimePeriod};
use crate::error::ConfigError;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    pub client_addr: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TimePeriodSection {
    #[serde(default)]
    pub start_secs: u64,
    #[serde(default)]
    pub interval_secs: u64,
    #[serde(default)]
    pub duration_secs: u64,
}

impl From<TimePeriodSection> for TimePeriod {
    fn from(s: TimePeriodSection) -> Self {
        TimePeriod::new(s.start_secs, s.interval_secs, s.duration_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankSection {
    pub id: u32,
    #[serde(default)]
    pub max_size: u32,
    #[serde(default)]
    pub redundant_node_num: u32,
    #[serde(default)]
    pub primary_rank_id: u32,
    #[serde(default)]
    pub clear_period: TimePeriodSection,
    #[serde(default)]
    pub snapshot_period: TimePeriodSection,
    #[serde(default)]
    pub no_update_period: TimePeriodSection,
}

impl RankSection {
    pub fn is_primary(&self) -> bool {
        self.primary_rank_id == 0
    }

    pub fn engine_config(&self) -> RankEngineConfig {
        RankEngineConfig {
            max_size: self.max_size,
            redundant_node_num: self.redundant_node_num,
            clear_period: self.clear_period.into(),
            snapshot_period: self.snapshot_period.into(),
            no_update_period: self.no_update_period.into(),
        }
    }
}

/// The rank topology and server bindings loaded from a TOML config file. CLI flags take
/// precedence over the corresponding file value, since the set of ranks can't be expressed on
/// the command line.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default, rename = "rank")]
    pub ranks: Vec<RankSection>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { client_addr: None }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Checks the invariants the dispatcher relies on at startup: unique rank ids, every
    /// snapshot naming a primary that actually is one, and no rank declaring a redundant tail
    /// without a capacity for it to extend.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for rank in &self.ranks {
            if !seen.insert(rank.id) {
                return Err(ConfigError::DuplicateRank(rank.id));
            }
        }
        let primaries: HashSet<u32> = self
            .ranks
            .iter()
            .filter(|r| r.is_primary())
            .map(|r| r.id)
            .collect();
        for rank in &self.ranks {
            if !rank.is_primary() && !primaries.contains(&rank.primary_rank_id) {
                return Err(ConfigError::DanglingPrimary(rank.id, rank.primary_rank_id));
            }
            if rank.max_size == 0 && rank.redundant_node_num != 0 {
                return Err(ConfigError::RedundantWithoutCapacity(rank.id));
            }
        }
        Ok(())
    }
}

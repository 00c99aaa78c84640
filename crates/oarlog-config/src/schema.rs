//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Where the logbook is kept
    #[serde(default)]
    pub storage: RawStorageConfig,

    /// Level policy defaults
    #[serde(default)]
    pub levels: RawLevelsConfig,
}

/// Storage settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawStorageConfig {
    /// Data directory for the database
    pub data_dir: Option<PathBuf>,
}

/// Level policy settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawLevelsConfig {
    /// Thresholds keyed by boat type identifier (e.g. `four_rowers_coxless`)
    ///
    /// Kept as strings so unknown keys are reported by validation instead of
    /// failing the whole parse.
    #[serde(default)]
    pub boat_types: BTreeMap<String, RawBoatTypeThresholds>,
}

/// Alert/block thresholds for one boat type. A missing key disables it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawBoatTypeThresholds {
    pub alert_from: Option<u32>,
    pub block_from: Option<u32>,
}

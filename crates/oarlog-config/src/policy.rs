//! Validated policy structures

use crate::schema::{RawConfig, RawStorageConfig};
use oarlog_api::{BoatType, BoatTypeLevelConfig};
use oarlog_util::{default_data_dir, DATABASE_FILENAME};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Validated club policy ready for use by the session engine
#[derive(Debug, Clone)]
pub struct ClubPolicy {
    pub storage: StorageConfig,

    /// Level thresholds for every configurable boat type
    pub boat_type_levels: BTreeMap<BoatType, BoatTypeLevelConfig>,
}

impl ClubPolicy {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let mut boat_type_levels = default_boat_type_levels();

        for (key, thresholds) in raw.levels.boat_types {
            // Unknown keys and `other` were rejected by validation
            if let Ok(boat_type) = key.parse::<BoatType>()
                && boat_type != BoatType::Other
            {
                boat_type_levels.insert(
                    boat_type,
                    BoatTypeLevelConfig {
                        alert_from: thresholds.alert_from,
                        block_from: thresholds.block_from,
                    },
                );
            }
        }

        Self {
            storage: StorageConfig::from_raw(raw.storage),
            boat_type_levels,
        }
    }

    /// Thresholds configured for a boat type
    pub fn boat_type_level(&self, boat_type: BoatType) -> BoatTypeLevelConfig {
        match boat_type {
            BoatType::Other => BoatTypeLevelConfig::NON_RESTRICTIVE,
            other => self
                .boat_type_levels
                .get(&other)
                .copied()
                .unwrap_or(BoatTypeLevelConfig::DEFAULT),
        }
    }

    /// Boat-type defaults in declaration order, as handed to the level store
    pub fn boat_type_defaults(&self) -> Vec<(BoatType, BoatTypeLevelConfig)> {
        self.boat_type_levels
            .iter()
            .map(|(boat_type, config)| (*boat_type, *config))
            .collect()
    }
}

impl Default for ClubPolicy {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            boat_type_levels: default_boat_type_levels(),
        }
    }
}

fn default_boat_type_levels() -> BTreeMap<BoatType, BoatTypeLevelConfig> {
    BoatType::CONFIGURABLE
        .into_iter()
        .map(|t| (t, BoatTypeLevelConfig::DEFAULT))
        .collect()
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    fn from_raw(raw: RawStorageConfig) -> Self {
        Self {
            data_dir: raw.data_dir.unwrap_or_else(default_data_dir),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILENAME)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_config;

    #[test]
    fn test_unlisted_types_keep_default() {
        let policy = parse_config(
            r#"
            config_version = 1

            [levels.boat_types.four_rowers_coxless]
            alert_from = 1
            block_from = 3
            "#,
        )
        .unwrap();

        assert_eq!(
            policy.boat_type_level(BoatType::FourRowersCoxless),
            BoatTypeLevelConfig {
                alert_from: Some(1),
                block_from: Some(3),
            }
        );
        assert_eq!(
            policy.boat_type_level(BoatType::OneRowerCoxless),
            BoatTypeLevelConfig::DEFAULT
        );
        assert_eq!(
            policy.boat_type_level(BoatType::Other),
            BoatTypeLevelConfig::NON_RESTRICTIVE
        );
        assert_eq!(policy.boat_type_defaults().len(), 6);
    }

    #[test]
    fn test_section_without_keys_disables_both_thresholds() {
        let policy = parse_config(
            r#"
            config_version = 1

            [levels.boat_types.one_rower_coxless]
            "#,
        )
        .unwrap();

        assert_eq!(
            policy.boat_type_level(BoatType::OneRowerCoxless),
            BoatTypeLevelConfig::NON_RESTRICTIVE
        );
    }

    #[test]
    fn test_database_path() {
        let storage = StorageConfig {
            data_dir: PathBuf::from("/srv/club"),
        };
        assert_eq!(storage.database_path(), PathBuf::from("/srv/club/oarlog.db"));
    }
}

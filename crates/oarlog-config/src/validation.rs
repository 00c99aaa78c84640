//! Configuration validation

use crate::schema::{RawBoatTypeThresholds, RawConfig};
use oarlog_api::BoatType;
use thiserror::Error;
use tracing::warn;

/// Validation error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Unknown boat type '{0}'")]
    UnknownBoatType(String),

    #[error("Boat type '{0}' has no seat count and cannot carry level thresholds")]
    NotConfigurable(String),

    #[error("Boat type '{boat_type}': {field} must be at least 1 (omit it to disable)")]
    ZeroThreshold {
        boat_type: String,
        field: &'static str,
    },

    #[error("Storage error: {0}")]
    StorageError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(dir) = &config.storage.data_dir
        && dir.as_os_str().is_empty()
    {
        errors.push(ValidationError::StorageError(
            "data_dir cannot be empty".into(),
        ));
    }

    for (key, thresholds) in &config.levels.boat_types {
        errors.extend(validate_boat_type(key, thresholds));
    }

    errors
}

fn validate_boat_type(key: &str, thresholds: &RawBoatTypeThresholds) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    match key.parse::<BoatType>() {
        Ok(BoatType::Other) => {
            errors.push(ValidationError::NotConfigurable(key.to_string()));
        }
        Ok(_) => {}
        Err(_) => {
            errors.push(ValidationError::UnknownBoatType(key.to_string()));
        }
    }

    for (field, value) in [
        ("alert_from", thresholds.alert_from),
        ("block_from", thresholds.block_from),
    ] {
        if value == Some(0) {
            errors.push(ValidationError::ZeroThreshold {
                boat_type: key.to_string(),
                field,
            });
        }
    }

    // Allowed, but the alert band is then unreachable
    if let (Some(alert), Some(block)) = (thresholds.alert_from, thresholds.block_from)
        && block < alert
    {
        warn!(
            boat_type = key,
            alert_from = alert,
            block_from = block,
            "block_from is lower than alert_from"
        );
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RawLevelsConfig, RawStorageConfig};

    fn config_with(entries: &[(&str, Option<u32>, Option<u32>)]) -> RawConfig {
        RawConfig {
            config_version: 1,
            storage: RawStorageConfig::default(),
            levels: RawLevelsConfig {
                boat_types: entries
                    .iter()
                    .map(|(key, alert_from, block_from)| {
                        (
                            key.to_string(),
                            RawBoatTypeThresholds {
                                alert_from: *alert_from,
                                block_from: *block_from,
                            },
                        )
                    })
                    .collect(),
            },
        }
    }

    #[test]
    fn test_valid_thresholds() {
        let config = config_with(&[
            ("four_rowers_coxless", Some(1), Some(3)),
            ("one_rower_coxless", None, Some(1)),
        ]);
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let config = config_with(&[("two_rowers_coxed", Some(0), None)]);
        let errors = validate_config(&config);
        assert_eq!(
            errors,
            vec![ValidationError::ZeroThreshold {
                boat_type: "two_rowers_coxed".into(),
                field: "alert_from",
            }]
        );
    }

    #[test]
    fn test_other_and_unknown_types_rejected() {
        let config = config_with(&[("other", Some(1), None), ("dragon_boat", Some(1), None)]);
        let errors = validate_config(&config);

        // Errors are collected, not fail-fast
        assert_eq!(errors.len(), 2);
        assert!(errors.contains(&ValidationError::NotConfigurable("other".into())));
        assert!(errors.contains(&ValidationError::UnknownBoatType("dragon_boat".into())));
    }

    #[test]
    fn test_block_below_alert_is_only_a_warning() {
        let config = config_with(&[("eight_rowers_coxed", Some(4), Some(2))]);
        assert!(validate_config(&config).is_empty());
    }
}

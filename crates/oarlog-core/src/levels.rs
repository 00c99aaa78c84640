//! Boat-level policy
//!
//! Two layers decide whether a crew may take a boat:
//! - an optional per-boat minimum (age category and/or seriousness)
//! - per-boat-type thresholds turning the number of ineligible rowers into
//!   an alert or a block
//!
//! [`LevelPolicyStore`] keeps an in-memory projection of both layers. Every
//! mutation is persisted first and only then applied to the projection.

use oarlog_api::{BoatLevelConfig, BoatType, BoatTypeLevelConfig, LevelAction, Rower};
use oarlog_config::ClubPolicy;
use oarlog_store::{LevelConfigStore, StoreError};
use oarlog_util::BoatId;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::{debug, info};

use crate::rules::{age_category_rank, seat_count, seriousness_rank};

/// Level policy mutation errors
#[derive(Debug, Error)]
pub enum LevelConfigError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Boat type '{0}' cannot carry level thresholds")]
    NotConfigurable(BoatType),

    #[error("{field} must be at least 1 (use none to disable)")]
    ZeroThreshold { field: &'static str },
}

/// In-memory projection of the level policy, backed by a [`LevelConfigStore`]
pub struct LevelPolicyStore {
    persistence: Arc<dyn LevelConfigStore>,
    defaults: BTreeMap<BoatType, BoatTypeLevelConfig>,
    boat_configs: RwLock<HashMap<BoatId, BoatLevelConfig>>,
    boat_type_configs: RwLock<BTreeMap<BoatType, BoatTypeLevelConfig>>,
}

impl LevelPolicyStore {
    /// Build the projection from boat-type defaults overlaid with persisted overrides
    pub fn load(
        defaults: impl IntoIterator<Item = (BoatType, BoatTypeLevelConfig)>,
        persistence: Arc<dyn LevelConfigStore>,
    ) -> Result<Self, LevelConfigError> {
        let defaults: BTreeMap<_, _> = BoatType::CONFIGURABLE
            .into_iter()
            .map(|t| (t, BoatTypeLevelConfig::DEFAULT))
            .chain(defaults.into_iter().filter(|(t, _)| *t != BoatType::Other))
            .collect();

        let mut boat_type_configs = defaults.clone();
        for (boat_type, config) in persistence.load_boat_type_level_configs()? {
            if boat_type != BoatType::Other {
                boat_type_configs.insert(boat_type, config);
            }
        }

        let boat_configs: HashMap<_, _> = persistence
            .load_boat_level_configs()?
            .into_iter()
            .map(|c| (c.boat_id.clone(), c))
            .collect();

        info!(boat_configs = boat_configs.len(), "Level policy loaded");

        Ok(Self {
            persistence,
            defaults,
            boat_configs: RwLock::new(boat_configs),
            boat_type_configs: RwLock::new(boat_type_configs),
        })
    }

    /// Load using the boat-type thresholds of a validated club policy
    pub fn from_policy(
        policy: &ClubPolicy,
        persistence: Arc<dyn LevelConfigStore>,
    ) -> Result<Self, LevelConfigError> {
        Self::load(policy.boat_type_defaults(), persistence)
    }

    pub fn boat_level_config(&self, boat_id: &BoatId) -> Option<BoatLevelConfig> {
        self.boat_configs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(boat_id)
            .cloned()
    }

    /// All per-boat configs, ordered by boat id
    pub fn boat_level_configs(&self) -> Vec<BoatLevelConfig> {
        let mut configs: Vec<_> = self
            .boat_configs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        configs.sort_by(|a, b| a.boat_id.cmp(&b.boat_id));
        configs
    }

    /// Thresholds applying to a boat of the given type
    ///
    /// `Other` never alerts nor blocks. An untyped boat alerts from the
    /// first ineligible rower.
    pub fn effective_boat_type_config(&self, boat_type: Option<BoatType>) -> BoatTypeLevelConfig {
        match boat_type {
            None => BoatTypeLevelConfig::DEFAULT,
            Some(BoatType::Other) => BoatTypeLevelConfig::NON_RESTRICTIVE,
            Some(boat_type) => self
                .boat_type_configs
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&boat_type)
                .copied()
                .unwrap_or(BoatTypeLevelConfig::DEFAULT),
        }
    }

    /// Set or replace a boat's minimum level. A config restricting nothing is deleted.
    pub fn upsert_boat_level_config(&self, config: BoatLevelConfig) -> Result<(), LevelConfigError> {
        if config.is_unrestricted() {
            return self.delete_boat_level_config(&config.boat_id);
        }

        self.persistence.upsert_boat_level_config(&config)?;

        info!(
            boat_id = %config.boat_id,
            minimal_rower_category = ?config.minimal_rower_category,
            minimal_rower_type = ?config.minimal_rower_type,
            "Boat level config updated"
        );

        self.boat_configs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(config.boat_id.clone(), config);
        Ok(())
    }

    pub fn delete_boat_level_config(&self, boat_id: &BoatId) -> Result<(), LevelConfigError> {
        self.persistence.delete_boat_level_config(boat_id)?;

        let removed = self
            .boat_configs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(boat_id);
        if removed.is_some() {
            info!(boat_id = %boat_id, "Boat level config removed");
        }
        Ok(())
    }

    pub fn set_boat_type_level_config(
        &self,
        boat_type: BoatType,
        config: BoatTypeLevelConfig,
    ) -> Result<(), LevelConfigError> {
        if boat_type == BoatType::Other {
            return Err(LevelConfigError::NotConfigurable(boat_type));
        }
        if config.alert_from == Some(0) {
            return Err(LevelConfigError::ZeroThreshold { field: "alert_from" });
        }
        if config.block_from == Some(0) {
            return Err(LevelConfigError::ZeroThreshold { field: "block_from" });
        }

        self.persistence
            .save_boat_type_level_config(boat_type, &config)?;

        info!(
            boat_type = %boat_type,
            alert_from = ?config.alert_from,
            block_from = ?config.block_from,
            "Boat type level config updated"
        );

        self.boat_type_configs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(boat_type, config);
        Ok(())
    }

    /// Drop every override: per-boat configs are removed, boat-type thresholds
    /// return to their configured defaults
    pub fn reset(&self) -> Result<(), LevelConfigError> {
        self.persistence.clear_level_configs()?;

        self.boat_configs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        *self
            .boat_type_configs
            .write()
            .unwrap_or_else(PoisonError::into_inner) = self.defaults.clone();

        info!("Level policy reset to defaults");
        Ok(())
    }
}

/// A rower may use a boat when they reach the minimum on both axes
pub fn can_rower_use_boat(config: &BoatLevelConfig, rower: &Rower) -> bool {
    age_category_rank(rower.category) >= age_category_rank(config.minimal_rower_category)
        && seriousness_rank(rower.seriousness) >= seriousness_rank(config.minimal_rower_type)
}

/// Map a count of ineligible rowers to an action. Block is checked first.
pub fn decide_action(ineligible: u32, config: &BoatTypeLevelConfig) -> LevelAction {
    if config.block_from.is_some_and(|block| ineligible >= block) {
        return LevelAction::Block;
    }
    if config.alert_from.is_some_and(|alert| ineligible >= alert) {
        return LevelAction::Alert;
    }
    LevelAction::Nothing
}

/// Empty seats left when `present` rowers take the boat; 0 without a seat count
pub fn missing_rower_count(boat_type: Option<BoatType>, present: usize) -> u32 {
    let present = u32::try_from(present).unwrap_or(u32::MAX);
    seat_count(boat_type).map_or(0, |seats| seats.saturating_sub(present))
}

/// Eligible rowers a full crew needs to stay under `block_from`
///
/// 0 when the boat never blocks or has no seat count.
pub fn minimum_valid_rowers_needed(block_from: Option<u32>, seat_count: Option<u32>) -> u32 {
    match (block_from, seat_count) {
        (Some(block_from), Some(seats)) => seats.saturating_sub(block_from.saturating_sub(1)),
        _ => 0,
    }
}

/// Count crew members failing the boat's minimum, empty seats included
pub(crate) fn count_ineligible(
    config: &BoatLevelConfig,
    boat_type: Option<BoatType>,
    rowers: &[Rower],
) -> u32 {
    let failing = rowers
        .iter()
        .filter(|r| !can_rower_use_boat(config, r))
        .count();
    let missing = missing_rower_count(boat_type, rowers.len());

    debug!(
        boat_id = %config.boat_id,
        failing,
        missing,
        "Counted ineligible rowers"
    );

    u32::try_from(failing)
        .unwrap_or(u32::MAX)
        .saturating_add(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oarlog_api::{AgeCategory, SeriousnessCategory};
    use oarlog_store::{MemoryStore, SqliteStore};

    fn boat_config(
        category: Option<AgeCategory>,
        seriousness: Option<SeriousnessCategory>,
    ) -> BoatLevelConfig {
        BoatLevelConfig {
            boat_id: BoatId::new("boat-1"),
            minimal_rower_category: category,
            minimal_rower_type: seriousness,
        }
    }

    fn thresholds(alert_from: Option<u32>, block_from: Option<u32>) -> BoatTypeLevelConfig {
        BoatTypeLevelConfig {
            alert_from,
            block_from,
        }
    }

    fn empty_store() -> LevelPolicyStore {
        LevelPolicyStore::load(Vec::new(), Arc::new(MemoryStore::new())).unwrap()
    }

    #[test]
    fn test_can_rower_use_boat() {
        let config = boat_config(Some(AgeCategory::J14), Some(SeriousnessCategory::Recreational));

        let senior = Rower::new("r1", "Senior")
            .with_category(AgeCategory::Senior)
            .with_seriousness(SeriousnessCategory::Competitor);
        let j10 = Rower::new("r2", "Junior")
            .with_category(AgeCategory::J10)
            .with_seriousness(SeriousnessCategory::Competitor);
        let unset = Rower::new("r3", "Unknown").with_category(AgeCategory::J16);

        assert!(can_rower_use_boat(&config, &senior));
        assert!(!can_rower_use_boat(&config, &j10));
        // Unset seriousness ranks below recreational
        assert!(!can_rower_use_boat(&config, &unset));
        assert!(can_rower_use_boat(&boat_config(None, None), &Rower::new("r4", "Anyone")));
    }

    #[test]
    fn test_decide_action_banding() {
        let config = thresholds(Some(1), Some(3));
        assert_eq!(decide_action(0, &config), LevelAction::Nothing);
        assert_eq!(decide_action(1, &config), LevelAction::Alert);
        assert_eq!(decide_action(2, &config), LevelAction::Alert);
        assert_eq!(decide_action(3, &config), LevelAction::Block);
        assert_eq!(decide_action(7, &config), LevelAction::Block);

        assert_eq!(
            decide_action(5, &BoatTypeLevelConfig::NON_RESTRICTIVE),
            LevelAction::Nothing
        );
        // Block wins even when it is configured below alert
        assert_eq!(
            decide_action(2, &thresholds(Some(4), Some(2))),
            LevelAction::Block
        );
        assert_eq!(decide_action(1, &thresholds(None, Some(2))), LevelAction::Nothing);
        // Without a block threshold nothing ever blocks
        assert_eq!(decide_action(50, &thresholds(Some(1), None)), LevelAction::Alert);
    }

    #[test]
    fn test_missing_rower_count() {
        assert_eq!(missing_rower_count(Some(BoatType::FourRowersCoxless), 3), 1);
        assert_eq!(missing_rower_count(Some(BoatType::FourRowersCoxless), 6), 0);
        assert_eq!(missing_rower_count(Some(BoatType::Other), 0), 0);
        assert_eq!(missing_rower_count(None, 0), 0);
    }

    #[test]
    fn test_minimum_valid_rowers_needed() {
        assert_eq!(minimum_valid_rowers_needed(Some(3), Some(4)), 2);
        assert_eq!(minimum_valid_rowers_needed(Some(1), Some(9)), 9);
        assert_eq!(minimum_valid_rowers_needed(None, Some(4)), 0);
        assert_eq!(minimum_valid_rowers_needed(Some(2), None), 0);
        assert_eq!(minimum_valid_rowers_needed(Some(10), Some(4)), 0);
    }

    #[test]
    fn test_effective_boat_type_config() {
        let store = LevelPolicyStore::load(
            vec![(BoatType::FourRowersCoxed, thresholds(Some(2), Some(3)))],
            Arc::new(MemoryStore::new()),
        )
        .unwrap();

        assert_eq!(
            store.effective_boat_type_config(Some(BoatType::FourRowersCoxed)),
            thresholds(Some(2), Some(3))
        );
        assert_eq!(
            store.effective_boat_type_config(Some(BoatType::OneRowerCoxless)),
            BoatTypeLevelConfig::DEFAULT
        );
        assert_eq!(
            store.effective_boat_type_config(Some(BoatType::Other)),
            BoatTypeLevelConfig::NON_RESTRICTIVE
        );
        assert_eq!(
            store.effective_boat_type_config(None),
            BoatTypeLevelConfig::DEFAULT
        );
    }

    #[test]
    fn test_unrestricted_upsert_deletes() {
        let store = empty_store();

        store
            .upsert_boat_level_config(boat_config(Some(AgeCategory::J14), None))
            .unwrap();
        assert!(store.boat_level_config(&BoatId::new("boat-1")).is_some());

        store.upsert_boat_level_config(boat_config(None, None)).unwrap();
        assert!(store.boat_level_config(&BoatId::new("boat-1")).is_none());
    }

    #[test]
    fn test_other_is_not_configurable() {
        let store = empty_store();
        let result = store.set_boat_type_level_config(BoatType::Other, thresholds(Some(1), None));
        assert!(matches!(
            result,
            Err(LevelConfigError::NotConfigurable(BoatType::Other))
        ));

        let result =
            store.set_boat_type_level_config(BoatType::OneRowerCoxless, thresholds(Some(0), None));
        assert!(matches!(result, Err(LevelConfigError::ZeroThreshold { .. })));
    }

    #[test]
    fn test_overrides_survive_reload_and_reset() {
        let persistence = Arc::new(SqliteStore::in_memory().unwrap());
        let defaults = vec![(BoatType::TwoRowersCoxless, thresholds(None, Some(2)))];

        let store = LevelPolicyStore::load(defaults.clone(), persistence.clone()).unwrap();
        store
            .upsert_boat_level_config(boat_config(None, Some(SeriousnessCategory::Competitor)))
            .unwrap();
        store
            .set_boat_type_level_config(BoatType::TwoRowersCoxless, thresholds(Some(1), Some(1)))
            .unwrap();

        let reloaded = LevelPolicyStore::load(defaults.clone(), persistence.clone()).unwrap();
        assert_eq!(
            reloaded.effective_boat_type_config(Some(BoatType::TwoRowersCoxless)),
            thresholds(Some(1), Some(1))
        );
        assert_eq!(reloaded.boat_level_configs().len(), 1);

        reloaded.reset().unwrap();
        assert_eq!(
            reloaded.effective_boat_type_config(Some(BoatType::TwoRowersCoxless)),
            thresholds(None, Some(2))
        );
        assert!(reloaded.boat_level_configs().is_empty());

        let after_reset = LevelPolicyStore::load(defaults, persistence).unwrap();
        assert!(after_reset.boat_level_config(&BoatId::new("boat-1")).is_none());
    }

    #[test]
    fn test_count_ineligible_includes_missing_seats() {
        let config = boat_config(Some(AgeCategory::J14), None);
        let rowers = vec![
            Rower::new("r1", "A").with_category(AgeCategory::J10),
            Rower::new("r2", "B").with_category(AgeCategory::Senior),
        ];

        assert_eq!(
            count_ineligible(&config, Some(BoatType::FourRowersCoxless), &rowers),
            3
        );
        assert_eq!(count_ineligible(&config, Some(BoatType::Other), &rowers), 1);
    }
}

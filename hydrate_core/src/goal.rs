//! Daily goal ownership and intake recommendations.

use crate::persistence::{keys, KeyValueStore};
use crate::{ActivityLevel, Persisted, Result, StorageError, ValidationError};
use std::sync::Arc;

/// Goal used until one is set or loaded (ml)
pub const DEFAULT_DAILY_GOAL: i64 = 2000;

/// Largest accepted daily goal (ml)
pub const MAX_DAILY_GOAL: i64 = 10_000;

pub fn validate_daily_goal(goal: i64) -> std::result::Result<(), ValidationError> {
    if goal <= 0 || goal > MAX_DAILY_GOAL {
        return Err(ValidationError::DailyGoal(goal));
    }
    Ok(())
}

/// Round half-up to whole millilitres
fn to_ml(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Legacy flat-rate formula: 35 ml per kg
pub fn recommended_from_weight(weight: f64) -> i64 {
    to_ml(weight * 35.0)
}

/// Current formula: `(height + weight) * 10`
pub fn recommended_from_height_weight(height: u32, weight: f64) -> i64 {
    to_ml((f64::from(height) + weight) * 10.0)
}

/// Activity-scaled formula: weight times the level's ml/kg multiplier
pub fn recommended_from_activity(weight: f64, level: ActivityLevel) -> i64 {
    to_ml(weight * f64::from(level.ml_per_kg()))
}

/// Owner of the single current daily goal
pub struct GoalPolicy {
    store: Arc<dyn KeyValueStore>,
    daily_goal: i64,
    custom: bool,
}

impl GoalPolicy {
    /// A policy holding the default goal; nothing is read until [`GoalPolicy::load`]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            daily_goal: DEFAULT_DAILY_GOAL,
            custom: false,
        }
    }

    pub fn get_daily_goal(&self) -> i64 {
        self.daily_goal
    }

    /// Whether the user explicitly chose the current goal
    pub fn has_custom_goal(&self) -> bool {
        self.custom
    }

    /// Replace the goal with a user-chosen value and persist it
    pub fn set_daily_goal(&mut self, goal: i64) -> Result<Persisted> {
        validate_daily_goal(goal)?;
        self.daily_goal = goal;
        self.custom = true;
        tracing::info!("Daily goal set to {} ml", goal);
        Ok(self.persist())
    }

    /// Adopt a computed recommendation without marking the goal as custom
    pub fn apply_recommended(&mut self, goal: i64) -> Result<Persisted> {
        validate_daily_goal(goal)?;
        self.daily_goal = goal;
        self.custom = false;
        tracing::info!("Daily goal follows recommendation: {} ml", goal);
        Ok(self.persist())
    }

    /// Read the persisted goal and custom flag
    ///
    /// Missing keys leave the defaults in place. A corrupt or out-of-range
    /// stored value is logged and ignored.
    pub fn load(&mut self) {
        match self.read_goal() {
            Ok(Some(goal)) => self.daily_goal = goal,
            Ok(None) => tracing::debug!("No stored daily goal, using {} ml", self.daily_goal),
            Err(e) => tracing::warn!("{}. Using {} ml", e, self.daily_goal),
        }

        match self.store.get(keys::DAILY_GOAL_CUSTOM) {
            Ok(Some(raw)) => self.custom = raw.trim() == "true",
            Ok(None) => {}
            Err(e) => tracing::warn!("Unable to read custom goal flag: {}", e),
        }
    }

    fn read_goal(&self) -> std::result::Result<Option<i64>, StorageError> {
        let Some(raw) = self.store.get(keys::DAILY_GOAL)? else {
            return Ok(None);
        };

        let corrupt = |reason: String| StorageError::Corrupt {
            key: keys::DAILY_GOAL.to_string(),
            reason,
        };
        let goal: i64 = raw
            .trim()
            .parse()
            .map_err(|e: std::num::ParseIntError| corrupt(e.to_string()))?;
        validate_daily_goal(goal).map_err(|e| corrupt(e.to_string()))?;
        Ok(Some(goal))
    }

    fn persist(&self) -> Persisted {
        let result = self
            .store
            .set(keys::DAILY_GOAL, &self.daily_goal.to_string())
            .and_then(|_| {
                self.store
                    .set(keys::DAILY_GOAL_CUSTOM, if self.custom { "true" } else { "false" })
            });
        Persisted::from_write(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::test_support::ReadOnlyStore;
    use crate::persistence::MemoryStore;
    use crate::Error;

    fn policy() -> (Arc<MemoryStore>, GoalPolicy) {
        let store = Arc::new(MemoryStore::new());
        let policy = GoalPolicy::new(store.clone());
        (store, policy)
    }

    #[test]
    fn test_default_goal() {
        let (_, policy) = policy();
        assert_eq!(policy.get_daily_goal(), 2000);
        assert!(!policy.has_custom_goal());
    }

    #[test]
    fn test_rejects_out_of_range_goals() {
        let (_, mut policy) = policy();

        for goal in [0, -1, 10_001] {
            assert!(matches!(
                policy.set_daily_goal(goal),
                Err(Error::Validation(ValidationError::DailyGoal(_)))
            ));
        }
        assert_eq!(policy.get_daily_goal(), 2000);
    }

    #[test]
    fn test_goal_survives_reload() {
        let (store, mut policy) = policy();

        assert!(policy.set_daily_goal(2500).unwrap().is_durable());
        assert_eq!(store.get(keys::DAILY_GOAL).unwrap(), Some("2500".into()));

        let mut reloaded = GoalPolicy::new(store);
        reloaded.load();
        assert_eq!(reloaded.get_daily_goal(), 2500);
        assert!(reloaded.has_custom_goal());
    }

    #[test]
    fn test_boundary_goal_accepted() {
        let (_, mut policy) = policy();
        assert!(policy.set_daily_goal(10_000).is_ok());
        assert!(policy.set_daily_goal(1).is_ok());
    }

    #[test]
    fn test_custom_goal_equal_to_default_is_still_custom() {
        let (store, mut policy) = policy();
        let _ = policy.set_daily_goal(2000).unwrap();

        let mut reloaded = GoalPolicy::new(store);
        reloaded.load();
        assert!(reloaded.has_custom_goal());
    }

    #[test]
    fn test_apply_recommended_not_custom() {
        let (store, mut policy) = policy();
        let _ = policy.apply_recommended(2400).unwrap();

        let mut reloaded = GoalPolicy::new(store);
        reloaded.load();
        assert_eq!(reloaded.get_daily_goal(), 2400);
        assert!(!reloaded.has_custom_goal());
    }

    #[test]
    fn test_corrupt_goal_falls_back_to_default() {
        let (store, _) = policy();
        store.set(keys::DAILY_GOAL, "two litres").unwrap();

        let mut reloaded = GoalPolicy::new(store.clone());
        reloaded.load();
        assert_eq!(reloaded.get_daily_goal(), DEFAULT_DAILY_GOAL);

        store.set(keys::DAILY_GOAL, "0").unwrap();
        reloaded.load();
        assert_eq!(reloaded.get_daily_goal(), DEFAULT_DAILY_GOAL);
    }

    #[test]
    fn test_storage_failure_keeps_goal_in_memory() {
        let store = Arc::new(ReadOnlyStore::default());
        let mut policy = GoalPolicy::new(store);

        let outcome = policy.set_daily_goal(3000).unwrap();
        assert!(!outcome.is_durable());
        assert!(outcome.storage_error().is_some());
        assert_eq!(policy.get_daily_goal(), 3000);
    }

    #[test]
    fn test_recommendation_formulas() {
        assert_eq!(recommended_from_weight(70.0), 2450);
        assert_eq!(recommended_from_height_weight(170, 70.0), 2400);
        assert_eq!(recommended_from_activity(70.0, ActivityLevel::Sedentary), 2100);
        assert_eq!(recommended_from_activity(70.0, ActivityLevel::Moderate), 2800);
        assert_eq!(recommended_from_activity(70.0, ActivityLevel::VeryActive), 3500);
    }

    #[test]
    fn test_fractional_weight_rounds() {
        assert_eq!(recommended_from_weight(62.5), 2188); // 2187.5
        assert_eq!(recommended_from_height_weight(165, 58.25), 2233); // 2232.5
    }
}

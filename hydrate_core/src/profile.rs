//! User profile ownership, validation and default-merge loading.

use crate::persistence::{keys, read_json, write_json, KeyValueStore};
use crate::{Persisted, Result, UserProfile, ValidationError};
use std::sync::Arc;

pub const MIN_HEIGHT_CM: u32 = 100;
pub const MAX_HEIGHT_CM: u32 = 250;

/// Upper weight bound (kg). The lower bound is exclusive zero.
pub const MAX_WEIGHT_KG: f64 = 250.0;

pub const MIN_REMINDER_INTERVAL: u32 = 15;
pub const MAX_REMINDER_INTERVAL: u32 = 480;

pub fn validate_height(height: u32) -> std::result::Result<(), ValidationError> {
    if !(MIN_HEIGHT_CM..=MAX_HEIGHT_CM).contains(&height) {
        return Err(ValidationError::Height(height));
    }
    Ok(())
}

pub fn validate_weight(weight: f64) -> std::result::Result<(), ValidationError> {
    // NaN fails both comparisons and is rejected here
    if !(weight > 0.0 && weight <= MAX_WEIGHT_KG) {
        return Err(ValidationError::Weight(weight));
    }
    Ok(())
}

pub fn validate_reminder_interval(minutes: u32) -> std::result::Result<(), ValidationError> {
    if !(MIN_REMINDER_INTERVAL..=MAX_REMINDER_INTERVAL).contains(&minutes) {
        return Err(ValidationError::ReminderInterval(minutes));
    }
    Ok(())
}

pub fn validate_working_hours(start: u8, end: u8) -> std::result::Result<(), ValidationError> {
    if start > 23 || end > 23 || start >= end {
        return Err(ValidationError::WorkingHours { start, end });
    }
    Ok(())
}

/// Check every field of a profile, reporting the first violation
pub fn validate_profile(profile: &UserProfile) -> std::result::Result<(), ValidationError> {
    validate_height(profile.height)?;
    validate_weight(profile.weight)?;
    validate_reminder_interval(profile.reminder_interval)?;
    validate_working_hours(profile.working_hours.start, profile.working_hours.end)?;
    Ok(())
}

/// Owner of the user profile
pub struct ProfilePolicy {
    store: Arc<dyn KeyValueStore>,
    profile: UserProfile,
}

impl ProfilePolicy {
    /// A policy holding the default profile; nothing is read until [`ProfilePolicy::load`]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            profile: UserProfile::default(),
        }
    }

    /// Copy of the current profile
    pub fn get(&self) -> UserProfile {
        self.profile.clone()
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    /// Validate and replace the whole profile, then persist it
    pub fn save(&mut self, profile: UserProfile) -> Result<Persisted> {
        validate_profile(&profile)?;
        self.profile = profile;
        tracing::info!("Saved profile");
        Ok(self.persist())
    }

    /// Read the persisted profile, back-filling missing fields from defaults
    ///
    /// An absent key keeps the defaults. A payload that cannot be decoded is
    /// logged and the defaults are kept as well.
    pub fn load(&mut self) -> &UserProfile {
        match read_json::<UserProfile>(self.store.as_ref(), keys::USER_SETTINGS) {
            Ok(Some(profile)) => {
                if let Err(e) = validate_profile(&profile) {
                    tracing::warn!("Stored profile is out of range ({}), keeping it as loaded", e);
                }
                tracing::debug!("Loaded profile");
                self.profile = profile;
            }
            Ok(None) => tracing::info!("No stored profile found, using defaults"),
            Err(e) => tracing::warn!("{}. Using default profile.", e),
        }
        &self.profile
    }

    /// Overwrite in-memory and persisted profile with the defaults
    pub fn reset_to_defaults(&mut self) -> Persisted {
        self.profile = UserProfile::default();
        tracing::info!("Profile reset to defaults");
        self.persist()
    }

    /// `(height + weight) * 10` for the current profile
    pub fn recommended_goal(&self) -> i64 {
        crate::goal::recommended_from_height_weight(self.profile.height, self.profile.weight)
    }

    /// Activity-scaled recommendation for the current profile
    pub fn recommended_goal_for_activity(&self) -> i64 {
        crate::goal::recommended_from_activity(self.profile.weight, self.profile.activity_level)
    }

    fn persist(&self) -> Persisted {
        Persisted::from_write(write_json(
            self.store.as_ref(),
            keys::USER_SETTINGS,
            &self.profile,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::test_support::ReadOnlyStore;
    use crate::persistence::MemoryStore;
    use crate::{ActivityLevel, Error, WorkingHours};

    fn policy() -> (Arc<MemoryStore>, ProfilePolicy) {
        let store = Arc::new(MemoryStore::new());
        let policy = ProfilePolicy::new(store.clone());
        (store, policy)
    }

    #[test]
    fn test_height_bounds() {
        assert!(validate_height(100).is_ok());
        assert!(validate_height(250).is_ok());
        assert_eq!(validate_height(99), Err(ValidationError::Height(99)));
        assert_eq!(validate_height(251), Err(ValidationError::Height(251)));
    }

    #[test]
    fn test_weight_bounds() {
        assert!(validate_weight(0.1).is_ok());
        assert!(validate_weight(250.0).is_ok());
        assert!(validate_weight(0.0).is_err());
        assert!(validate_weight(-5.0).is_err());
        assert!(validate_weight(250.1).is_err());
        assert!(validate_weight(300.0).is_err());
        assert!(validate_weight(f64::NAN).is_err());
    }

    #[test]
    fn test_working_hours_bounds() {
        assert!(validate_working_hours(0, 23).is_ok());
        assert!(validate_working_hours(9, 9).is_err());
        assert!(validate_working_hours(18, 9).is_err());
        assert!(validate_working_hours(9, 24).is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let (store, mut policy) = policy();
        let profile = UserProfile {
            height: 182,
            weight: 77.5,
            activity_level: ActivityLevel::Active,
            reminder_enabled: false,
            reminder_interval: 90,
            working_hours: WorkingHours { start: 8, end: 17 },
        };

        assert!(policy.save(profile.clone()).unwrap().is_durable());

        let mut reloaded = ProfilePolicy::new(store);
        assert_eq!(reloaded.load(), &profile);
    }

    #[test]
    fn test_save_rejects_invalid_profile() {
        let (store, mut policy) = policy();
        let profile = UserProfile {
            weight: 260.0,
            ..UserProfile::default()
        };

        assert!(matches!(
            policy.save(profile),
            Err(Error::Validation(ValidationError::Weight(_)))
        ));
        assert_eq!(policy.get(), UserProfile::default());
        assert_eq!(store.get(keys::USER_SETTINGS).unwrap(), None);
    }

    #[test]
    fn test_load_backfills_missing_fields() {
        let (store, mut policy) = policy();
        store
            .set(keys::USER_SETTINGS, r#"{"weight":60,"reminderEnabled":false}"#)
            .unwrap();

        let loaded = policy.load().clone();
        assert_eq!(loaded.weight, 60.0);
        assert!(!loaded.reminder_enabled);
        assert_eq!(loaded.height, 170);
        assert_eq!(loaded.reminder_interval, 60);
        assert_eq!(loaded.working_hours, WorkingHours { start: 9, end: 18 });
    }

    #[test]
    fn test_load_corrupt_uses_defaults() {
        let (store, mut policy) = policy();
        store.set(keys::USER_SETTINGS, "{ invalid json }").unwrap();

        assert_eq!(policy.load(), &UserProfile::default());
    }

    #[test]
    fn test_reset_to_defaults_overwrites_store() {
        let (store, mut policy) = policy();
        let _ = policy
            .save(UserProfile {
                height: 200,
                ..UserProfile::default()
            })
            .unwrap();

        assert!(policy.reset_to_defaults().is_durable());
        assert_eq!(policy.get(), UserProfile::default());

        let mut reloaded = ProfilePolicy::new(store);
        assert_eq!(reloaded.load(), &UserProfile::default());
    }

    #[test]
    fn test_save_with_failing_store_is_session_only() {
        let mut policy = ProfilePolicy::new(Arc::new(ReadOnlyStore::default()));
        let profile = UserProfile {
            height: 160,
            ..UserProfile::default()
        };

        let outcome = policy.save(profile).unwrap();
        assert!(!outcome.is_durable());
        assert_eq!(policy.profile().height, 160);
    }

    #[test]
    fn test_recommended_goal_for_defaults() {
        let (_, policy) = policy();
        assert_eq!(policy.recommended_goal(), 2400);
        assert_eq!(policy.recommended_goal_for_activity(), 2800);
    }
}

//! Composition root tying the components to one persistence gateway.
//!
//! [`Tracker`] is what a front end talks to. It owns the record store and the
//! two policies, runs the startup load pass, and writes records back after
//! every mutation. Statistics are handed out as borrowed views.

use crate::config::StatisticsConfig;
use crate::goal::GoalPolicy;
use crate::persistence::{keys, KeyValueStore};
use crate::profile::ProfilePolicy;
use crate::records::RecordStore;
use crate::statistics::Statistics;
use crate::{Persisted, Result, UserProfile, WaterStats};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Key under which an unreadable records payload is preserved
pub const CORRUPT_RECORDS_BACKUP: &str = "water-records-corrupt";

pub struct Tracker {
    store: Arc<dyn KeyValueStore>,
    records: RecordStore,
    goal: GoalPolicy,
    profile: ProfilePolicy,
    stats_config: StatisticsConfig,
}

impl Tracker {
    /// Load records, profile and goal from `store`
    ///
    /// Unless the user has chosen a goal explicitly, the goal follows the
    /// profile's recommendation.
    pub fn open(store: Arc<dyn KeyValueStore>, stats_config: StatisticsConfig) -> Self {
        let records = match RecordStore::load_from(store.as_ref()) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("{}. Starting with no records.", e);
                preserve_unreadable_records(store.as_ref());
                RecordStore::new()
            }
        };

        let mut profile = ProfilePolicy::new(store.clone());
        profile.load();

        let mut goal = GoalPolicy::new(store.clone());
        goal.load();

        let mut tracker = Self {
            store,
            records,
            goal,
            profile,
            stats_config,
        };
        tracker.follow_recommendation();
        tracker
    }

    fn follow_recommendation(&mut self) {
        if self.goal.has_custom_goal() {
            return;
        }
        let recommended = self.profile.recommended_goal();
        if recommended == self.goal.get_daily_goal() {
            return;
        }
        match self.goal.apply_recommended(recommended) {
            Ok(_) => {}
            Err(e) => tracing::warn!("Recommended goal not applied: {}", e),
        }
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    pub fn goal(&self) -> &GoalPolicy {
        &self.goal
    }

    pub fn profile(&self) -> &UserProfile {
        self.profile.profile()
    }

    pub fn profile_policy(&self) -> &ProfilePolicy {
        &self.profile
    }

    // ------------------------------------------------------------------
    // Records
    // ------------------------------------------------------------------

    /// Validate and log an intake event, then persist all records
    pub fn add_intake(
        &mut self,
        amount: i64,
        timestamp: DateTime<Utc>,
        note: Option<String>,
    ) -> Result<(String, Persisted)> {
        let id = self.records.add(amount, timestamp, note)?;
        Ok((id, self.save_records()))
    }

    /// `None` if no record has this id
    pub fn update_intake(&mut self, id: &str, new_amount: i64) -> Option<Persisted> {
        if !self.records.update(id, new_amount) {
            return None;
        }
        Some(self.save_records())
    }

    /// `None` if no record has this id
    pub fn delete_intake(&mut self, id: &str) -> Option<Persisted> {
        if !self.records.delete(id) {
            return None;
        }
        Some(self.save_records())
    }

    pub fn clear_records(&mut self) -> Persisted {
        self.records.clear();
        self.save_records()
    }

    pub fn save_records(&self) -> Persisted {
        Persisted::from_write(self.records.save_to(self.store.as_ref()))
    }

    // ------------------------------------------------------------------
    // Goal and profile
    // ------------------------------------------------------------------

    pub fn set_daily_goal(&mut self, goal: i64) -> Result<Persisted> {
        self.goal.set_daily_goal(goal)
    }

    /// Adopt the profile's recommendation as the user's chosen goal
    pub fn apply_recommended_goal(&mut self) -> Result<(i64, Persisted)> {
        let recommended = self.profile.recommended_goal();
        let outcome = self.goal.set_daily_goal(recommended)?;
        Ok((recommended, outcome))
    }

    /// Save a new profile; a non-custom goal is re-derived from it
    pub fn save_profile(&mut self, profile: UserProfile) -> Result<Persisted> {
        let outcome = self.profile.save(profile)?;
        self.follow_recommendation();
        Ok(outcome)
    }

    pub fn reset_profile(&mut self) -> Persisted {
        let outcome = self.profile.reset_to_defaults();
        self.follow_recommendation();
        outcome
    }

    // ------------------------------------------------------------------
    // Derived views
    // ------------------------------------------------------------------

    pub fn statistics(&self) -> Statistics<'_> {
        Statistics::new(&self.records, &self.goal).with_config(&self.stats_config)
    }

    pub fn snapshot(&self) -> WaterStats {
        self.statistics()
            .snapshot(self.stats_config.average_window_days)
    }

    pub fn export_json(&self, exported_at: DateTime<Utc>) -> Result<String> {
        crate::export::export_json(
            &self.records.get_all(),
            self.profile.profile(),
            self.goal.get_daily_goal(),
            exported_at,
        )
    }
}

fn preserve_unreadable_records(store: &dyn KeyValueStore) {
    let raw = match store.get(keys::WATER_RECORDS) {
        Ok(Some(raw)) => raw,
        _ => return,
    };
    match store.set(CORRUPT_RECORDS_BACKUP, &raw) {
        Ok(()) => tracing::warn!(
            "Unreadable records preserved under '{}'",
            CORRUPT_RECORDS_BACKUP
        ),
        Err(e) => tracing::warn!("Unable to preserve unreadable records: {}", e),
    }
}

//! Core domain types for the hydration tracker.
//!
//! This module defines the fundamental types used throughout the system:
//! - Intake records and their wire format
//! - The user profile and its defaults
//! - Derived statistics views
//! - Persistence outcomes

use crate::StorageError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Intake Records
// ============================================================================

/// One logged water-consumption event
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WaterIntakeRecord {
    pub id: String,
    /// Millilitres
    pub amount: i64,
    #[serde(with = "timestamp_format")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Timestamps are written as RFC 3339. Older payloads stored epoch
/// milliseconds, so both forms are accepted on read.
mod timestamp_format {
    use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Millis(i64),
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        match Raw::deserialize(d)? {
            Raw::Text(s) => DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(de::Error::custom),
            Raw::Millis(ms) => Utc
                .timestamp_millis_opt(ms)
                .single()
                .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {}", ms))),
        }
    }
}

// ============================================================================
// User Profile
// ============================================================================

/// Self-reported activity level, used for intake recommendations
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    #[default]
    Moderate,
    Active,
    VeryActive,
}

impl ActivityLevel {
    /// Recommended millilitres per kilogram of body weight
    pub fn ml_per_kg(self) -> u32 {
        match self {
            ActivityLevel::Sedentary => 30,
            ActivityLevel::Light => 35,
            ActivityLevel::Moderate => 40,
            ActivityLevel::Active => 45,
            ActivityLevel::VeryActive => 50,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::Light => "light",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::Active => "active",
            ActivityLevel::VeryActive => "very_active",
        }
    }
}

impl std::str::FromStr for ActivityLevel {
    type Err = crate::ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "sedentary" => Ok(ActivityLevel::Sedentary),
            "light" => Ok(ActivityLevel::Light),
            "moderate" => Ok(ActivityLevel::Moderate),
            "active" => Ok(ActivityLevel::Active),
            "very_active" => Ok(ActivityLevel::VeryActive),
            _ => Err(crate::ValidationError::Unparseable {
                field: "activity level",
                input: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hours of the day (0-23) during which reminders may fire
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkingHours {
    #[serde(default = "default_work_start")]
    pub start: u8,
    #[serde(default = "default_work_end")]
    pub end: u8,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start: default_work_start(),
            end: default_work_end(),
        }
    }
}

/// Body metrics and reminder preferences
///
/// Every field carries a serde default so that payloads written by older
/// versions (missing newer fields) still load.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Centimetres
    #[serde(default = "default_height")]
    pub height: u32,
    /// Kilograms
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub activity_level: ActivityLevel,
    #[serde(default = "default_reminder_enabled")]
    pub reminder_enabled: bool,
    /// Minutes between reminders
    #[serde(default = "default_reminder_interval")]
    pub reminder_interval: u32,
    #[serde(default)]
    pub working_hours: WorkingHours,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            height: default_height(),
            weight: default_weight(),
            activity_level: ActivityLevel::default(),
            reminder_enabled: default_reminder_enabled(),
            reminder_interval: default_reminder_interval(),
            working_hours: WorkingHours::default(),
        }
    }
}

// Default value functions
fn default_height() -> u32 {
    170
}

fn default_weight() -> f64 {
    70.0
}

fn default_reminder_enabled() -> bool {
    true
}

fn default_reminder_interval() -> u32 {
    60
}

fn default_work_start() -> u8 {
    9
}

fn default_work_end() -> u8 {
    18
}

// ============================================================================
// Derived Statistics
// ============================================================================

/// Totals for a single calendar day
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub date: NaiveDate,
    pub total: i64,
    pub goal: i64,
    /// Rounded percentage of the goal, may exceed 100
    pub progress: i64,
}

/// Dashboard snapshot computed in one pass
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WaterStats {
    pub today_total: i64,
    pub today_progress: i64,
    pub weekly_average: i64,
    pub consecutive_days: u32,
    pub weekly_trend: Vec<DailyStats>,
}

// ============================================================================
// Persistence Outcome
// ============================================================================

/// Outcome of a mutation that also writes to the durable store
///
/// The in-memory change is applied in both cases; `SessionOnly` means it will
/// not survive a restart.
#[derive(Debug)]
#[must_use]
pub enum Persisted {
    Durable,
    SessionOnly(StorageError),
}

impl Persisted {
    pub fn is_durable(&self) -> bool {
        matches!(self, Persisted::Durable)
    }

    pub fn storage_error(&self) -> Option<&StorageError> {
        match self {
            Persisted::Durable => None,
            Persisted::SessionOnly(err) => Some(err),
        }
    }

    pub(crate) fn from_write(result: std::result::Result<(), StorageError>) -> Self {
        match result {
            Ok(()) => Persisted::Durable,
            Err(err) => {
                tracing::warn!("Change kept for this session only: {}", err);
                Persisted::SessionOnly(err)
            }
        }
    }
}

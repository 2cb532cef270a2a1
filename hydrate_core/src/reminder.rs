//! Reminder scheduling within working hours.
//!
//! Only the arithmetic lives here; firing notifications is up to the front end.

use crate::{UserProfile, WorkingHours};
use chrono::{DateTime, Duration, Local, NaiveTime, Timelike, Utc};

/// Whether a local wall-clock time falls in `[start:00, end:00)`
pub fn is_within_working_hours(time: NaiveTime, hours: WorkingHours) -> bool {
    let hour = time.hour();
    hour >= u32::from(hours.start) && hour < u32::from(hours.end)
}

/// Next instant after `last` at which a reminder should fire
///
/// Reminders repeat every `reminder_interval` minutes. A slot that lands
/// outside working hours is pushed to the next working-hours start.
/// Returns `None` when reminders are disabled or the profile has no usable
/// interval or window.
pub fn next_reminder_after(last: DateTime<Utc>, profile: &UserProfile) -> Option<DateTime<Utc>> {
    if !profile.reminder_enabled || profile.reminder_interval == 0 {
        return None;
    }
    let hours = profile.working_hours;
    if hours.start >= hours.end || hours.end > 23 {
        return None;
    }

    let candidate = (last + Duration::minutes(i64::from(profile.reminder_interval)))
        .with_timezone(&Local);
    if is_within_working_hours(candidate.time(), hours) {
        return Some(candidate.with_timezone(&Utc));
    }

    // Before today's window opens, wait for it; otherwise wait for tomorrow's
    let start = NaiveTime::from_hms_opt(u32::from(hours.start), 0, 0)?;
    let day = if candidate.time() < start {
        candidate.date_naive()
    } else {
        candidate.date_naive().succ_opt()?
    };

    let next = day
        .and_time(start)
        .and_local_timezone(Local)
        .earliest()?
        .with_timezone(&Utc);
    tracing::debug!("Reminder deferred to next working window at {}", next);
    Some(next)
}

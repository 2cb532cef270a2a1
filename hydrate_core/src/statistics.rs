//! Derived intake statistics.
//!
//! [`Statistics`] borrows a record store and a goal value and recomputes every
//! aggregate on each call; nothing is cached between calls.
//!
//! All aggregates are relative to an evaluation date, which defaults to the
//! local calendar day at construction time and can be pinned with
//! [`Statistics::as_of`].

use crate::config::{StatisticsConfig, StreakMode};
use crate::goal::GoalPolicy;
use crate::records::{local_today, RecordStore};
use crate::{DailyStats, WaterStats};
use chrono::{Days, NaiveDate};
use std::collections::HashMap;

/// Number of days in the weekly trend
pub const TREND_DAYS: usize = 7;

/// `round(total / goal * 100)`, or 0 when there is no goal to measure against
pub fn progress_percentage(total: i64, goal: i64) -> i64 {
    if goal == 0 {
        return 0;
    }
    round_half_up(total as f64 / goal as f64 * 100.0)
}

fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Read-only view computing aggregates over a record store
#[derive(Clone, Debug)]
pub struct Statistics<'a> {
    records: &'a RecordStore,
    goal: i64,
    today: NaiveDate,
    streak_mode: StreakMode,
    lookback_days: u32,
}

impl<'a> Statistics<'a> {
    pub fn new(records: &'a RecordStore, goal: &GoalPolicy) -> Self {
        Self::with_goal(records, goal.get_daily_goal())
    }

    /// Build from a raw goal value
    pub fn with_goal(records: &'a RecordStore, goal: i64) -> Self {
        let defaults = StatisticsConfig::default();
        Self {
            records,
            goal,
            today: local_today(),
            streak_mode: defaults.streak_mode,
            lookback_days: defaults.lookback_days,
        }
    }

    /// Evaluate as if `today` were the current local date
    pub fn as_of(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn with_config(mut self, config: &StatisticsConfig) -> Self {
        self.streak_mode = config.streak_mode;
        self.lookback_days = config.lookback_days;
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn goal(&self) -> i64 {
        self.goal
    }

    pub fn today_total(&self) -> i64 {
        self.records.daily_total(self.today)
    }

    pub fn today_progress_percentage(&self) -> i64 {
        progress_percentage(self.today_total(), self.goal)
    }

    /// Totals for `today-6 ..= today`, oldest first
    pub fn weekly_trend(&self) -> [i64; TREND_DAYS] {
        let mut trend = [0; TREND_DAYS];
        for (slot, date) in trend.iter_mut().zip(self.trend_dates()) {
            *slot = self.records.daily_total(date);
        }
        trend
    }

    fn trend_dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..TREND_DAYS as u64)
            .rev()
            .filter_map(move |back| self.today.checked_sub_days(Days::new(back)))
    }

    /// Contiguous days, walking back from today, whose total met the goal
    pub fn consecutive_goal_days(&self) -> u32 {
        let totals = self.records.daily_totals();
        let total_on = |date: NaiveDate| totals.get(&date).copied().unwrap_or(0);

        let skip_today =
            self.streak_mode == StreakMode::GraceToday && total_on(self.today) < self.goal;
        let first = u64::from(skip_today);

        let mut streak = 0;
        for back in first..u64::from(self.lookback_days) {
            let Some(date) = self.today.checked_sub_days(Days::new(back)) else {
                break;
            };
            if total_on(date) >= self.goal {
                streak += 1;
            } else {
                break;
            }
        }
        streak
    }

    /// Mean daily total over the most recent `days` days including today
    ///
    /// Days without records count as zero. Returns 0 for `days <= 0`.
    pub fn average_daily_intake(&self, days: i64) -> i64 {
        if days <= 0 {
            return 0;
        }

        let first = self
            .today
            .checked_sub_days(Days::new((days - 1) as u64))
            .unwrap_or(NaiveDate::MIN);
        let sum: i64 = self
            .records
            .daily_totals()
            .into_iter()
            .filter(|(date, _)| *date >= first && *date <= self.today)
            .fold(0i64, |sum, (_, total)| sum.saturating_add(total));

        round_half_up(sum as f64 / days as f64)
    }

    pub fn daily_stats(&self, date: NaiveDate) -> DailyStats {
        let total = self.records.daily_total(date);
        DailyStats {
            date,
            total,
            goal: self.goal,
            progress: progress_percentage(total, self.goal),
        }
    }

    /// Per-day stats for the weekly trend window, oldest first
    pub fn weekly_stats(&self) -> Vec<DailyStats> {
        let totals: HashMap<NaiveDate, i64> = self.records.daily_totals();
        self.trend_dates()
            .map(|date| {
                let total = totals.get(&date).copied().unwrap_or(0);
                DailyStats {
                    date,
                    total,
                    goal: self.goal,
                    progress: progress_percentage(total, self.goal),
                }
            })
            .collect()
    }

    /// Full dashboard snapshot; the average covers `average_window_days`
    pub fn snapshot(&self, average_window_days: i64) -> WaterStats {
        let today_total = self.today_total();
        WaterStats {
            today_total,
            today_progress: progress_percentage(today_total, self.goal),
            weekly_average: self.average_daily_intake(average_window_days),
            consecutive_days: self.consecutive_goal_days(),
            weekly_trend: self.weekly_stats(),
        }
    }
}

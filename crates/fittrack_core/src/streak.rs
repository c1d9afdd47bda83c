//! Streak statistics over a collection of daily records.
//!
//! Every function re-sorts internally, so callers may pass records in any
//! order. Dates are compared at day granularity.

use std::cmp::Reverse;
use std::collections::HashSet;

use chrono::{Days, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::models::DailyRecord;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct StreakSnapshot {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub active_days: u32,
    pub perfect_days: u32,
    pub total_days_considered: u32,
}

/// Consecutive perfect days ending at `as_of`.
///
/// The walk starts at `as_of` and steps back one day at a time. The first
/// day without a perfect record ends the count, so an unfinished `as_of`
/// yields 0. Records dated after `as_of` are ignored.
pub fn current_streak(records: &[DailyRecord], as_of: NaiveDate) -> u32 {
    let perfect: HashSet<NaiveDate> = records
        .iter()
        .filter(|r| r.is_streak_day && r.date <= as_of)
        .map(|r| r.date)
        .collect();

    let mut streak = 0u32;
    let mut expected = as_of;
    while perfect.contains(&expected) {
        streak += 1;
        match expected.checked_sub_days(Days::new(1)) {
            Some(prev) => expected = prev,
            None => break,
        }
    }
    streak
}

/// Longest run of perfect days on consecutive calendar dates.
pub fn longest_streak(records: &[DailyRecord]) -> u32 {
    let mut sorted: Vec<&DailyRecord> = records.iter().collect();
    // One entry per date; a perfect duplicate wins.
    sorted.sort_by_key(|r| (r.date, Reverse(r.is_streak_day)));
    sorted.dedup_by_key(|r| r.date);

    let mut max_run = 0u32;
    let mut current_run = 0u32;
    let mut previous: Option<NaiveDate> = None;

    for record in sorted {
        if !record.is_streak_day {
            current_run = 0;
            previous = None;
            continue;
        }

        current_run = match previous {
            Some(prev) if prev.succ_opt() == Some(record.date) => current_run + 1,
            _ => 1,
        };
        max_run = max_run.max(current_run);
        previous = Some(record.date);
    }

    max_run
}

/// Days with at least one goal met.
pub fn active_days(records: &[DailyRecord]) -> u32 {
    records.iter().filter(|r| r.goals_completed > 0).count() as u32
}

/// Days with every goal met.
pub fn perfect_days(records: &[DailyRecord]) -> u32 {
    records.iter().filter(|r| r.is_streak_day).count() as u32
}

pub fn compute_streak_stats(records: &[DailyRecord], as_of: NaiveDate) -> StreakSnapshot {
    StreakSnapshot {
        current_streak: current_streak(records, as_of),
        longest_streak: longest_streak(records),
        active_days: active_days(records),
        perfect_days: perfect_days(records),
        total_days_considered: records.len() as u32,
    }
}

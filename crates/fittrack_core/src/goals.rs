//! Daily goal evaluation.
//!
//! A day is scored against the targets embedded in its own record:
//!
//! - water: `consumed >= goal`
//! - calories: within ±10% of the goal, both bounds inclusive
//! - exercise minutes: `consumed >= goal`
//! - weight logged (only with [`GoalSet::WithWeight`]): any weight recorded
//!
//! A target that is zero, negative or NaN can never be met.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::models::DailyRecord;

/// Fraction of the calorie goal tolerated on either side.
pub const CALORIE_TOLERANCE: f64 = 0.1;

/// Which goals count towards a perfect day.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum GoalSet {
    /// Water, calories and exercise.
    #[default]
    Core,
    /// Core goals plus a weigh-in.
    WithWeight,
}

impl GoalSet {
    pub fn total(self) -> u8 {
        match self {
            GoalSet::Core => 3,
            GoalSet::WithWeight => 4,
        }
    }
}

impl std::fmt::Display for GoalSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            GoalSet::Core => "core",
            GoalSet::WithWeight => "with-weight",
        })
    }
}

impl std::str::FromStr for GoalSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "core" | "3" => Ok(GoalSet::Core),
            "with-weight" | "with_weight" | "weight" | "4" => Ok(GoalSet::WithWeight),
            other => Err(format!("unknown goal set: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct GoalCompletion {
    pub goals_completed: u8,
    pub total_goals: u8,
    pub is_streak_day: bool,
}

fn reachable(goal: f64) -> bool {
    goal > 0.0
}

pub fn water_goal_met(consumed: f64, goal: f64) -> bool {
    reachable(goal) && consumed >= goal
}

pub fn calorie_goal_met(consumed: f64, goal: f64) -> bool {
    if !reachable(goal) {
        return false;
    }
    let low = goal * (1.0 - CALORIE_TOLERANCE);
    let high = goal * (1.0 + CALORIE_TOLERANCE);
    consumed >= low && consumed <= high
}

pub fn exercise_goal_met(consumed: f64, goal: f64) -> bool {
    reachable(goal) && consumed >= goal
}

/// Score one day. Pure and total.
pub fn evaluate_daily_goals(record: &DailyRecord, goal_set: GoalSet) -> GoalCompletion {
    let mut completed = [
        water_goal_met(record.water_liters, record.water_goal),
        calorie_goal_met(record.calories, record.calorie_goal),
        exercise_goal_met(record.exercise_minutes, record.exercise_goal),
    ]
    .into_iter()
    .filter(|met| *met)
    .count() as u8;

    if goal_set == GoalSet::WithWeight && record.weight.is_some() {
        completed += 1;
    }

    let total = goal_set.total();
    GoalCompletion {
        goals_completed: completed,
        total_goals: total,
        is_streak_day: completed == total,
    }
}

impl DailyRecord {
    /// Evaluate and write the result into the record's goal fields.
    pub fn stamp(&mut self, goal_set: GoalSet) -> GoalCompletion {
        let completion = evaluate_daily_goals(self, goal_set);
        self.goals_completed = completion.goals_completed;
        self.total_goals = completion.total_goals;
        self.is_streak_day = completion.is_streak_day;
        metrics::counter!("fittrack_days_evaluated_total").increment(1);
        completion
    }

    /// Share of goals met, rounded to a whole percent.
    pub fn completion_percentage(&self) -> u32 {
        if self.total_goals == 0 {
            return 0;
        }
        (f64::from(self.goals_completed) / f64::from(self.total_goals) * 100.0).round() as u32
    }

    pub fn completion_tier(&self) -> CompletionTier {
        CompletionTier::from_percentage(self.completion_percentage())
    }
}

/// Bucket used by calendar views to shade a day.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CompletionTier {
    Perfect,
    High,
    Medium,
    Low,
    Minimal,
    None,
}

impl CompletionTier {
    pub fn from_percentage(pct: u32) -> Self {
        match pct {
            100.. => CompletionTier::Perfect,
            75..=99 => CompletionTier::High,
            50..=74 => CompletionTier::Medium,
            25..=49 => CompletionTier::Low,
            1..=24 => CompletionTier::Minimal,
            0 => CompletionTier::None,
        }
    }
}

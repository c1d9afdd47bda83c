//! Period aggregation of daily records.

use chrono::{Datelike, Days, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::models::DailyRecord;

/// Named reporting window. Every window ends today.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Day,
    Week,
    Month,
    Year,
}

impl Period {
    /// First day of the window containing `today`. Weeks start on Monday.
    pub fn start_date(self, today: NaiveDate) -> NaiveDate {
        match self {
            Period::Day => today,
            Period::Week => {
                let back = u64::from(today.weekday().num_days_from_monday());
                today.checked_sub_days(Days::new(back)).unwrap_or(today)
            }
            Period::Month => today.with_day(1).unwrap_or(today),
            Period::Year => NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Period::Day => "Today",
            Period::Week => "This Week",
            Period::Month => "This Month",
            Period::Year => "This Year",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
            Period::Year => "year",
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "today" => Ok(Period::Day),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "year" => Ok(Period::Year),
            other => Err(format!("unknown period: {other}")),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct MetricSummary {
    /// Sum over the window.
    pub consumed: f64,
    /// Mean of the per-day goals, i.e. a daily target.
    pub goal: f64,
    pub percentage: u32,
}

impl MetricSummary {
    fn from_pairs(pairs: impl Iterator<Item = (f64, f64)>) -> Self {
        let mut consumed = 0.0;
        let mut goal_sum = 0.0;
        let mut days = 0usize;
        for (c, g) in pairs {
            consumed += sanitize(c);
            goal_sum += sanitize(g);
            days += 1;
        }
        if days == 0 {
            return Self::default();
        }
        let goal = goal_sum / days as f64;
        Self {
            consumed,
            goal,
            percentage: attainment(consumed, goal, days),
        }
    }
}

fn sanitize(v: f64) -> f64 {
    if v.is_finite() { v.max(0.0) } else { 0.0 }
}

/// `round(consumed / (goal * days) * 100)`, or 0 when the denominator is 0.
pub fn attainment(consumed: f64, daily_goal: f64, days: usize) -> u32 {
    let denominator = daily_goal * days as f64;
    if denominator <= 0.0 || !denominator.is_finite() {
        return 0;
    }
    (consumed / denominator * 100.0).round() as u32
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct PeriodSummary {
    pub period: Period,
    pub label: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub water: MetricSummary,
    pub calories: MetricSummary,
    pub exercise: MetricSummary,
    pub carbs: f64,
    pub fats: f64,
    pub protein: f64,
    /// Records inside the window. Zero when nothing was logged.
    pub total_days: u32,
    pub streak_days: u32,
}

/// Records whose date falls in `[start, today]`, ascending.
pub fn records_in_window<'a>(
    records: &'a [DailyRecord],
    period: Period,
    today: NaiveDate,
) -> Vec<&'a DailyRecord> {
    let start = period.start_date(today);
    let mut window: Vec<&DailyRecord> = records
        .iter()
        .filter(|r| r.date >= start && r.date <= today)
        .collect();
    window.sort_by_key(|r| r.date);
    window
}

pub fn compute_period_summary(
    records: &[DailyRecord],
    period: Period,
    today: NaiveDate,
) -> PeriodSummary {
    let window = records_in_window(records, period, today);

    let water = MetricSummary::from_pairs(window.iter().map(|r| (r.water_liters, r.water_goal)));
    let calories = MetricSummary::from_pairs(window.iter().map(|r| (r.calories, r.calorie_goal)));
    let exercise =
        MetricSummary::from_pairs(window.iter().map(|r| (r.exercise_minutes, r.exercise_goal)));

    PeriodSummary {
        period,
        label: period.label().to_string(),
        start_date: period.start_date(today),
        end_date: today,
        water,
        calories,
        exercise,
        carbs: window.iter().map(|r| sanitize(r.carbs)).sum(),
        fats: window.iter().map(|r| sanitize(r.fats)).sum(),
        protein: window.iter().map(|r| sanitize(r.protein)).sum(),
        total_days: window.len() as u32,
        streak_days: window.iter().filter(|r| r.is_streak_day).count() as u32,
    }
}

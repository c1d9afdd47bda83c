//! CSV and JSON renderings of a period summary.

use std::fmt::Write as _;

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::models::{DailyRecord, ExerciseEntry, Meal};
use crate::summary::PeriodSummary;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("unknown export format: {other}")),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct DayRow {
    pub date: NaiveDate,
    pub water_liters: f64,
    pub calories: f64,
    pub carbs: f64,
    pub fats: f64,
    pub protein: f64,
    pub exercise_minutes: f64,
    pub goals_completed: u8,
    pub total_goals: u8,
    pub is_streak_day: bool,
}

impl From<&DailyRecord> for DayRow {
    fn from(r: &DailyRecord) -> Self {
        Self {
            date: r.date,
            water_liters: r.water_liters,
            calories: r.calories,
            carbs: r.carbs,
            fats: r.fats,
            protein: r.protein,
            exercise_minutes: r.exercise_minutes,
            goals_completed: r.goals_completed,
            total_goals: r.total_goals,
            is_streak_day: r.is_streak_day,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct MealRow {
    pub date: NaiveDate,
    pub timestamp: DateTime<Utc>,
    pub meal_type: String,
    pub description: String,
    pub calories: f64,
    pub carbs: f64,
    pub fats: f64,
    pub protein: f64,
}

impl From<&Meal> for MealRow {
    fn from(m: &Meal) -> Self {
        Self {
            date: m.date,
            timestamp: m.timestamp,
            meal_type: m.meal_type.as_str().to_string(),
            description: m.description.clone(),
            calories: m.calories,
            carbs: m.carbs,
            fats: m.fats,
            protein: m.protein,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ExerciseRow {
    pub date: NaiveDate,
    pub name: String,
    pub category: String,
    pub muscle_group: Option<String>,
    pub duration_minutes: f64,
    pub distance_km: f64,
    pub calories_burned: f64,
}

impl From<&ExerciseEntry> for ExerciseRow {
    fn from(e: &ExerciseEntry) -> Self {
        Self {
            date: e.date,
            name: e.name.clone(),
            category: e.category.as_str().to_string(),
            muscle_group: e.muscle_group.map(|g| g.as_str().to_string()),
            duration_minutes: e.duration_minutes.unwrap_or(0.0),
            distance_km: e.distance_km.unwrap_or(0.0),
            calories_burned: e.calories_burned.unwrap_or(0.0),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct SummaryExport {
    pub summary: PeriodSummary,
    pub days: Vec<DayRow>,
    #[serde(default)]
    pub meals: Vec<MealRow>,
    #[serde(default)]
    pub exercises: Vec<ExerciseRow>,
}

impl SummaryExport {
    pub fn new<'a>(summary: PeriodSummary, days: impl IntoIterator<Item = &'a DailyRecord>) -> Self {
        let mut days: Vec<DayRow> = days.into_iter().map(DayRow::from).collect();
        days.sort_by_key(|d| d.date);
        Self {
            summary,
            days,
            meals: Vec::new(),
            exercises: Vec::new(),
        }
    }

    /// Attach the individual meals and exercises logged in the period.
    pub fn with_entries(mut self, meals: &[Meal], exercises: &[ExerciseEntry]) -> Self {
        self.meals = meals.iter().map(MealRow::from).collect();
        self.meals.sort_by_key(|m| (m.date, m.timestamp));
        self.exercises = exercises.iter().map(ExerciseRow::from).collect();
        self.exercises.sort_by_key(|e| e.date);
        self
    }
}

/// Quote a free-text CSV field, doubling embedded quotes.
fn quoted(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

fn daily_average(total: f64, days: u32) -> f64 {
    total / f64::from(days.max(1))
}

/// Summary block followed by a per-day breakdown.
pub fn render_csv(export: &SummaryExport) -> String {
    let s = &export.summary;
    let mut csv = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(csv, "Fitness Summary Report - {}", s.label);
    let _ = writeln!(csv, "From,{},To,{}", s.start_date, s.end_date);
    csv.push('\n');

    csv.push_str("SUMMARY\n");
    let _ = writeln!(csv, "Period,{}", s.label);
    let _ = writeln!(csv, "Days Tracked,{}", s.total_days);
    let _ = writeln!(csv, "Streak Days,{}", s.streak_days);
    csv.push('\n');

    csv.push_str("HYDRATION\n");
    let _ = writeln!(csv, "Total Water (L),{:.2}", s.water.consumed);
    let _ = writeln!(
        csv,
        "Daily Average (L),{:.2}",
        daily_average(s.water.consumed, s.total_days)
    );
    let _ = writeln!(csv, "Goal Completion %,{}", s.water.percentage);
    csv.push('\n');

    csv.push_str("NUTRITION\n");
    let _ = writeln!(csv, "Total Calories,{}", s.calories.consumed.round());
    let _ = writeln!(
        csv,
        "Daily Average Calories,{}",
        daily_average(s.calories.consumed, s.total_days).round()
    );
    let _ = writeln!(csv, "Goal Completion %,{}", s.calories.percentage);
    let _ = writeln!(csv, "Total Carbs (g),{}", s.carbs.round());
    let _ = writeln!(csv, "Total Fats (g),{}", s.fats.round());
    let _ = writeln!(csv, "Total Protein (g),{}", s.protein.round());
    csv.push('\n');

    csv.push_str("EXERCISE\n");
    let _ = writeln!(csv, "Total Minutes,{}", s.exercise.consumed.round());
    let _ = writeln!(
        csv,
        "Daily Average (min),{}",
        daily_average(s.exercise.consumed, s.total_days).round()
    );
    let _ = writeln!(csv, "Goal Completion %,{}", s.exercise.percentage);
    csv.push('\n');

    csv.push_str("DAILY BREAKDOWN\n");
    csv.push_str("Date,Water (L),Calories,Carbs (g),Fats (g),Protein (g),Exercise (min),Goals,Streak Day\n");
    for d in &export.days {
        let _ = writeln!(
            csv,
            "{},{:.2},{},{},{},{},{},{}/{},{}",
            d.date,
            d.water_liters,
            d.calories.round(),
            d.carbs.round(),
            d.fats.round(),
            d.protein.round(),
            d.exercise_minutes.round(),
            d.goals_completed,
            d.total_goals,
            if d.is_streak_day { "Yes" } else { "No" }
        );
    }

    if !export.meals.is_empty() {
        csv.push_str("\nMEALS LOG\n");
        csv.push_str("Date,Time,Meal Type,Description,Calories,Carbs (g),Fats (g),Protein (g)\n");
        for m in &export.meals {
            let _ = writeln!(
                csv,
                "{},{},{},{},{},{},{},{}",
                m.date,
                m.timestamp.format("%H:%M"),
                m.meal_type,
                quoted(&m.description),
                m.calories.round(),
                m.carbs.round(),
                m.fats.round(),
                m.protein.round()
            );
        }
    }

    if !export.exercises.is_empty() {
        csv.push_str("\nEXERCISE LOG\n");
        csv.push_str(
            "Date,Exercise Name,Category,Muscle Group,Duration (min),Distance (km),Calories Burned\n",
        );
        for e in &export.exercises {
            let _ = writeln!(
                csv,
                "{},{},{},{},{},{},{}",
                e.date,
                quoted(&e.name),
                e.category,
                e.muscle_group.as_deref().unwrap_or(""),
                e.duration_minutes,
                e.distance_km,
                e.calories_burned
            );
        }
    }

    csv
}

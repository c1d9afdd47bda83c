//! Period digest handed to the coaching model, plus the analysis it returns.
//!
//! The digest is computed locally from records, meals and exercises. When the
//! model reply cannot be used, [`fallback_analysis`] derives a plain one from
//! the same digest.

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::goals::{calorie_goal_met, exercise_goal_met, water_goal_met};
use crate::models::{DailyRecord, ExerciseCategory, ExerciseEntry, Meal, MealType};
use crate::summary::{Period, records_in_window};

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct MetricDigest {
    pub total: f64,
    pub goal_total: f64,
    pub daily_average: f64,
    /// Days on which the goal check for this metric passed.
    pub days_met_goal: u32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct MacroDigest {
    pub total_carbs: f64,
    pub total_fats: f64,
    pub total_protein: f64,
    pub avg_carbs: f64,
    pub avg_fats: f64,
    pub avg_protein: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct MealBreakdown {
    pub breakfast: u32,
    pub lunch: u32,
    pub dinner: u32,
    pub snack: u32,
    pub other: u32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct ExerciseBreakdown {
    pub cardio: u32,
    pub weight_training: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct PeriodDigest {
    pub period: Period,
    pub label: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: u32,
    pub streak_days: u32,
    pub water: MetricDigest,
    pub calories: MetricDigest,
    pub exercise: MetricDigest,
    pub macros: MacroDigest,
    pub meals: MealBreakdown,
    pub exercises: ExerciseBreakdown,
}

fn metric(
    window: &[&DailyRecord],
    pick: impl Fn(&DailyRecord) -> (f64, f64),
    met: fn(f64, f64) -> bool,
) -> MetricDigest {
    let mut digest = MetricDigest::default();
    for record in window.iter().copied() {
        let (consumed, goal) = pick(record);
        digest.total += consumed.max(0.0);
        digest.goal_total += goal.max(0.0);
        if met(consumed, goal) {
            digest.days_met_goal += 1;
        }
    }
    if !window.is_empty() {
        digest.daily_average = digest.total / window.len() as f64;
    }
    digest
}

/// Aggregate everything logged in `period` up to `today`.
pub fn build_period_digest(
    records: &[DailyRecord],
    meals: &[Meal],
    exercises: &[ExerciseEntry],
    period: Period,
    today: NaiveDate,
) -> PeriodDigest {
    let start = period.start_date(today);
    let window = records_in_window(records, period, today);
    let days = window.len();
    let per_day = |total: f64| if days == 0 { 0.0 } else { total / days as f64 };

    let total_carbs: f64 = window.iter().map(|r| r.carbs.max(0.0)).sum();
    let total_fats: f64 = window.iter().map(|r| r.fats.max(0.0)).sum();
    let total_protein: f64 = window.iter().map(|r| r.protein.max(0.0)).sum();

    let mut meal_counts = MealBreakdown::default();
    for meal in meals.iter().filter(|m| m.date >= start && m.date <= today) {
        let slot = match meal.meal_type {
            MealType::Breakfast => &mut meal_counts.breakfast,
            MealType::Lunch => &mut meal_counts.lunch,
            MealType::Dinner => &mut meal_counts.dinner,
            MealType::Snack => &mut meal_counts.snack,
            MealType::Other => &mut meal_counts.other,
        };
        *slot += 1;
    }

    let mut sessions = ExerciseBreakdown::default();
    for entry in exercises.iter().filter(|e| e.date >= start && e.date <= today) {
        match entry.category {
            ExerciseCategory::Cardio => sessions.cardio += 1,
            ExerciseCategory::WeightTraining => sessions.weight_training += 1,
        }
    }

    PeriodDigest {
        period,
        label: period.label().to_ascii_lowercase(),
        start_date: start,
        end_date: today,
        total_days: days as u32,
        streak_days: window.iter().filter(|r| r.is_streak_day).count() as u32,
        water: metric(&window, |r| (r.water_liters, r.water_goal), water_goal_met),
        calories: metric(&window, |r| (r.calories, r.calorie_goal), calorie_goal_met),
        exercise: metric(
            &window,
            |r| (r.exercise_minutes, r.exercise_goal),
            exercise_goal_met,
        ),
        macros: MacroDigest {
            total_carbs,
            total_fats,
            total_protein,
            avg_carbs: per_day(total_carbs),
            avg_fats: per_day(total_fats),
            avg_protein: per_day(total_protein),
        },
        meals: meal_counts,
        exercises: sessions,
    }
}

/// Coaching feedback for a period.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CoachAnalysis {
    /// 0 to 100.
    pub overall_score: u32,
    pub highlights: Vec<String>,
    pub areas_to_improve: Vec<String>,
    pub hydration_insight: String,
    pub nutrition_insight: String,
    pub exercise_insight: String,
    pub weekly_tip: String,
    pub motivational_message: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    Model,
    Fallback,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct PeriodAnalysis {
    pub summary: PeriodDigest,
    pub analysis: CoachAnalysis,
    pub source: AnalysisSource,
}

/// Analysis computed from the digest alone.
pub fn fallback_analysis(digest: &PeriodDigest) -> CoachAnalysis {
    let label = &digest.label;
    let score = if digest.total_days == 0 {
        0
    } else {
        (f64::from(digest.streak_days) / f64::from(digest.total_days) * 100.0).round() as u32
    };
    CoachAnalysis {
        overall_score: score,
        highlights: vec!["You are tracking your fitness data consistently!".into()],
        areas_to_improve: vec!["Keep logging your meals and exercises for better insights.".into()],
        hydration_insight: format!(
            "You've consumed {:.1}L of water {label}.",
            digest.water.total
        ),
        nutrition_insight: format!(
            "Your average daily calorie intake is {} kcal.",
            digest.calories.daily_average.round()
        ),
        exercise_insight: format!(
            "You've exercised for a total of {} minutes {label}.",
            digest.exercise.total.round()
        ),
        weekly_tip: "Stay consistent with your goals and track daily for best results.".into(),
        motivational_message: "Keep up the great work on your fitness journey!".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::GoalSet;
    use crate::models::{GoalTargets, NewExercise, NewMeal};
    use chrono::Utc;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn meal(d: u32, meal_type: MealType) -> Meal {
        NewMeal {
            date: date(d),
            description: "plate".into(),
            meal_type: Some(meal_type),
            calories: Some(600.0),
            carbs: None,
            fats: None,
            protein: None,
            fiber: None,
            sugar: None,
            sodium: None,
            notes: None,
            is_ai_analyzed: None,
        }
        .into_meal(Utc::now())
        .unwrap()
    }

    fn session(d: u32, category: ExerciseCategory) -> ExerciseEntry {
        NewExercise {
            date: date(d),
            name: "session".into(),
            category,
            muscle_group: None,
            sets: vec![],
            duration_minutes: Some(30.0),
            distance_km: None,
            calories_burned: None,
            notes: None,
        }
        .into_entry()
        .unwrap()
    }

    #[test]
    fn digest_counts_goal_days_and_breakdowns() {
        // 2026-03-02 is a Monday.
        let mut mon = DailyRecord::new(date(2), &GoalTargets::default());
        mon.water_liters = 4.0;
        mon.calories = 2100.0;
        mon.exercise_minutes = 60.0;
        mon.protein = 150.0;
        mon.stamp(GoalSet::Core);
        let mut tue = DailyRecord::new(date(3), &GoalTargets::default());
        tue.water_liters = 2.0;
        tue.calories = 2600.0;
        tue.protein = 90.0;
        tue.stamp(GoalSet::Core);
        let last_week = DailyRecord::new(date(1), &GoalTargets::default());

        let meals = vec![
            meal(2, MealType::Breakfast),
            meal(2, MealType::Dinner),
            meal(3, MealType::Dinner),
            meal(1, MealType::Lunch),
        ];
        let sessions = vec![
            session(2, ExerciseCategory::Cardio),
            session(3, ExerciseCategory::WeightTraining),
            session(3, ExerciseCategory::Cardio),
        ];

        let digest =
            build_period_digest(&[tue, mon, last_week], &meals, &sessions, Period::Week, date(3));
        assert_eq!(digest.total_days, 2);
        assert_eq!(digest.streak_days, 1);
        assert_eq!(digest.water.total, 6.0);
        assert_eq!(digest.water.days_met_goal, 1);
        assert_eq!(digest.calories.days_met_goal, 1);
        assert_eq!(digest.exercise.daily_average, 30.0);
        assert_eq!(digest.macros.avg_protein, 120.0);
        assert_eq!(digest.meals.dinner, 2);
        assert_eq!(digest.meals.lunch, 0);
        assert_eq!(digest.exercises.cardio, 2);
        assert_eq!(digest.exercises.weight_training, 1);
        assert_eq!(digest.label, "this week");
    }

    #[test]
    fn fallback_scores_streak_share() {
        let mut perfect = DailyRecord::new(date(2), &GoalTargets::default());
        perfect.water_liters = 4.0;
        perfect.calories = 2000.0;
        perfect.exercise_minutes = 75.0;
        perfect.stamp(GoalSet::Core);
        let partial = DailyRecord::new(date(3), &GoalTargets::default());

        let digest = build_period_digest(&[perfect, partial], &[], &[], Period::Week, date(3));
        let analysis = fallback_analysis(&digest);
        assert_eq!(analysis.overall_score, 50);
        assert_eq!(analysis.hydration_insight, "You've consumed 4.0L of water this week.");
        assert_eq!(
            analysis.exercise_insight,
            "You've exercised for a total of 75 minutes this week."
        );
    }

    #[test]
    fn empty_period_scores_zero() {
        let digest = build_period_digest(&[], &[], &[], Period::Day, date(3));
        assert_eq!(digest.total_days, 0);
        assert_eq!(digest.water.daily_average, 0.0);
        assert_eq!(fallback_analysis(&digest).overall_score, 0);
    }
}

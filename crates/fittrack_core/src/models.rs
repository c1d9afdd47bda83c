//! Persisted entities: the per-day record plus meals, exercises and weigh-ins.

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::TrackerError;

/// Daily targets copied into each new [`DailyRecord`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct GoalTargets {
    pub water_liters: f64,
    pub calories: f64,
    pub carbs: f64,
    pub fats: f64,
    pub protein: f64,
    pub exercise_minutes: f64,
}

impl Default for GoalTargets {
    fn default() -> Self {
        Self {
            water_liters: 4.0,
            calories: 2000.0,
            carbs: 250.0,
            fats: 65.0,
            protein: 190.0,
            exercise_minutes: 60.0,
        }
    }
}

/// One calendar day of tracked metrics and the goal stamp derived from them.
///
/// Numeric fields missing from a stored document deserialize as `0`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct DailyRecord {
    pub date: NaiveDate,
    #[serde(default)]
    pub water_liters: f64,
    #[serde(default)]
    pub water_goal: f64,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub calorie_goal: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub carbs_goal: f64,
    #[serde(default)]
    pub fats: f64,
    #[serde(default)]
    pub fats_goal: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub protein_goal: f64,
    #[serde(default)]
    pub exercise_minutes: f64,
    #[serde(default)]
    pub exercise_goal: f64,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub body_fat_percentage: Option<f64>,
    #[serde(default)]
    pub goals_completed: u8,
    #[serde(default)]
    pub total_goals: u8,
    #[serde(default)]
    pub is_streak_day: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DailyRecord {
    /// Empty record for `date` carrying the given targets.
    pub fn new(date: NaiveDate, targets: &GoalTargets) -> Self {
        Self {
            date,
            water_liters: 0.0,
            water_goal: targets.water_liters,
            calories: 0.0,
            calorie_goal: targets.calories,
            carbs: 0.0,
            carbs_goal: targets.carbs,
            fats: 0.0,
            fats_goal: targets.fats,
            protein: 0.0,
            protein_goal: targets.protein,
            exercise_minutes: 0.0,
            exercise_goal: targets.exercise_minutes,
            weight: None,
            body_fat_percentage: None,
            goals_completed: 0,
            total_goals: 0,
            is_streak_day: false,
            updated_at: None,
        }
    }
}

/// Partial update for a day. Present fields overwrite; absent fields are kept.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct DailyUpdate {
    pub water_liters: Option<f64>,
    pub water_goal: Option<f64>,
    pub calories: Option<f64>,
    pub calorie_goal: Option<f64>,
    pub carbs: Option<f64>,
    pub carbs_goal: Option<f64>,
    pub fats: Option<f64>,
    pub fats_goal: Option<f64>,
    pub protein: Option<f64>,
    pub protein_goal: Option<f64>,
    pub exercise_minutes: Option<f64>,
    pub exercise_goal: Option<f64>,
    pub weight: Option<f64>,
    pub body_fat_percentage: Option<f64>,
}

impl DailyUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge into `record`. Negative or NaN amounts are clamped to zero.
    pub fn apply_to(&self, record: &mut DailyRecord) {
        fn set(slot: &mut f64, value: Option<f64>) {
            if let Some(v) = value {
                *slot = v.max(0.0);
            }
        }

        set(&mut record.water_liters, self.water_liters);
        set(&mut record.water_goal, self.water_goal);
        set(&mut record.calories, self.calories);
        set(&mut record.calorie_goal, self.calorie_goal);
        set(&mut record.carbs, self.carbs);
        set(&mut record.carbs_goal, self.carbs_goal);
        set(&mut record.fats, self.fats);
        set(&mut record.fats_goal, self.fats_goal);
        set(&mut record.protein, self.protein);
        set(&mut record.protein_goal, self.protein_goal);
        set(&mut record.exercise_minutes, self.exercise_minutes);
        set(&mut record.exercise_goal, self.exercise_goal);
        if let Some(w) = self.weight {
            record.weight = Some(w.max(0.0));
        }
        if let Some(bf) = self.body_fat_percentage {
            record.body_fat_percentage = Some(bf.clamp(0.0, 100.0));
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
    #[default]
    Other,
}

impl MealType {
    pub fn as_str(self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
            MealType::Other => "other",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Meal {
    pub id: Uuid,
    pub date: NaiveDate,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    #[serde(default)]
    pub meal_type: MealType,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fats: f64,
    #[serde(default)]
    pub protein: f64,
    pub fiber: Option<f64>,
    pub sugar: Option<f64>,
    pub sodium: Option<f64>,
    pub notes: Option<String>,
    #[serde(default)]
    pub is_ai_analyzed: bool,
}

/// Input for logging a meal.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct NewMeal {
    pub date: NaiveDate,
    pub description: String,
    pub meal_type: Option<MealType>,
    pub calories: Option<f64>,
    pub carbs: Option<f64>,
    pub fats: Option<f64>,
    pub protein: Option<f64>,
    pub fiber: Option<f64>,
    pub sugar: Option<f64>,
    pub sodium: Option<f64>,
    pub notes: Option<String>,
    pub is_ai_analyzed: Option<bool>,
}

impl NewMeal {
    pub fn into_meal(self, now: DateTime<Utc>) -> Result<Meal, TrackerError> {
        let description = self.description.trim().to_string();
        if description.is_empty() {
            return Err(TrackerError::InvalidInput(
                "meal description is required".into(),
            ));
        }
        let amount = |v: Option<f64>| v.unwrap_or(0.0).max(0.0);
        Ok(Meal {
            id: Uuid::new_v4(),
            date: self.date,
            timestamp: now,
            description,
            meal_type: self.meal_type.unwrap_or_default(),
            calories: amount(self.calories),
            carbs: amount(self.carbs),
            fats: amount(self.fats),
            protein: amount(self.protein),
            fiber: self.fiber.map(|v| v.max(0.0)),
            sugar: self.sugar.map(|v| v.max(0.0)),
            sodium: self.sodium.map(|v| v.max(0.0)),
            notes: self.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            is_ai_analyzed: self.is_ai_analyzed.unwrap_or(false),
        })
    }
}

/// Edit to a logged meal. Present fields overwrite; the date cannot change.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct MealUpdate {
    pub description: Option<String>,
    pub meal_type: Option<MealType>,
    pub calories: Option<f64>,
    pub carbs: Option<f64>,
    pub fats: Option<f64>,
    pub protein: Option<f64>,
    pub fiber: Option<f64>,
    pub sugar: Option<f64>,
    pub sodium: Option<f64>,
    pub notes: Option<String>,
}

impl MealUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The edited meal. Amounts are clamped to zero.
    pub fn applied_to(&self, meal: &Meal) -> Result<Meal, TrackerError> {
        let mut next = meal.clone();
        if let Some(description) = &self.description {
            let description = description.trim();
            if description.is_empty() {
                return Err(TrackerError::InvalidInput(
                    "meal description is required".into(),
                ));
            }
            next.description = description.to_string();
        }
        if let Some(meal_type) = self.meal_type {
            next.meal_type = meal_type;
        }
        let set = |slot: &mut f64, v: Option<f64>| {
            if let Some(v) = v {
                *slot = v.max(0.0);
            }
        };
        set(&mut next.calories, self.calories);
        set(&mut next.carbs, self.carbs);
        set(&mut next.fats, self.fats);
        set(&mut next.protein, self.protein);
        if self.fiber.is_some() {
            next.fiber = self.fiber.map(|v| v.max(0.0));
        }
        if self.sugar.is_some() {
            next.sugar = self.sugar.map(|v| v.max(0.0));
        }
        if self.sodium.is_some() {
            next.sodium = self.sodium.map(|v| v.max(0.0));
        }
        if let Some(notes) = &self.notes {
            next.notes = Some(notes.trim().to_string()).filter(|n| !n.is_empty());
        }
        Ok(next)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct MealTotals {
    pub total_calories: f64,
    pub total_carbs: f64,
    pub total_fats: f64,
    pub total_protein: f64,
    pub meal_count: usize,
}

impl MealTotals {
    pub fn from_meals(meals: &[Meal]) -> Self {
        meals.iter().fold(Self::default(), |mut acc, m| {
            acc.total_calories += m.calories;
            acc.total_carbs += m.carbs;
            acc.total_fats += m.fats;
            acc.total_protein += m.protein;
            acc.meal_count += 1;
            acc
        })
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ExerciseCategory {
    Cardio,
    WeightTraining,
}

impl ExerciseCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ExerciseCategory::Cardio => "cardio",
            ExerciseCategory::WeightTraining => "weight-training",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum MuscleGroup {
    Chest,
    Back,
    Shoulders,
    Legs,
    Arms,
    Core,
    FullBody,
}

impl MuscleGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            MuscleGroup::Chest => "chest",
            MuscleGroup::Back => "back",
            MuscleGroup::Shoulders => "shoulders",
            MuscleGroup::Legs => "legs",
            MuscleGroup::Arms => "arms",
            MuscleGroup::Core => "core",
            MuscleGroup::FullBody => "full-body",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ExerciseSet {
    pub set_number: u32,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub reps: u32,
    #[serde(default = "default_true")]
    pub completed: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ExerciseEntry {
    pub id: Uuid,
    pub date: NaiveDate,
    pub name: String,
    pub category: ExerciseCategory,
    pub muscle_group: Option<MuscleGroup>,
    #[serde(default)]
    pub sets: Vec<ExerciseSet>,
    pub duration_minutes: Option<f64>,
    pub distance_km: Option<f64>,
    pub calories_burned: Option<f64>,
    pub notes: Option<String>,
}

impl ExerciseEntry {
    /// Minutes this entry contributes to the day's exercise total.
    pub fn minutes(&self) -> f64 {
        self.duration_minutes.unwrap_or(0.0).max(0.0)
    }
}

/// Input for logging an exercise.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct NewExercise {
    pub date: NaiveDate,
    pub name: String,
    pub category: ExerciseCategory,
    pub muscle_group: Option<MuscleGroup>,
    #[serde(default)]
    pub sets: Vec<ExerciseSet>,
    pub duration_minutes: Option<f64>,
    pub distance_km: Option<f64>,
    pub calories_burned: Option<f64>,
    pub notes: Option<String>,
}

impl NewExercise {
    pub fn into_entry(self) -> Result<ExerciseEntry, TrackerError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(TrackerError::InvalidInput("exercise name is required".into()));
        }
        if self.sets.iter().any(|s| s.set_number == 0) {
            return Err(TrackerError::InvalidInput(
                "set numbers start at 1".into(),
            ));
        }
        Ok(ExerciseEntry {
            id: Uuid::new_v4(),
            date: self.date,
            name,
            category: self.category,
            muscle_group: self.muscle_group,
            sets: self.sets,
            duration_minutes: self.duration_minutes.map(|v| v.max(0.0)),
            distance_km: self.distance_km.map(|v| v.max(0.0)),
            calories_burned: self.calories_burned.map(|v| v.max(0.0)),
            notes: self.notes,
        })
    }
}

/// Edit to a logged exercise. Present fields overwrite; the date cannot change.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ExerciseUpdate {
    pub name: Option<String>,
    pub category: Option<ExerciseCategory>,
    pub muscle_group: Option<MuscleGroup>,
    pub sets: Option<Vec<ExerciseSet>>,
    pub duration_minutes: Option<f64>,
    pub distance_km: Option<f64>,
    pub calories_burned: Option<f64>,
    pub notes: Option<String>,
}

impl ExerciseUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn applied_to(&self, entry: &ExerciseEntry) -> Result<ExerciseEntry, TrackerError> {
        let mut next = entry.clone();
        if let Some(name) = &self.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(TrackerError::InvalidInput("exercise name is required".into()));
            }
            next.name = name.to_string();
        }
        if let Some(category) = self.category {
            next.category = category;
        }
        if self.muscle_group.is_some() {
            next.muscle_group = self.muscle_group;
        }
        if let Some(sets) = &self.sets {
            if sets.iter().any(|s| s.set_number == 0) {
                return Err(TrackerError::InvalidInput("set numbers start at 1".into()));
            }
            next.sets = sets.clone();
        }
        if self.duration_minutes.is_some() {
            next.duration_minutes = self.duration_minutes.map(|v| v.max(0.0));
        }
        if self.distance_km.is_some() {
            next.distance_km = self.distance_km.map(|v| v.max(0.0));
        }
        if self.calories_burned.is_some() {
            next.calories_burned = self.calories_burned.map(|v| v.max(0.0));
        }
        if self.notes.is_some() {
            next.notes = self.notes.clone();
        }
        Ok(next)
    }
}

/// A weigh-in. At most one per day.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct WeightEntry {
    pub date: NaiveDate,
    pub weight: f64,
    pub body_fat_percentage: Option<f64>,
    pub notes: Option<String>,
}

impl WeightEntry {
    pub fn validate(&self) -> Result<(), TrackerError> {
        if !(self.weight > 0.0) {
            return Err(TrackerError::InvalidInput("weight is required".into()));
        }
        if let Some(bf) = self.body_fat_percentage
            && !(0.0..=100.0).contains(&bf)
        {
            return Err(TrackerError::InvalidInput(format!(
                "body fat percentage out of range: {bf}"
            )));
        }
        Ok(())
    }
}

//! User profile and the daily targets derived from it.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::TrackerError;
use crate::models::GoalTargets;

/// Roughly the energy stored in a kilogram of body fat.
const KCAL_PER_KG: f64 = 7700.0;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    #[default]
    Moderate,
    Active,
    VeryActive,
}

impl ActivityLevel {
    pub fn multiplier(self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::Active => 1.725,
            ActivityLevel::VeryActive => 1.9,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum GoalType {
    Cut,
    Bulk,
    #[default]
    Maintain,
}

/// Total daily energy expenditure, rounded to whole kcal.
pub fn tdee(bmr: f64, level: ActivityLevel) -> f64 {
    (bmr * level.multiplier()).round()
}

/// TDEE shifted by the daily share of the weekly weight-change goal.
pub fn calorie_target(bmr: f64, level: ActivityLevel, weekly_change_kg: f64) -> f64 {
    let daily_adjustment = (weekly_change_kg * KCAL_PER_KG / 7.0).round();
    tdee(bmr, level) + daily_adjustment
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct UserProfile {
    pub current_weight: f64,
    pub target_weight: f64,
    pub body_fat_percentage: f64,
    pub skeletal_muscle: f64,
    pub visceral_fat_index: f64,
    pub bmr: f64,
    #[serde(default)]
    pub activity_level: ActivityLevel,
    #[serde(default)]
    pub goal_type: GoalType,
    /// Negative when cutting.
    #[serde(default)]
    pub weekly_weight_change_goal: f64,
    /// Derived from BMR when absent.
    pub daily_calorie_target: Option<f64>,
    pub daily_protein_target: f64,
    #[serde(default = "default_water_goal")]
    pub water_goal: f64,
    #[serde(default = "default_exercise_goal")]
    pub exercise_goal: f64,
}

fn default_water_goal() -> f64 {
    GoalTargets::default().water_liters
}

fn default_exercise_goal() -> f64 {
    GoalTargets::default().exercise_minutes
}

impl UserProfile {
    pub fn validate(&self) -> Result<(), TrackerError> {
        let non_negative = [
            ("current_weight", self.current_weight),
            ("target_weight", self.target_weight),
            ("skeletal_muscle", self.skeletal_muscle),
            ("visceral_fat_index", self.visceral_fat_index),
            ("bmr", self.bmr),
            ("daily_protein_target", self.daily_protein_target),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0) {
                return Err(TrackerError::InvalidInput(format!("{name} must be >= 0")));
            }
        }
        if !(0.0..=100.0).contains(&self.body_fat_percentage) {
            return Err(TrackerError::InvalidInput(
                "body_fat_percentage must be within 0..=100".into(),
            ));
        }
        Ok(())
    }

    pub fn calorie_target(&self) -> f64 {
        self.daily_calorie_target.unwrap_or_else(|| {
            calorie_target(self.bmr, self.activity_level, self.weekly_weight_change_goal)
        })
    }

    /// Targets for new daily records. Carbs and fats keep their defaults.
    pub fn goal_targets(&self) -> GoalTargets {
        GoalTargets {
            water_liters: self.water_goal,
            calories: self.calorie_target(),
            protein: self.daily_protein_target,
            exercise_minutes: self.exercise_goal,
            ..GoalTargets::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            current_weight: 90.0,
            target_weight: 82.0,
            body_fat_percentage: 24.0,
            skeletal_muscle: 38.0,
            visceral_fat_index: 9.0,
            bmr: 1800.0,
            activity_level: ActivityLevel::Moderate,
            goal_type: GoalType::Cut,
            weekly_weight_change_goal: -0.5,
            daily_calorie_target: None,
            daily_protein_target: 180.0,
            water_goal: 3.5,
            exercise_goal: 45.0,
        }
    }

    #[test]
    fn tdee_uses_activity_multiplier() {
        assert_eq!(tdee(1800.0, ActivityLevel::Moderate), 2790.0);
        assert_eq!(tdee(1800.0, ActivityLevel::Sedentary), 2160.0);
    }

    #[test]
    fn cutting_lowers_the_target() {
        // 2790 - round(0.5 * 7700 / 7) = 2790 - 550
        assert_eq!(calorie_target(1800.0, ActivityLevel::Moderate, -0.5), 2240.0);
    }

    #[test]
    fn explicit_target_wins() {
        let mut p = profile();
        assert_eq!(p.calorie_target(), 2240.0);
        p.daily_calorie_target = Some(2100.0);
        assert_eq!(p.goal_targets().calories, 2100.0);
    }

    #[test]
    fn goal_targets_follow_profile() {
        let t = profile().goal_targets();
        assert_eq!(t.water_liters, 3.5);
        assert_eq!(t.exercise_minutes, 45.0);
        assert_eq!(t.protein, 180.0);
        assert_eq!(t.carbs, GoalTargets::default().carbs);
    }

    #[test]
    fn validation_rejects_bad_body_fat() {
        let mut p = profile();
        assert!(p.validate().is_ok());
        p.body_fat_percentage = 120.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn activity_level_serializes_kebab_case() {
        let v = serde_json::to_value(ActivityLevel::VeryActive).unwrap();
        assert_eq!(v, "very-active");
    }
}

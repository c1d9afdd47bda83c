use std::path::PathBuf;

use secrecy::SecretString;

use crate::TrackerError;
use crate::goals::GoalSet;
use crate::models::GoalTargets;

pub const DEFAULT_INFERENCE_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_INFERENCE_MODEL: &str = "gemini-2.5-flash-lite";

#[derive(Clone, Debug)]
pub struct Config {
    /// JSON store location. `None` keeps everything in memory.
    pub data_path: Option<PathBuf>,
    pub goal_set: GoalSet,
    pub targets: GoalTargets,
    pub inference_api_key: Option<SecretString>,
    pub inference_base_url: String,
    pub inference_model: String,
}

impl Config {
    pub fn from_env() -> Result<Self, TrackerError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Testable helper that reads configuration values using the provided
    /// function, so tests never touch the process environment.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, TrackerError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut parse_target = |key: &str, default: f64| -> Result<f64, TrackerError> {
            match get(key).filter(|v| !v.trim().is_empty()) {
                None => Ok(default),
                Some(raw) => match raw.trim().parse::<f64>() {
                    Ok(v) if v > 0.0 => Ok(v),
                    _ => Err(TrackerError::Config(format!(
                        "{key} must be a positive number, got {raw:?}"
                    ))),
                },
            }
        };

        let defaults = GoalTargets::default();
        let targets = GoalTargets {
            water_liters: parse_target("FITTRACK_WATER_GOAL", defaults.water_liters)?,
            calories: parse_target("FITTRACK_CALORIE_GOAL", defaults.calories)?,
            protein: parse_target("FITTRACK_PROTEIN_GOAL", defaults.protein)?,
            exercise_minutes: parse_target("FITTRACK_EXERCISE_GOAL", defaults.exercise_minutes)?,
            ..defaults
        };

        let goal_set = match get("FITTRACK_GOAL_SET").filter(|v| !v.trim().is_empty()) {
            None => GoalSet::default(),
            Some(raw) => raw.parse::<GoalSet>().map_err(TrackerError::Config)?,
        };

        let data_path = get("FITTRACK_DATA_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        let inference_api_key = get("GEMINI_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .map(|k| SecretString::new(k.into()));
        let inference_base_url =
            get("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_INFERENCE_BASE_URL.into());
        let inference_model = get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_INFERENCE_MODEL.into());

        Ok(Self {
            data_path,
            goal_set,
            targets,
            inference_api_key,
            inference_base_url,
            inference_model,
        })
    }
}

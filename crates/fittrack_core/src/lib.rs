//! Goal-completion and streak engine for a single-user fitness tracker.
//!
//! The pure engine lives in [`goals`], [`streak`] and [`summary`]. Storage and
//! AI inference are collaborators behind the [`store::RecordStore`] and
//! [`inference::InferenceClient`] traits.

use thiserror::Error;

pub mod analysis;
pub mod config;
pub mod export;
pub mod goals;
pub mod inference;
pub mod models;
pub mod profile;
pub mod retry;
pub mod store;
pub mod streak;
pub mod summary;
pub mod utils;
pub mod weight;

pub use goals::{GoalCompletion, GoalSet, evaluate_daily_goals};
pub use models::{DailyRecord, DailyUpdate, ExerciseEntry, GoalTargets, Meal, WeightEntry};
pub use streak::{StreakSnapshot, compute_streak_stats};
pub use summary::{Period, PeriodSummary, compute_period_summary};

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("inference error: {0}")]
    Inference(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl TrackerError {
    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            TrackerError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| s.is_server_error() || s.as_u16() == 429)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_are_not_transient() {
        let err = TrackerError::Config("missing".into());
        assert!(!err.is_transient());
        assert_eq!(err.to_string(), "configuration error: missing");
    }

    #[test]
    fn serde_errors_convert() {
        let res: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: TrackerError = res.unwrap_err().into();
        assert!(matches!(err, TrackerError::Serialization(_)));
    }
}

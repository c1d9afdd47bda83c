//! Application layer shared by the MCP tools and the REST routes.
//!
//! Every write to a day goes through [`TrackerService::mutate_day`] (or its
//! locked variant) so the read, merge, evaluate and write steps for one date
//! never interleave with another writer in this process.

use std::sync::Arc;

use chrono::{Datelike, Days, NaiveDate, Utc};
use fittrack_core::analysis::{
    AnalysisSource, PeriodAnalysis, build_period_digest, fallback_analysis,
};
use fittrack_core::export::{ExportFormat, SummaryExport, render_csv};
use fittrack_core::goals::CompletionTier;
use fittrack_core::inference::{
    ExerciseEstimate, InferenceClient, NutritionEstimate, ReqwestInferenceClient,
};
use fittrack_core::models::{ExerciseUpdate, MealTotals, MealUpdate, NewExercise, NewMeal};
use fittrack_core::profile::UserProfile;
use fittrack_core::store::{JsonFileStore, MemoryStore, RecordStore};
use fittrack_core::summary::records_in_window;
use fittrack_core::weight::{WeightPoint, fill_weight_history};
use fittrack_core::{
    DailyRecord, DailyUpdate, ExerciseEntry, GoalSet, GoalTargets, Meal, Period, PeriodSummary,
    StreakSnapshot, TrackerError, WeightEntry, compute_period_summary, streak,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};
use uuid::Uuid;

use fittrack_core::config::Config;

use crate::error::{McpError, McpResult};
use crate::middleware::LoggingStore;

pub const DEFAULT_STREAK_WINDOW_DAYS: u32 = 90;
const MAX_WINDOW_DAYS: u32 = 3660;
/// Fixed number of day locks; dates share a lock by day number modulo this.
const DAY_LOCK_STRIPES: usize = 64;

/// A day as a calendar view shades it.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StreakDay {
    #[serde(flatten)]
    pub record: DailyRecord,
    pub completion_percentage: u32,
    pub tier: CompletionTier,
}

impl From<DailyRecord> for StreakDay {
    fn from(record: DailyRecord) -> Self {
        Self {
            completion_percentage: record.completion_percentage(),
            tier: record.completion_tier(),
            record,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StreakReport {
    /// Records inside the window, ascending.
    pub logs: Vec<StreakDay>,
    pub stats: StreakSnapshot,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MealsForDay {
    pub date: NaiveDate,
    pub meals: Vec<Meal>,
    pub totals: MealTotals,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MealLogged {
    pub meal: Meal,
    pub day: DailyRecord,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ExerciseLogged {
    pub exercise: ExerciseEntry,
    pub day: DailyRecord,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct WeightLogged {
    pub entry: WeightEntry,
    pub day: DailyRecord,
}

#[derive(Debug)]
pub enum Export {
    Json(SummaryExport),
    Csv(String),
}

#[derive(Clone)]
pub struct TrackerService {
    store: Arc<dyn RecordStore>,
    inference: Option<Arc<dyn InferenceClient>>,
    goal_set: GoalSet,
    default_targets: GoalTargets,
    day_locks: Arc<[Mutex<()>]>,
}

fn undo_failed<T>(op: &'static str, result: Result<T, TrackerError>) {
    if let Err(e) = result {
        warn!(op, error = %e, "could not undo entry write after day rewrite failed");
    }
}

impl TrackerService {
    pub fn new(store: Arc<dyn RecordStore>, goal_set: GoalSet, default_targets: GoalTargets) -> Self {
        Self {
            store,
            inference: None,
            goal_set,
            default_targets,
            day_locks: (0..DAY_LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    /// In-memory service with default targets. Handy for tests.
    pub fn in_memory(goal_set: GoalSet) -> Self {
        Self::new(Arc::new(MemoryStore::new()), goal_set, GoalTargets::default())
    }

    pub fn with_inference(mut self, client: Arc<dyn InferenceClient>) -> Self {
        self.inference = Some(client);
        self
    }

    /// Wire the store and inference client described by `config`.
    pub async fn from_config(config: &Config) -> McpResult<Self> {
        let store: Arc<dyn RecordStore> = match &config.data_path {
            Some(path) => Arc::new(LoggingStore::new(JsonFileStore::open(path).await?)),
            None => Arc::new(LoggingStore::new(MemoryStore::new())),
        };
        let mut service = Self::new(store, config.goal_set, config.targets.clone());
        if let Some(client) = ReqwestInferenceClient::from_config(config)? {
            service = service.with_inference(Arc::new(client));
        }
        info!(
            goal_set = %config.goal_set,
            persistent = config.data_path.is_some(),
            inference = service.inference.is_some(),
            "tracker service ready"
        );
        Ok(service)
    }

    pub fn goal_set(&self) -> GoalSet {
        self.goal_set
    }

    /// Targets for newly created days: the profile's if one is saved.
    pub async fn targets(&self) -> McpResult<GoalTargets> {
        Ok(match self.store.get_profile().await? {
            Some(profile) => profile.goal_targets(),
            None => self.default_targets.clone(),
        })
    }

    async fn lock_day(&self, date: NaiveDate) -> MutexGuard<'_, ()> {
        let stripe = date.num_days_from_ce().rem_euclid(DAY_LOCK_STRIPES as i32) as usize;
        self.day_locks[stripe].lock().await
    }

    /// Read, merge, evaluate and write one day. Caller must hold the day lock.
    async fn rewrite_day_locked<F>(&self, date: NaiveDate, merge: F) -> McpResult<DailyRecord>
    where
        F: FnOnce(&mut DailyRecord) + Send,
    {
        let mut record = match self.store.get_day(date).await? {
            Some(existing) => existing,
            None => DailyRecord::new(date, &self.targets().await?),
        };
        let was_perfect = record.is_streak_day;
        merge(&mut record);
        let completion = record.stamp(self.goal_set);
        record.updated_at = Some(Utc::now());
        self.store.put_day(record.clone()).await?;

        if completion.is_streak_day && !was_perfect {
            metrics::counter!("fittrack_streak_days_total").increment(1);
        }
        info!(
            %date,
            goals_completed = completion.goals_completed,
            total_goals = completion.total_goals,
            streak_day = completion.is_streak_day,
            "day updated"
        );
        Ok(record)
    }

    async fn mutate_day<F>(&self, date: NaiveDate, merge: F) -> McpResult<DailyRecord>
    where
        F: FnOnce(&mut DailyRecord) + Send,
    {
        let _guard = self.lock_day(date).await;
        self.rewrite_day_locked(date, merge).await
    }

    /// Stored record for `date`, or an unsaved empty one scored against
    /// today's targets.
    pub async fn get_day(&self, date: NaiveDate) -> McpResult<DailyRecord> {
        if let Some(record) = self.store.get_day(date).await? {
            return Ok(record);
        }
        let mut record = DailyRecord::new(date, &self.targets().await?);
        let completion = fittrack_core::evaluate_daily_goals(&record, self.goal_set);
        record.total_goals = completion.total_goals;
        Ok(record)
    }

    pub async fn update_day(&self, date: NaiveDate, update: DailyUpdate) -> McpResult<DailyRecord> {
        if update.is_empty() {
            return Err(McpError::Validation("no fields to update".into()));
        }
        self.mutate_day(date, move |rec| update.apply_to(rec)).await
    }

    /// Add (or with a negative amount, remove) water. Never drops below zero.
    pub async fn add_water(&self, date: NaiveDate, liters: f64) -> McpResult<DailyRecord> {
        if !liters.is_finite() {
            return Err(McpError::Validation("liters must be a finite number".into()));
        }
        self.mutate_day(date, move |rec| {
            rec.water_liters = (rec.water_liters + liters).max(0.0);
        })
        .await
    }

    pub async fn log_meal(&self, new_meal: NewMeal) -> McpResult<MealLogged> {
        let meal = new_meal.into_meal(Utc::now())?;
        let _guard = self.lock_day(meal.date).await;
        self.store.insert_meal(meal.clone()).await?;
        let added = meal.clone();
        let rewritten = self
            .rewrite_day_locked(meal.date, move |rec| {
                rec.calories += added.calories;
                rec.carbs += added.carbs;
                rec.fats += added.fats;
                rec.protein += added.protein;
            })
            .await;
        match rewritten {
            Ok(day) => Ok(MealLogged { meal, day }),
            Err(e) => {
                undo_failed("log_meal", self.store.delete_meal(meal.id).await);
                Err(e)
            }
        }
    }

    /// Edit a meal in place and move the day's totals by the difference.
    pub async fn update_meal(&self, id: Uuid, update: MealUpdate) -> McpResult<MealLogged> {
        if update.is_empty() {
            return Err(McpError::Validation("no fields to update".into()));
        }
        let not_found = || McpError::NotFound(format!("meal {id}"));
        let date = self.store.get_meal(id).await?.ok_or_else(not_found)?.date;
        let _guard = self.lock_day(date).await;
        let old = self.store.get_meal(id).await?.ok_or_else(not_found)?;
        let meal = update.applied_to(&old)?;
        self.store.insert_meal(meal.clone()).await?;

        let (before, after) = (old.clone(), meal.clone());
        let rewritten = self
            .rewrite_day_locked(date, move |rec| {
                rec.calories = (rec.calories - before.calories + after.calories).max(0.0);
                rec.carbs = (rec.carbs - before.carbs + after.carbs).max(0.0);
                rec.fats = (rec.fats - before.fats + after.fats).max(0.0);
                rec.protein = (rec.protein - before.protein + after.protein).max(0.0);
            })
            .await;
        match rewritten {
            Ok(day) => Ok(MealLogged { meal, day }),
            Err(e) => {
                undo_failed("update_meal", self.store.insert_meal(old).await);
                Err(e)
            }
        }
    }

    pub async fn list_meals(&self, date: NaiveDate) -> McpResult<MealsForDay> {
        let meals = self.store.meals_between(date, date).await?;
        let totals = MealTotals::from_meals(&meals);
        Ok(MealsForDay {
            date,
            meals,
            totals,
        })
    }

    pub async fn delete_meal(&self, id: Uuid) -> McpResult<DailyRecord> {
        let meal = self
            .store
            .get_meal(id)
            .await?
            .ok_or_else(|| McpError::NotFound(format!("meal {id}")))?;
        let _guard = self.lock_day(meal.date).await;
        let removed = self
            .store
            .delete_meal(id)
            .await?
            .ok_or_else(|| McpError::NotFound(format!("meal {id}")))?;
        let taken = removed.clone();
        let rewritten = self
            .rewrite_day_locked(removed.date, move |rec| {
                rec.calories = (rec.calories - taken.calories).max(0.0);
                rec.carbs = (rec.carbs - taken.carbs).max(0.0);
                rec.fats = (rec.fats - taken.fats).max(0.0);
                rec.protein = (rec.protein - taken.protein).max(0.0);
            })
            .await;
        if rewritten.is_err() {
            undo_failed("delete_meal", self.store.insert_meal(removed).await);
        }
        rewritten
    }

    pub async fn log_exercise(&self, new_exercise: NewExercise) -> McpResult<ExerciseLogged> {
        let exercise = new_exercise.into_entry()?;
        let _guard = self.lock_day(exercise.date).await;
        self.store.insert_exercise(exercise.clone()).await?;
        let minutes = exercise.minutes();
        let rewritten = self
            .rewrite_day_locked(exercise.date, move |rec| {
                rec.exercise_minutes += minutes;
            })
            .await;
        match rewritten {
            Ok(day) => Ok(ExerciseLogged { exercise, day }),
            Err(e) => {
                undo_failed("log_exercise", self.store.delete_exercise(exercise.id).await);
                Err(e)
            }
        }
    }

    /// Edit an exercise in place and move the day's minutes by the difference.
    pub async fn update_exercise(
        &self,
        id: Uuid,
        update: ExerciseUpdate,
    ) -> McpResult<ExerciseLogged> {
        if update.is_empty() {
            return Err(McpError::Validation("no fields to update".into()));
        }
        let not_found = || McpError::NotFound(format!("exercise {id}"));
        let date = self.store.get_exercise(id).await?.ok_or_else(not_found)?.date;
        let _guard = self.lock_day(date).await;
        let old = self.store.get_exercise(id).await?.ok_or_else(not_found)?;
        let exercise = update.applied_to(&old)?;
        self.store.insert_exercise(exercise.clone()).await?;

        let delta = exercise.minutes() - old.minutes();
        let rewritten = self
            .rewrite_day_locked(date, move |rec| {
                rec.exercise_minutes = (rec.exercise_minutes + delta).max(0.0);
            })
            .await;
        match rewritten {
            Ok(day) => Ok(ExerciseLogged { exercise, day }),
            Err(e) => {
                undo_failed("update_exercise", self.store.insert_exercise(old).await);
                Err(e)
            }
        }
    }

    pub async fn list_exercises(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> McpResult<Vec<ExerciseEntry>> {
        Ok(self.store.exercises_between(start, end).await?)
    }

    pub async fn delete_exercise(&self, id: Uuid) -> McpResult<DailyRecord> {
        let entry = self
            .store
            .get_exercise(id)
            .await?
            .ok_or_else(|| McpError::NotFound(format!("exercise {id}")))?;
        let _guard = self.lock_day(entry.date).await;
        let removed = self
            .store
            .delete_exercise(id)
            .await?
            .ok_or_else(|| McpError::NotFound(format!("exercise {id}")))?;
        let minutes = removed.minutes();
        let rewritten = self
            .rewrite_day_locked(removed.date, move |rec| {
                rec.exercise_minutes = (rec.exercise_minutes - minutes).max(0.0);
            })
            .await;
        if rewritten.is_err() {
            undo_failed("delete_exercise", self.store.insert_exercise(removed).await);
        }
        rewritten
    }

    /// Upsert the weigh-in for its date and mirror it onto the day.
    pub async fn log_weight(&self, entry: WeightEntry) -> McpResult<WeightLogged> {
        entry.validate()?;
        let _guard = self.lock_day(entry.date).await;
        let previous = self
            .store
            .weights_between(entry.date, entry.date)
            .await?
            .into_iter()
            .next();
        self.store.put_weight(entry.clone()).await?;
        let (weight, body_fat) = (entry.weight, entry.body_fat_percentage);
        let rewritten = self
            .rewrite_day_locked(entry.date, move |rec| {
                rec.weight = Some(weight);
                if body_fat.is_some() {
                    rec.body_fat_percentage = body_fat;
                }
            })
            .await;
        match rewritten {
            Ok(day) => Ok(WeightLogged { entry, day }),
            Err(e) => {
                let restored = match previous {
                    Some(old) => self.store.put_weight(old).await,
                    None => self.store.delete_weight(entry.date).await.map(drop),
                };
                undo_failed("log_weight", restored);
                Err(e)
            }
        }
    }

    pub async fn weight_history(&self, days: u32, today: NaiveDate) -> McpResult<Vec<WeightPoint>> {
        let days = days.min(MAX_WINDOW_DAYS);
        let entries = self.store.weights_between(NaiveDate::MIN, today).await?;
        Ok(fill_weight_history(&entries, today, days))
    }

    /// Window logs plus streak stats. Current and longest streak are computed
    /// over the whole history; active and perfect counts over the window.
    pub async fn streak_report(&self, days: u32, today: NaiveDate) -> McpResult<StreakReport> {
        let days = days.clamp(1, MAX_WINDOW_DAYS);
        let start = today
            .checked_sub_days(Days::new(u64::from(days - 1)))
            .unwrap_or(NaiveDate::MIN);
        let history = self.store.all_records().await?;
        let mut window: Vec<DailyRecord> = history
            .iter()
            .filter(|r| r.date >= start && r.date <= today)
            .cloned()
            .collect();
        window.sort_by_key(|r| r.date);

        let stats = StreakSnapshot {
            current_streak: streak::current_streak(&history, today),
            longest_streak: streak::longest_streak(&history),
            active_days: streak::active_days(&window),
            perfect_days: streak::perfect_days(&window),
            total_days_considered: window.len() as u32,
        };
        let logs = window.into_iter().map(StreakDay::from).collect();
        Ok(StreakReport { logs, stats })
    }

    pub async fn period_summary(&self, period: Period, today: NaiveDate) -> McpResult<PeriodSummary> {
        let start = period.start_date(today);
        let records = self.store.records_between(start, today).await?;
        Ok(compute_period_summary(&records, period, today))
    }

    pub async fn export(
        &self,
        period: Period,
        format: ExportFormat,
        today: NaiveDate,
    ) -> McpResult<Export> {
        let start = period.start_date(today);
        let records = self.store.records_between(start, today).await?;
        let meals = self.store.meals_between(start, today).await?;
        let exercises = self.store.exercises_between(start, today).await?;
        let summary = compute_period_summary(&records, period, today);
        let export = SummaryExport::new(summary, records_in_window(&records, period, today))
            .with_entries(&meals, &exercises);
        Ok(match format {
            ExportFormat::Json => Export::Json(export),
            ExportFormat::Csv => Export::Csv(render_csv(&export)),
        })
    }

    pub async fn get_profile(&self) -> McpResult<Option<UserProfile>> {
        Ok(self.store.get_profile().await?)
    }

    /// Save the profile. Only days created afterwards pick up its targets.
    pub async fn put_profile(&self, profile: UserProfile) -> McpResult<UserProfile> {
        profile.validate()?;
        self.store.put_profile(profile.clone()).await?;
        info!(calorie_target = profile.calorie_target(), "profile saved");
        Ok(profile)
    }

    fn inference(&self) -> McpResult<&Arc<dyn InferenceClient>> {
        self.inference
            .as_ref()
            .ok_or_else(|| McpError::Unavailable("GEMINI_API_KEY is not configured".into()))
    }

    pub async fn estimate_meal(&self, description: &str) -> McpResult<NutritionEstimate> {
        Ok(self.inference()?.estimate_meal(description).await?)
    }

    pub async fn estimate_exercise(&self, description: &str) -> McpResult<ExerciseEstimate> {
        Ok(self.inference()?.estimate_exercise(description).await?)
    }

    /// Digest of the period plus coaching feedback. When the model reply is
    /// unusable the feedback is computed from the digest instead.
    pub async fn analyze_period(&self, period: Period, today: NaiveDate) -> McpResult<PeriodAnalysis> {
        let client = self.inference()?;
        let start = period.start_date(today);
        let records = self.store.records_between(start, today).await?;
        let meals = self.store.meals_between(start, today).await?;
        let exercises = self.store.exercises_between(start, today).await?;
        let summary = build_period_digest(&records, &meals, &exercises, period, today);

        let (analysis, source) = match client.analyze_period(&summary).await {
            Ok(analysis) => (analysis, AnalysisSource::Model),
            Err(TrackerError::Inference(reason)) => {
                warn!(%period, %reason, "model analysis unusable, using computed analysis");
                (fallback_analysis(&summary), AnalysisSource::Fallback)
            }
            Err(e) => return Err(e.into()),
        };
        Ok(PeriodAnalysis {
            summary,
            analysis,
            source,
        })
    }
}

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use fittrack_core::analysis::{AnalysisSource, CoachAnalysis, PeriodDigest};
use fittrack_core::inference::{ExerciseEstimate, InferenceClient, NutritionEstimate};
use fittrack_core::models::{ExerciseCategory, MealUpdate, NewExercise, NewMeal};
use fittrack_core::profile::UserProfile;
use fittrack_core::store::{MemoryStore, RecordStore};
use fittrack_core::{
    DailyRecord, DailyUpdate, ExerciseEntry, GoalSet, GoalTargets, Meal, Period, TrackerError,
    WeightEntry,
};
use fittrack_mcp::error::McpError;
use fittrack_mcp::services::TrackerService;
use uuid::Uuid;

#[derive(Default)]
struct CannedInference {
    calls: AtomicUsize,
    garbled_analysis: bool,
}

#[async_trait]
impl InferenceClient for CannedInference {
    async fn estimate_meal(&self, description: &str) -> Result<NutritionEstimate, TrackerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if description.contains("mystery") {
            return Err(TrackerError::Inference("no JSON object in reply".into()));
        }
        Ok(NutritionEstimate {
            calories: 520.0,
            carbs: 48.0,
            fats: 18.5,
            protein: 38.0,
        })
    }

    async fn estimate_exercise(
        &self,
        _description: &str,
    ) -> Result<ExerciseEstimate, TrackerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ExerciseEstimate {
            name: "Running".into(),
            category: ExerciseCategory::Cardio,
            muscle_group: None,
            sets: None,
            reps: None,
            weight: None,
            duration: Some(45.0),
            distance: Some(8.0),
            calories_burned: Some(480.0),
            notes: None,
        })
    }

    async fn analyze_period(&self, digest: &PeriodDigest) -> Result<CoachAnalysis, TrackerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.garbled_analysis {
            return Err(TrackerError::Inference("unparsable model output".into()));
        }
        Ok(CoachAnalysis {
            overall_score: 88,
            highlights: vec![format!("{} days tracked", digest.total_days)],
            areas_to_improve: vec!["More protein".into()],
            hydration_insight: "Solid".into(),
            nutrition_insight: "Balanced".into(),
            exercise_insight: "Consistent".into(),
            weekly_tip: "Sleep more".into(),
            motivational_message: "Nice".into(),
        })
    }
}

/// Memory store whose day writes always fail.
#[derive(Default)]
struct BrokenDayStore {
    inner: MemoryStore,
}

#[async_trait]
impl RecordStore for BrokenDayStore {
    async fn get_day(&self, date: NaiveDate) -> Result<Option<DailyRecord>, TrackerError> {
        self.inner.get_day(date).await
    }

    async fn put_day(&self, _record: DailyRecord) -> Result<(), TrackerError> {
        Err(TrackerError::Io(std::io::Error::other("disk full")))
    }

    async fn records_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyRecord>, TrackerError> {
        self.inner.records_between(start, end).await
    }

    async fn all_records(&self) -> Result<Vec<DailyRecord>, TrackerError> {
        self.inner.all_records().await
    }

    async fn insert_meal(&self, meal: Meal) -> Result<(), TrackerError> {
        self.inner.insert_meal(meal).await
    }

    async fn get_meal(&self, id: Uuid) -> Result<Option<Meal>, TrackerError> {
        self.inner.get_meal(id).await
    }

    async fn delete_meal(&self, id: Uuid) -> Result<Option<Meal>, TrackerError> {
        self.inner.delete_meal(id).await
    }

    async fn meals_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Meal>, TrackerError> {
        self.inner.meals_between(start, end).await
    }

    async fn insert_exercise(&self, entry: ExerciseEntry) -> Result<(), TrackerError> {
        self.inner.insert_exercise(entry).await
    }

    async fn get_exercise(&self, id: Uuid) -> Result<Option<ExerciseEntry>, TrackerError> {
        self.inner.get_exercise(id).await
    }

    async fn delete_exercise(&self, id: Uuid) -> Result<Option<ExerciseEntry>, TrackerError> {
        self.inner.delete_exercise(id).await
    }

    async fn exercises_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ExerciseEntry>, TrackerError> {
        self.inner.exercises_between(start, end).await
    }

    async fn put_weight(&self, entry: WeightEntry) -> Result<(), TrackerError> {
        self.inner.put_weight(entry).await
    }

    async fn delete_weight(&self, date: NaiveDate) -> Result<Option<WeightEntry>, TrackerError> {
        self.inner.delete_weight(date).await
    }

    async fn weights_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<WeightEntry>, TrackerError> {
        self.inner.weights_between(start, end).await
    }

    async fn get_profile(&self) -> Result<Option<UserProfile>, TrackerError> {
        self.inner.get_profile().await
    }

    async fn put_profile(&self, profile: UserProfile) -> Result<(), TrackerError> {
        self.inner.put_profile(profile).await
    }
}

fn meal(calories: f64) -> NewMeal {
    NewMeal {
        date: day(),
        description: "omelette".into(),
        meal_type: None,
        calories: Some(calories),
        carbs: Some(5.0),
        fats: Some(20.0),
        protein: Some(25.0),
        fiber: None,
        sugar: None,
        sodium: None,
        notes: None,
        is_ai_analyzed: None,
    }
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 5, 4).unwrap()
}

#[tokio::test]
async fn estimate_without_client_is_unavailable() {
    let service = TrackerService::in_memory(GoalSet::Core);
    let err = service.estimate_meal("two eggs").await.unwrap_err();
    assert!(matches!(err, McpError::Unavailable(_)));
    assert_eq!(err.status_code(), 503);
}

#[tokio::test]
async fn meal_estimate_can_be_logged_as_a_meal() {
    let client = Arc::new(CannedInference::default());
    let service = TrackerService::in_memory(GoalSet::Core).with_inference(client.clone());

    let est = service.estimate_meal("chicken burrito bowl").await.unwrap();
    assert_eq!(est.calories, 520.0);

    let logged = service
        .log_meal(NewMeal {
            date: day(),
            description: "chicken burrito bowl".into(),
            meal_type: None,
            calories: Some(est.calories),
            carbs: Some(est.carbs),
            fats: Some(est.fats),
            protein: Some(est.protein),
            fiber: None,
            sugar: None,
            sodium: None,
            notes: None,
            is_ai_analyzed: Some(true),
        })
        .await
        .unwrap();
    assert_eq!(logged.day.calories, 520.0);
    assert_eq!(logged.day.protein, 38.0);
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn inference_failures_map_to_bad_gateway() {
    let service = TrackerService::in_memory(GoalSet::Core)
        .with_inference(Arc::new(CannedInference::default()));
    let err = service.estimate_meal("mystery stew").await.unwrap_err();
    assert_eq!(err.status_code(), 502);
}

#[tokio::test]
async fn exercise_estimate_rolls_into_exercise_minutes() {
    let service = TrackerService::in_memory(GoalSet::Core)
        .with_inference(Arc::new(CannedInference::default()));

    let est = service.estimate_exercise("ran 8k in 45 minutes").await.unwrap();
    assert_eq!(est.category, ExerciseCategory::Cardio);

    let logged = service
        .log_exercise(est.into_new_exercise(day()))
        .await
        .unwrap();
    assert_eq!(logged.day.exercise_minutes, 45.0);
    assert_eq!(logged.day.goals_completed, 0);

    let more = service
        .log_exercise(
            service
                .estimate_exercise("another 45 minute run")
                .await
                .unwrap()
                .into_new_exercise(day()),
        )
        .await
        .unwrap();
    assert_eq!(more.day.exercise_minutes, 90.0);
    assert_eq!(more.day.goals_completed, 1);

    let after = service.delete_exercise(more.exercise.id).await.unwrap();
    assert_eq!(after.exercise_minutes, 45.0);
    assert_eq!(after.goals_completed, 0);
}

#[tokio::test]
async fn failed_day_write_leaves_no_orphan_entries() {
    let store = Arc::new(BrokenDayStore::default());
    let service = TrackerService::new(store.clone(), GoalSet::Core, GoalTargets::default());

    let err = service.log_meal(meal(400.0)).await.unwrap_err();
    assert_eq!(err.status_code(), 500);
    assert!(service.list_meals(day()).await.unwrap().meals.is_empty());

    let err = service
        .log_exercise(NewExercise {
            date: day(),
            name: "Cycling".into(),
            category: ExerciseCategory::Cardio,
            muscle_group: None,
            sets: vec![],
            duration_minutes: Some(30.0),
            distance_km: None,
            calories_burned: None,
            notes: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 500);
    assert!(service.list_exercises(day(), day()).await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_day_write_restores_previous_weight() {
    let store = Arc::new(BrokenDayStore::default());
    let weigh_in = |weight: f64| WeightEntry {
        date: day(),
        weight,
        body_fat_percentage: None,
        notes: None,
    };
    store.inner.put_weight(weigh_in(82.0)).await.unwrap();
    let service = TrackerService::new(store.clone(), GoalSet::WithWeight, GoalTargets::default());

    assert!(service.log_weight(weigh_in(79.5)).await.is_err());
    let kept = store.weights_between(day(), day()).await.unwrap();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].weight, 82.0);

    let other = day().succ_opt().unwrap();
    assert!(
        service
            .log_weight(WeightEntry {
                date: other,
                ..weigh_in(80.0)
            })
            .await
            .is_err()
    );
    assert!(store.weights_between(other, other).await.unwrap().is_empty());
}

#[tokio::test]
async fn meal_edit_moves_day_totals_by_the_difference() {
    let service = TrackerService::in_memory(GoalSet::Core);
    let logged = service.log_meal(meal(600.0)).await.unwrap();
    service.log_meal(meal(900.0)).await.unwrap();

    let edited = service
        .update_meal(
            logged.meal.id,
            MealUpdate {
                calories: Some(450.0),
                protein: Some(40.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.meal.calories, 450.0);
    assert_eq!(edited.meal.date, day());
    assert_eq!(edited.day.calories, 1350.0);
    assert_eq!(edited.day.protein, 65.0);

    let err = service
        .update_meal(logged.meal.id, MealUpdate::default())
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 400);
    let err = service
        .update_meal(
            Uuid::new_v4(),
            MealUpdate {
                calories: Some(1.0),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn analysis_needs_a_configured_client() {
    let service = TrackerService::in_memory(GoalSet::Core);
    let err = service.analyze_period(Period::Week, day()).await.unwrap_err();
    assert_eq!(err.status_code(), 503);
}

#[tokio::test]
async fn analysis_uses_model_reply_when_usable() {
    let service = TrackerService::in_memory(GoalSet::Core)
        .with_inference(Arc::new(CannedInference::default()));
    service.log_meal(meal(700.0)).await.unwrap();

    let result = service.analyze_period(Period::Day, day()).await.unwrap();
    assert_eq!(result.source, AnalysisSource::Model);
    assert_eq!(result.analysis.overall_score, 88);
    assert_eq!(result.analysis.highlights, vec!["1 days tracked".to_string()]);
    assert_eq!(result.summary.meals.other, 1);
}

#[tokio::test]
async fn unusable_analysis_falls_back_to_computed_one() {
    let client = Arc::new(CannedInference {
        garbled_analysis: true,
        ..Default::default()
    });
    let service = TrackerService::in_memory(GoalSet::Core).with_inference(client.clone());
    service
        .update_day(
            day(),
            DailyUpdate {
                water_liters: Some(4.0),
                calories: Some(2000.0),
                exercise_minutes: Some(60.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let result = service.analyze_period(Period::Day, day()).await.unwrap();
    assert_eq!(result.source, AnalysisSource::Fallback);
    assert_eq!(result.analysis.overall_score, 100);
    assert_eq!(result.summary.water.days_met_goal, 1);
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
}

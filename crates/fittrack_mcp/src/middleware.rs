//! Cross-cutting concerns around the record store.
//!
//! [`LoggingStore`] sits between the service and any [`RecordStore`] and adds
//! a debug line plus a latency sample per operation. The wrapped store never
//! sees these concerns.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::NaiveDate;
use fittrack_core::TrackerError;
use fittrack_core::models::{DailyRecord, ExerciseEntry, Meal, WeightEntry};
use fittrack_core::profile::UserProfile;
use fittrack_core::store::RecordStore;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone)]
pub struct LoggingStore<S: RecordStore> {
    inner: Arc<S>,
}

impl<S: RecordStore> LoggingStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    async fn with_logging<F, Fut, T>(&self, operation: F, name: &'static str) -> Result<T, TrackerError>
    where
        F: FnOnce(Arc<S>) -> Fut,
        Fut: std::future::Future<Output = Result<T, TrackerError>>,
    {
        let start = Instant::now();
        let result = operation(self.inner.clone()).await;
        let elapsed = start.elapsed();

        metrics::histogram!("fittrack_store_operation_seconds", "op" => name)
            .record(elapsed.as_secs_f64());
        match &result {
            Ok(_) => debug!(op = name, ?elapsed, "store operation ok"),
            Err(e) => debug!(op = name, ?elapsed, error = %e, "store operation failed"),
        }
        result
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for LoggingStore<S> {
    async fn get_day(&self, date: NaiveDate) -> Result<Option<DailyRecord>, TrackerError> {
        self.with_logging(|s| async move { s.get_day(date).await }, "get_day")
            .await
    }

    async fn put_day(&self, record: DailyRecord) -> Result<(), TrackerError> {
        self.with_logging(|s| async move { s.put_day(record).await }, "put_day")
            .await
    }

    async fn records_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyRecord>, TrackerError> {
        self.with_logging(
            |s| async move { s.records_between(start, end).await },
            "records_between",
        )
        .await
    }

    async fn all_records(&self) -> Result<Vec<DailyRecord>, TrackerError> {
        self.with_logging(|s| async move { s.all_records().await }, "all_records")
            .await
    }

    async fn insert_meal(&self, meal: Meal) -> Result<(), TrackerError> {
        self.with_logging(|s| async move { s.insert_meal(meal).await }, "insert_meal")
            .await
    }

    async fn get_meal(&self, id: Uuid) -> Result<Option<Meal>, TrackerError> {
        self.with_logging(|s| async move { s.get_meal(id).await }, "get_meal")
            .await
    }

    async fn delete_meal(&self, id: Uuid) -> Result<Option<Meal>, TrackerError> {
        self.with_logging(|s| async move { s.delete_meal(id).await }, "delete_meal")
            .await
    }

    async fn meals_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Meal>, TrackerError> {
        self.with_logging(
            |s| async move { s.meals_between(start, end).await },
            "meals_between",
        )
        .await
    }

    async fn insert_exercise(&self, entry: ExerciseEntry) -> Result<(), TrackerError> {
        self.with_logging(
            |s| async move { s.insert_exercise(entry).await },
            "insert_exercise",
        )
        .await
    }

    async fn get_exercise(&self, id: Uuid) -> Result<Option<ExerciseEntry>, TrackerError> {
        self.with_logging(|s| async move { s.get_exercise(id).await }, "get_exercise")
            .await
    }

    async fn delete_exercise(&self, id: Uuid) -> Result<Option<ExerciseEntry>, TrackerError> {
        self.with_logging(
            |s| async move { s.delete_exercise(id).await },
            "delete_exercise",
        )
        .await
    }

    async fn exercises_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ExerciseEntry>, TrackerError> {
        self.with_logging(
            |s| async move { s.exercises_between(start, end).await },
            "exercises_between",
        )
        .await
    }

    async fn put_weight(&self, entry: WeightEntry) -> Result<(), TrackerError> {
        self.with_logging(|s| async move { s.put_weight(entry).await }, "put_weight")
            .await
    }

    async fn delete_weight(&self, date: NaiveDate) -> Result<Option<WeightEntry>, TrackerError> {
        self.with_logging(|s| async move { s.delete_weight(date).await }, "delete_weight")
            .await
    }

    async fn weights_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<WeightEntry>, TrackerError> {
        self.with_logging(
            |s| async move { s.weights_between(start, end).await },
            "weights_between",
        )
        .await
    }

    async fn get_profile(&self) -> Result<Option<UserProfile>, TrackerError> {
        self.with_logging(|s| async move { s.get_profile().await }, "get_profile")
            .await
    }

    async fn put_profile(&self, profile: UserProfile) -> Result<(), TrackerError> {
        self.with_logging(|s| async move { s.put_profile(profile).await }, "put_profile")
            .await
    }
}

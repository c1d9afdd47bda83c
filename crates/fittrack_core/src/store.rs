//! Storage collaborator.
//!
//! [`RecordStore`] is the seam the application layer talks to. Two backends
//! ship with the crate: [`MemoryStore`] and [`JsonFileStore`], which keeps the
//! same state in memory and snapshots it to disk after every write.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::TrackerError;
use crate::models::{DailyRecord, ExerciseEntry, Meal, WeightEntry};
use crate::profile::UserProfile;

#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    async fn get_day(&self, date: NaiveDate) -> Result<Option<DailyRecord>, TrackerError>;

    /// Insert or replace the record for `record.date`.
    async fn put_day(&self, record: DailyRecord) -> Result<(), TrackerError>;

    /// Records with `start <= date <= end`, ascending by date.
    async fn records_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyRecord>, TrackerError>;

    async fn all_records(&self) -> Result<Vec<DailyRecord>, TrackerError>;

    /// Insert a meal, replacing any existing meal with the same id.
    async fn insert_meal(&self, meal: Meal) -> Result<(), TrackerError>;

    async fn get_meal(&self, id: Uuid) -> Result<Option<Meal>, TrackerError>;

    /// Remove a meal, returning it if it existed.
    async fn delete_meal(&self, id: Uuid) -> Result<Option<Meal>, TrackerError>;

    /// Meals in the date range, ordered by date then timestamp.
    async fn meals_between(&self, start: NaiveDate, end: NaiveDate)
    -> Result<Vec<Meal>, TrackerError>;

    /// Insert an exercise, replacing any existing entry with the same id.
    async fn insert_exercise(&self, entry: ExerciseEntry) -> Result<(), TrackerError>;

    async fn get_exercise(&self, id: Uuid) -> Result<Option<ExerciseEntry>, TrackerError>;

    async fn delete_exercise(&self, id: Uuid) -> Result<Option<ExerciseEntry>, TrackerError>;

    async fn exercises_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ExerciseEntry>, TrackerError>;

    /// Insert or replace the weigh-in for `entry.date`.
    async fn put_weight(&self, entry: WeightEntry) -> Result<(), TrackerError>;

    /// Remove the weigh-in for `date`, returning it if it existed.
    async fn delete_weight(&self, date: NaiveDate) -> Result<Option<WeightEntry>, TrackerError>;

    async fn weights_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<WeightEntry>, TrackerError>;

    async fn get_profile(&self) -> Result<Option<UserProfile>, TrackerError>;

    async fn put_profile(&self, profile: UserProfile) -> Result<(), TrackerError>;
}

/// Everything the tracker persists.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub days: BTreeMap<NaiveDate, DailyRecord>,
    #[serde(default)]
    pub meals: BTreeMap<Uuid, Meal>,
    #[serde(default)]
    pub exercises: BTreeMap<Uuid, ExerciseEntry>,
    #[serde(default)]
    pub weights: BTreeMap<NaiveDate, WeightEntry>,
    #[serde(default)]
    pub profile: Option<UserProfile>,
}

impl StoreData {
    fn records_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<DailyRecord> {
        if start > end {
            return Vec::new();
        }
        self.days.range(start..=end).map(|(_, r)| r.clone()).collect()
    }

    fn meals_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<Meal> {
        let mut meals: Vec<Meal> = self
            .meals
            .values()
            .filter(|m| m.date >= start && m.date <= end)
            .cloned()
            .collect();
        meals.sort_by_key(|m| (m.date, m.timestamp));
        meals
    }

    fn exercises_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<ExerciseEntry> {
        let mut entries: Vec<ExerciseEntry> = self
            .exercises
            .values()
            .filter(|e| e.date >= start && e.date <= end)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.date);
        entries
    }

    fn weights_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<WeightEntry> {
        if start > end {
            return Vec::new();
        }
        self.weights.range(start..=end).map(|(_, w)| w.clone()).collect()
    }
}

/// Volatile store. Suitable for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<StoreData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: StoreData) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }
}

/// Shared read and write paths for both backends.
macro_rules! impl_record_store {
    ($ty:ty) => {
        #[async_trait]
        impl RecordStore for $ty {
            async fn get_day(&self, date: NaiveDate) -> Result<Option<DailyRecord>, TrackerError> {
                Ok(self.data.read().await.days.get(&date).cloned())
            }

            async fn put_day(&self, record: DailyRecord) -> Result<(), TrackerError> {
                self.write_with(move |d| {
                    d.days.insert(record.date, record);
                })
                .await
            }

            async fn records_between(
                &self,
                start: NaiveDate,
                end: NaiveDate,
            ) -> Result<Vec<DailyRecord>, TrackerError> {
                Ok(self.data.read().await.records_between(start, end))
            }

            async fn all_records(&self) -> Result<Vec<DailyRecord>, TrackerError> {
                Ok(self.data.read().await.days.values().cloned().collect())
            }

            async fn insert_meal(&self, meal: Meal) -> Result<(), TrackerError> {
                self.write_with(move |d| {
                    d.meals.insert(meal.id, meal);
                })
                .await
            }

            async fn get_meal(&self, id: Uuid) -> Result<Option<Meal>, TrackerError> {
                Ok(self.data.read().await.meals.get(&id).cloned())
            }

            async fn delete_meal(&self, id: Uuid) -> Result<Option<Meal>, TrackerError> {
                self.write_with(move |d| d.meals.remove(&id)).await
            }

            async fn meals_between(
                &self,
                start: NaiveDate,
                end: NaiveDate,
            ) -> Result<Vec<Meal>, TrackerError> {
                Ok(self.data.read().await.meals_between(start, end))
            }

            async fn insert_exercise(&self, entry: ExerciseEntry) -> Result<(), TrackerError> {
                self.write_with(move |d| {
                    d.exercises.insert(entry.id, entry);
                })
                .await
            }

            async fn get_exercise(&self, id: Uuid) -> Result<Option<ExerciseEntry>, TrackerError> {
                Ok(self.data.read().await.exercises.get(&id).cloned())
            }

            async fn delete_exercise(
                &self,
                id: Uuid,
            ) -> Result<Option<ExerciseEntry>, TrackerError> {
                self.write_with(move |d| d.exercises.remove(&id)).await
            }

            async fn exercises_between(
                &self,
                start: NaiveDate,
                end: NaiveDate,
            ) -> Result<Vec<ExerciseEntry>, TrackerError> {
                Ok(self.data.read().await.exercises_between(start, end))
            }

            async fn put_weight(&self, entry: WeightEntry) -> Result<(), TrackerError> {
                self.write_with(move |d| {
                    d.weights.insert(entry.date, entry);
                })
                .await
            }

            async fn delete_weight(
                &self,
                date: NaiveDate,
            ) -> Result<Option<WeightEntry>, TrackerError> {
                self.write_with(move |d| d.weights.remove(&date)).await
            }

            async fn weights_between(
                &self,
                start: NaiveDate,
                end: NaiveDate,
            ) -> Result<Vec<WeightEntry>, TrackerError> {
                Ok(self.data.read().await.weights_between(start, end))
            }

            async fn get_profile(&self) -> Result<Option<UserProfile>, TrackerError> {
                Ok(self.data.read().await.profile.clone())
            }

            async fn put_profile(&self, profile: UserProfile) -> Result<(), TrackerError> {
                self.write_with(move |d| {
                    d.profile = Some(profile);
                })
                .await
            }
        }
    };
}

impl MemoryStore {
    async fn write_with<T, F>(&self, f: F) -> Result<T, TrackerError>
    where
        F: FnOnce(&mut StoreData) -> T + Send,
    {
        let mut guard = self.data.write().await;
        Ok(f(&mut *guard))
    }
}

impl_record_store!(MemoryStore);

/// JSON-file store. Each write produces a full snapshot, written to a
/// sibling temp file and renamed into place.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    data: RwLock<StoreData>,
}

impl JsonFileStore {
    /// Load `path` if it exists, otherwise start empty.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, TrackerError> {
        let path = path.into();
        let data = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => StoreData::default(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreData::default(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(
            path = %path.display(),
            days = data.days.len(),
            meals = data.meals.len(),
            "opened json store"
        );
        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_with<T, F>(&self, f: F) -> Result<T, TrackerError>
    where
        F: FnOnce(&mut StoreData) -> T + Send,
    {
        let mut guard = self.data.write().await;
        let mut next = guard.clone();
        let out = f(&mut next);
        persist(&self.path, &next).await?;
        *guard = next;
        Ok(out)
    }
}

async fn persist(path: &Path, data: &StoreData) -> Result<(), TrackerError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let bytes = serde_json::to_vec_pretty(data)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

impl_record_store!(JsonFileStore);

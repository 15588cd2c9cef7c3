//! File-backed schedule store.
//!
//! Layout under the base directory:
//!
//! ```text
//! schedules/<first two chars of id>/<id>.json   one ReviewSchedule record per file
//! index.json                                    derived ScheduleIndex snapshot
//! ```
//!
//! Schedule files are the source of truth. Every file write goes to a temp
//! file and is renamed over the target, so a reader never sees a partial
//! record. The index snapshot is written the same way, one writer at a time.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use futures::future::try_join_all;
use log::{debug, info, warn};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};

use super::analytics::{daily_workload, due_order, review_calendar};
use super::index::{IndexEntry, ScheduleIndex};
use super::traits::{
    CalendarDay, DailyWorkload, DistributionBucket, DueQuery, ScheduleQuery, ScheduleStatistics, ScheduleStore,
    StatusCounts,
};
use crate::domain::{ReviewSchedule, ScheduleStatus};
use crate::error::{CadenceError, Result};

pub const SCHEDULES_DIR: &str = "schedules";
pub const INDEX_FILE: &str = "index.json";

/// Schedule files written concurrently per `save_many` chunk.
const WRITE_CONCURRENCY: usize = 16;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

pub struct FileScheduleStore {
    base_path: PathBuf,
    index: RwLock<ScheduleIndex>,
    /// Serializes index snapshot writes
    snapshot_lock: Mutex<()>,
    tmp_counter: AtomicU64,
}

impl FileScheduleStore {
    /// Open (or create) a store rooted at `base_path`.
    ///
    /// Loads the index snapshot, or rebuilds it from the schedule files when
    /// it is missing or unreadable.
    pub async fn open(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(base_path.join(SCHEDULES_DIR)).await?;

        let store = Self {
            base_path,
            index: RwLock::new(ScheduleIndex::new(Utc::now())),
            snapshot_lock: Mutex::new(()),
            tmp_counter: AtomicU64::new(0),
        };

        match store.load_snapshot().await? {
            Some(index) => {
                debug!("Loaded index snapshot: {} schedules, version {}", index.len(), index.version);
                *store.index.write().await = index;
            }
            None => {
                store.rebuild_index().await?;
            }
        }

        Ok(store)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn index_path(&self) -> PathBuf {
        self.base_path.join(INDEX_FILE)
    }

    /// Path of a schedule file relative to the base directory.
    fn relative_path(id: &str) -> PathBuf {
        let prefix = id.get(..2).unwrap_or(id);
        PathBuf::from(SCHEDULES_DIR).join(prefix).join(format!("{}.json", id))
    }

    async fn load_snapshot(&self) -> Result<Option<ScheduleIndex>> {
        let path = self.index_path();
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No index snapshot at {}, rebuilding", path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&content) {
            Ok(index) => Ok(Some(index)),
            Err(e) => {
                warn!("Index snapshot {} is unreadable ({}), rebuilding", path.display(), e);
                Ok(None)
            }
        }
    }

    /// Re-derive the whole index from the schedule files and persist it.
    ///
    /// Unparsable files are skipped with a warning. Returns the number of
    /// schedules indexed.
    pub async fn rebuild_index(&self) -> Result<usize> {
        let now = Utc::now();
        let mut rebuilt = ScheduleIndex::new(now);
        let mut skipped = 0;

        let root = self.base_path.join(SCHEDULES_DIR);
        let mut prefixes = fs::read_dir(&root).await?;
        while let Some(prefix) = prefixes.next_entry().await? {
            if !prefix.file_type().await?.is_dir() {
                continue;
            }
            let mut files = fs::read_dir(prefix.path()).await?;
            while let Some(file) = files.next_entry().await? {
                let path = file.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                match self.read_schedule(&path).await? {
                    Some(schedule) => {
                        let relative = path
                            .strip_prefix(&self.base_path)
                            .map_err(|e| CadenceError::Storage(e.to_string()))?
                            .to_path_buf();
                        rebuilt.upsert(&schedule, relative, now);
                    }
                    None => skipped += 1,
                }
            }
        }

        let count = rebuilt.len();
        *self.index.write().await = rebuilt;
        self.persist_index().await?;

        info!("Rebuilt index: {} schedules indexed, {} files skipped", count, skipped);
        Ok(count)
    }

    /// Read one schedule file. Missing or unparsable files yield `None`.
    async fn read_schedule(&self, path: &Path) -> Result<Option<ReviewSchedule>> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<ReviewSchedule>(&content) {
            Ok(schedule) => Ok(Some(schedule)),
            Err(e) => {
                warn!("Skipping unreadable schedule file {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    /// Write `bytes` to a temp file next to `path`, then rename it into place.
    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .ok_or_else(|| CadenceError::Storage(format!("Invalid target path: {}", path.display())))?;
        let tmp_path = path.with_file_name(format!("{}.{}.{}.tmp", file_name, std::process::id(), n));

        fs::write(&tmp_path, bytes).await?;
        if let Err(e) = fs::rename(&tmp_path, path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn write_schedule(&self, schedule: &ReviewSchedule) -> Result<PathBuf> {
        let relative = Self::relative_path(&schedule.id);
        let json = serde_json::to_vec_pretty(schedule)?;
        self.write_atomic(&self.base_path.join(&relative), &json).await?;
        debug!("Wrote schedule {} ({})", schedule.id, schedule.status);
        Ok(relative)
    }

    /// Serialize the current index and write the snapshot.
    async fn persist_index(&self) -> Result<()> {
        let _guard = self.snapshot_lock.lock().await;
        let json = {
            let mut index = self.index.write().await;
            index.rebucket_overdue(Utc::now());
            serde_json::to_vec_pretty(&*index)?
        };
        self.write_atomic(&self.index_path(), &json).await
    }

    /// Load the schedules for the given index rows, in order.
    ///
    /// Rows whose file is gone or unparsable are purged from the index and
    /// the snapshot is persisted once.
    async fn load_entries(&self, rows: Vec<(String, PathBuf)>) -> Result<Vec<ReviewSchedule>> {
        let mut loaded = Vec::with_capacity(rows.len());
        let mut stale = Vec::new();

        for (id, relative) in rows {
            match self.read_schedule(&self.base_path.join(&relative)).await? {
                Some(schedule) => loaded.push(schedule),
                None => stale.push(id),
            }
        }

        if !stale.is_empty() {
            {
                let mut index = self.index.write().await;
                let now = Utc::now();
                for id in &stale {
                    index.remove(id, now);
                }
            }
            warn!("Purged {} stale index entries", stale.len());
            self.persist_index().await?;
        }

        Ok(loaded)
    }

    async fn load_ids(&self, ids: &[String]) -> Result<Vec<ReviewSchedule>> {
        let rows = {
            let index = self.index.read().await;
            ids.iter()
                .filter_map(|id| index.entry(id).map(|e| (id.clone(), e.path.clone())))
                .collect()
        };
        self.load_entries(rows).await
    }
}

fn rows_of<'a>(entries: impl Iterator<Item = (&'a String, &'a IndexEntry)>) -> Vec<(String, PathBuf)> {
    entries.map(|(id, e)| (id.clone(), e.path.clone())).collect()
}

#[async_trait]
impl ScheduleStore for FileScheduleStore {
    async fn save(&self, schedule: &ReviewSchedule) -> Result<()> {
        let relative = self.write_schedule(schedule).await?;
        self.index.write().await.upsert(schedule, relative, Utc::now());
        self.persist_index().await
    }

    async fn save_many(&self, schedules: &[ReviewSchedule]) -> Result<()> {
        if schedules.is_empty() {
            return Ok(());
        }

        let mut outcome = Ok(());
        for chunk in schedules.chunks(WRITE_CONCURRENCY) {
            match try_join_all(chunk.iter().map(|s| self.write_schedule(s))).await {
                Ok(paths) => {
                    let mut index = self.index.write().await;
                    let now = Utc::now();
                    for (schedule, relative) in chunk.iter().zip(paths) {
                        index.upsert(schedule, relative, now);
                    }
                }
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }

        // Whatever was written stays indexed, even when a later chunk failed
        self.persist_index().await?;
        outcome
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ReviewSchedule>> {
        let found = self.load_ids(&[id.to_string()]).await?;
        Ok(found.into_iter().next())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let Some(relative) = self.index.read().await.entry(id).map(|e| e.path.clone()) else {
            return Ok(false);
        };

        match fs::remove_file(self.base_path.join(&relative)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.index.write().await.remove(id, Utc::now());
        self.persist_index().await?;
        debug!("Deleted schedule {}", id);
        Ok(true)
    }

    async fn list_all(&self) -> Result<Vec<ReviewSchedule>> {
        // due_queue order keeps listings stable
        let rows = {
            let index = self.index.read().await;
            rows_of(index.due_queue.iter().filter_map(|(_, id)| index.entries.get_key_value(id)))
        };
        self.load_entries(rows).await
    }

    async fn find_due_reviews(&self, query: &DueQuery) -> Result<Vec<ReviewSchedule>> {
        let rows = {
            let index = self.index.read().await;
            let mut candidates: Vec<(&String, &IndexEntry)> = index
                .due_entries(query.as_of)
                .filter(|(_, e)| e.status != ScheduleStatus::Suspended)
                .filter(|(_, e)| query.statuses.as_ref().is_none_or(|s| s.contains(&e.status)))
                .filter(|(_, e)| query.concept_ids.as_ref().is_none_or(|c| c.contains(&e.concept_id)))
                .filter(|(_, e)| {
                    query
                        .folder_ids
                        .as_ref()
                        .is_none_or(|f| e.folder_id.as_ref().is_some_and(|folder| f.contains(folder)))
                })
                .filter(|(_, e)| {
                    let days = (query.as_of - e.next_review_date).num_milliseconds().div_euclid(MILLIS_PER_DAY);
                    (query.include_overdue || days < 1) && query.max_overdue_days.is_none_or(|max| days <= max)
                })
                .collect();

            candidates.sort_by(|(a_id, a), (b_id, b)| {
                due_order(
                    (a.status, a.next_review_date, a_id.as_str()),
                    (b.status, b.next_review_date, b_id.as_str()),
                )
            });
            candidates.truncate(query.limit);
            rows_of(candidates.into_iter())
        };
        self.load_entries(rows).await
    }

    async fn find_by_query(&self, query: &ScheduleQuery) -> Result<Vec<ReviewSchedule>> {
        let rows = rows_of(self.index.read().await.query(query).into_iter());
        self.load_entries(rows).await
    }

    async fn find_by_status(&self, status: ScheduleStatus, limit: Option<usize>) -> Result<Vec<ReviewSchedule>> {
        let mut ids = self.index.read().await.ids_with_status(status);
        if let Some(limit) = limit {
            ids.truncate(limit);
        }
        self.load_ids(&ids).await
    }

    async fn find_overdue(
        &self,
        days_overdue: i64,
        limit: Option<usize>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReviewSchedule>> {
        let mut ids = self.index.read().await.overdue_ids(days_overdue, now);
        if let Some(limit) = limit {
            ids.truncate(limit);
        }
        self.load_ids(&ids).await
    }

    async fn find_by_folder(&self, folder_id: &str) -> Result<Vec<ReviewSchedule>> {
        let ids = self.index.read().await.ids_in_folder(folder_id);
        self.load_ids(&ids).await
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.index.read().await.len())
    }

    async fn count_due_reviews(&self, now: DateTime<Utc>) -> Result<usize> {
        Ok(self
            .index
            .read()
            .await
            .due_entries(now)
            .filter(|(_, e)| e.status != ScheduleStatus::Suspended)
            .count())
    }

    async fn count_by_status(&self) -> Result<StatusCounts> {
        Ok(self.index.read().await.status_counts())
    }

    async fn get_statistics(&self, now: DateTime<Utc>) -> Result<ScheduleStatistics> {
        Ok(self.index.read().await.statistics(now))
    }

    async fn get_review_calendar(&self, days: u32, now: DateTime<Utc>) -> Result<Vec<CalendarDay>> {
        Ok(review_calendar(self.index.read().await.due_rows(), days, now))
    }

    async fn estimate_daily_workload(&self, days: u32, now: DateTime<Utc>) -> Result<Vec<DailyWorkload>> {
        Ok(daily_workload(self.index.read().await.due_rows(), days, now))
    }

    async fn get_schedules_for_date(&self, date: NaiveDate) -> Result<Vec<ReviewSchedule>> {
        let start = date.and_time(NaiveTime::MIN).and_utc();
        let end = start.checked_add_signed(Duration::days(1)).unwrap_or(DateTime::<Utc>::MAX_UTC);
        let rows = rows_of(
            self.index
                .read()
                .await
                .entries_between(start, end)
                .filter(|(_, e)| e.status != ScheduleStatus::Suspended),
        );
        self.load_entries(rows).await
    }

    async fn suspend_by_folder(&self, folder_id: &str) -> Result<usize> {
        let ids = self.index.read().await.ids_in_folder(folder_id);
        let changed: Vec<ReviewSchedule> = self
            .load_ids(&ids)
            .await?
            .into_iter()
            .filter(|s| s.status != ScheduleStatus::Suspended)
            .map(|mut s| {
                s.suspend();
                s
            })
            .collect();
        self.save_many(&changed).await?;
        Ok(changed.len())
    }

    async fn resume_by_folder(&self, folder_id: &str) -> Result<usize> {
        let ids = self.index.read().await.ids_in_folder(folder_id);
        let changed: Vec<ReviewSchedule> = self
            .load_ids(&ids)
            .await?
            .into_iter()
            .filter(|s| s.status == ScheduleStatus::Suspended)
            .map(|mut s| {
                s.resume();
                s
            })
            .collect();
        self.save_many(&changed).await?;
        Ok(changed.len())
    }

    async fn cleanup_orphaned(&self, valid_concept_ids: &HashSet<String>) -> Result<usize> {
        let orphans = rows_of(
            self.index
                .read()
                .await
                .entries
                .iter()
                .filter(|(_, e)| !valid_concept_ids.contains(&e.concept_id)),
        );
        if orphans.is_empty() {
            return Ok(0);
        }

        let mut removed = 0;
        let mut outcome: Result<()> = Ok(());
        for (id, relative) in &orphans {
            match fs::remove_file(self.base_path.join(relative)).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    outcome = Err(e.into());
                    break;
                }
            }
            self.index.write().await.remove(id, Utc::now());
            removed += 1;
        }

        self.persist_index().await?;
        info!("Removed {} orphaned schedules", removed);
        outcome.map(|()| removed)
    }

    async fn ease_distribution(&self) -> Result<Vec<DistributionBucket>> {
        Ok(self.index.read().await.ease_distribution())
    }

    async fn interval_distribution(&self) -> Result<Vec<DistributionBucket>> {
        Ok(self.index.read().await.interval_distribution())
    }
}

//! Schedule store contract plus its query and report types.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::analytics;
use crate::domain::{ReviewSchedule, ScheduleRecord, ScheduleStatus};
use crate::error::Result;
use crate::id::schedule_id_for;

/// Default page size for due-review queries.
pub const DEFAULT_DUE_LIMIT: usize = 20;

/// Query for schedules that are due for review.
#[derive(Debug, Clone, PartialEq)]
pub struct DueQuery {
    /// Maximum number of schedules returned
    pub limit: usize,
    /// Only these concepts
    pub concept_ids: Option<Vec<String>>,
    /// Only schedules in these folders
    pub folder_ids: Option<Vec<String>>,
    /// Only these statuses (SUSPENDED is never returned)
    pub statuses: Option<Vec<ScheduleStatus>>,
    /// Include schedules at least one full day overdue
    pub include_overdue: bool,
    /// Skip schedules more than this many days overdue
    pub max_overdue_days: Option<i64>,
    /// Point in time the query is evaluated at
    pub as_of: DateTime<Utc>,
}

impl DueQuery {
    pub fn new(as_of: DateTime<Utc>) -> Self {
        Self {
            limit: DEFAULT_DUE_LIMIT,
            concept_ids: None,
            folder_ids: None,
            statuses: None,
            include_overdue: true,
            max_overdue_days: None,
            as_of,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_concepts(mut self, concept_ids: Vec<String>) -> Self {
        self.concept_ids = Some(concept_ids);
        self
    }

    pub fn with_folders(mut self, folder_ids: Vec<String>) -> Self {
        self.folder_ids = Some(folder_ids);
        self
    }

    pub fn with_statuses(mut self, statuses: Vec<ScheduleStatus>) -> Self {
        self.statuses = Some(statuses);
        self
    }

    pub fn excluding_overdue(mut self) -> Self {
        self.include_overdue = false;
        self
    }

    pub fn with_max_overdue_days(mut self, days: i64) -> Self {
        self.max_overdue_days = Some(days);
        self
    }
}

/// General filter with pagination.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleQuery {
    pub status: Option<ScheduleStatus>,
    pub min_repetitions: Option<u32>,
    pub max_repetitions: Option<u32>,
    pub min_interval: Option<u32>,
    pub max_interval: Option<u32>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl ScheduleQuery {
    /// Check the non-paging filters against a schedule.
    pub fn matches(&self, schedule: &ReviewSchedule) -> bool {
        self.accepts(
            schedule.status,
            schedule.parameters.repetitions(),
            schedule.parameters.interval(),
        )
    }

    /// Check the non-paging filters against bare values.
    pub fn accepts(&self, status: ScheduleStatus, reps: u32, interval: u32) -> bool {
        self.status.is_none_or(|s| s == status)
            && self.min_repetitions.is_none_or(|min| reps >= min)
            && self.max_repetitions.is_none_or(|max| reps <= max)
            && self.min_interval.is_none_or(|min| interval >= min)
            && self.max_interval.is_none_or(|max| interval <= max)
    }
}

/// Per-status counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub new: usize,
    pub learning: usize,
    pub reviewing: usize,
    pub mature: usize,
    pub suspended: usize,
    pub leech: usize,
}

impl StatusCounts {
    pub fn add(&mut self, status: ScheduleStatus, n: usize) {
        match status {
            ScheduleStatus::New => self.new += n,
            ScheduleStatus::Learning => self.learning += n,
            ScheduleStatus::Reviewing => self.reviewing += n,
            ScheduleStatus::Mature => self.mature += n,
            ScheduleStatus::Suspended => self.suspended += n,
            ScheduleStatus::Leech => self.leech += n,
        }
    }

    pub fn get(&self, status: ScheduleStatus) -> usize {
        match status {
            ScheduleStatus::New => self.new,
            ScheduleStatus::Learning => self.learning,
            ScheduleStatus::Reviewing => self.reviewing,
            ScheduleStatus::Mature => self.mature,
            ScheduleStatus::Suspended => self.suspended,
            ScheduleStatus::Leech => self.leech,
        }
    }

    pub fn total(&self) -> usize {
        self.new + self.learning + self.reviewing + self.mature + self.suspended + self.leech
    }
}

/// Aggregate numbers over every schedule in the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleStatistics {
    pub total_schedules: usize,
    pub by_status: StatusCounts,
    pub due_count: usize,
    pub overdue_count: usize,
    pub average_ease: f64,
    pub average_interval: f64,
}

/// Forward-looking counts for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub due: usize,
    pub new: usize,
    pub learning: usize,
    pub reviewing: usize,
    pub mature: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyWorkload {
    pub date: NaiveDate,
    pub reviews: usize,
}

/// One bar of a histogram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionBucket {
    pub label: String,
    pub count: usize,
}

/// A concept ranked by how badly it is going.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblematicConcept {
    pub schedule_id: String,
    pub concept_id: String,
    pub status: ScheduleStatus,
    pub easiness_factor: f64,
    pub consecutive_incorrect: u32,
    pub severity: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportFailure {
    /// Position of the record in the imported batch
    pub position: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub imported: usize,
    pub failures: Vec<ImportFailure>,
}

/// Persistence and query contract for review schedules.
///
/// Implementations own their indexes; callers never see storage layout.
/// Methods with a default body are expressed through the primitives and
/// may be overridden when an index answers them faster.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    //=== CRUD ===

    /// Insert or replace a schedule.
    async fn save(&self, schedule: &ReviewSchedule) -> Result<()>;

    /// Save several schedules. Not transactional: each record write is atomic on its own.
    async fn save_many(&self, schedules: &[ReviewSchedule]) -> Result<()>;

    async fn find_by_id(&self, id: &str) -> Result<Option<ReviewSchedule>>;

    async fn find_by_concept_id(&self, concept_id: &str) -> Result<Option<ReviewSchedule>> {
        self.find_by_id(&schedule_id_for(concept_id)).await
    }

    async fn exists(&self, concept_id: &str) -> Result<bool> {
        Ok(self.find_by_concept_id(concept_id).await?.is_some())
    }

    /// Delete a schedule. Returns false (and does nothing) when absent.
    async fn delete(&self, id: &str) -> Result<bool>;

    async fn delete_by_concept_id(&self, concept_id: &str) -> Result<bool> {
        self.delete(&schedule_id_for(concept_id)).await
    }

    async fn list_all(&self) -> Result<Vec<ReviewSchedule>>;

    //=== Queries ===

    /// Due schedules, LEARNING first, then oldest next-review date first.
    async fn find_due_reviews(&self, query: &DueQuery) -> Result<Vec<ReviewSchedule>>;

    async fn find_by_query(&self, query: &ScheduleQuery) -> Result<Vec<ReviewSchedule>>;

    async fn find_by_status(&self, status: ScheduleStatus, limit: Option<usize>) -> Result<Vec<ReviewSchedule>>;

    /// Schedules at least `days_overdue` whole days past their review date.
    async fn find_overdue(
        &self,
        days_overdue: i64,
        limit: Option<usize>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReviewSchedule>>;

    /// Schedules in a folder, earliest next review first.
    async fn find_by_folder(&self, folder_id: &str) -> Result<Vec<ReviewSchedule>>;

    /// Non-suspended schedules with no review in `days_since_last_review` days.
    async fn find_abandoned(&self, days_since_last_review: i64, now: DateTime<Utc>) -> Result<Vec<ReviewSchedule>> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .filter(|s| s.is_abandoned(days_since_last_review, now))
            .collect())
    }

    async fn find_leeches(&self, limit: Option<usize>) -> Result<Vec<ReviewSchedule>> {
        self.find_by_status(ScheduleStatus::Leech, limit).await
    }

    async fn find_mature(&self, limit: Option<usize>) -> Result<Vec<ReviewSchedule>> {
        self.find_by_status(ScheduleStatus::Mature, limit).await
    }

    //=== Aggregation ===

    async fn count(&self) -> Result<usize>;

    async fn count_due_reviews(&self, now: DateTime<Utc>) -> Result<usize>;

    async fn count_by_status(&self) -> Result<StatusCounts>;

    async fn get_statistics(&self, now: DateTime<Utc>) -> Result<ScheduleStatistics> {
        Ok(analytics::statistics(&self.list_all().await?, now))
    }

    //=== Planning ===

    async fn get_review_calendar(&self, days: u32, now: DateTime<Utc>) -> Result<Vec<CalendarDay>> {
        let schedules = self.list_all().await?;
        Ok(analytics::review_calendar(analytics::due_rows(&schedules), days, now))
    }

    /// Non-suspended schedules whose next review falls on `date` (UTC).
    async fn get_schedules_for_date(&self, date: NaiveDate) -> Result<Vec<ReviewSchedule>>;

    async fn estimate_daily_workload(&self, days: u32, now: DateTime<Utc>) -> Result<Vec<DailyWorkload>> {
        let schedules = self.list_all().await?;
        Ok(analytics::daily_workload(analytics::due_rows(&schedules), days, now))
    }

    //=== Maintenance ===

    /// Returns false when the concept has no schedule.
    async fn suspend_by_concept_id(&self, concept_id: &str) -> Result<bool> {
        match self.find_by_concept_id(concept_id).await? {
            Some(mut schedule) => {
                schedule.suspend();
                self.save(&schedule).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Returns false when the concept has no schedule.
    async fn resume_by_concept_id(&self, concept_id: &str) -> Result<bool> {
        match self.find_by_concept_id(concept_id).await? {
            Some(mut schedule) => {
                schedule.resume();
                self.save(&schedule).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn suspend_by_folder(&self, folder_id: &str) -> Result<usize>;

    async fn resume_by_folder(&self, folder_id: &str) -> Result<usize>;

    /// Replace schedules with no review in `days_since_last_review` days by
    /// fresh ones. Suspended schedules are left alone.
    async fn reset_abandoned(&self, days_since_last_review: i64, now: DateTime<Utc>) -> Result<usize> {
        let stale: Vec<ReviewSchedule> = self
            .find_abandoned(days_since_last_review, now)
            .await?
            .into_iter()
            .map(|s| ReviewSchedule::new(&s.concept_id, now).map(|fresh| fresh.in_folder(s.folder_id.clone())))
            .collect::<Result<_>>()?;
        self.save_many(&stale).await?;
        Ok(stale.len())
    }

    /// Delete every schedule whose concept is not in `valid_concept_ids`.
    async fn cleanup_orphaned(&self, valid_concept_ids: &HashSet<String>) -> Result<usize>;

    /// Create schedules for the concepts that have none; returns the created ones.
    async fn create_initial_schedules(
        &self,
        concept_ids: &[String],
        folder_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReviewSchedule>> {
        let mut created = Vec::new();
        let mut seen = HashSet::new();
        for concept_id in concept_ids {
            if !seen.insert(concept_id.as_str()) || self.exists(concept_id).await? {
                continue;
            }
            created.push(ReviewSchedule::new(concept_id, now)?.in_folder(folder_id.map(str::to_string)));
        }
        self.save_many(&created).await?;
        Ok(created)
    }

    //=== Backup ===

    async fn export_schedules(&self, concept_ids: Option<&[String]>) -> Result<Vec<ScheduleRecord>> {
        let schedules = match concept_ids {
            Some(ids) => {
                let mut found = Vec::new();
                for concept_id in ids {
                    if let Some(schedule) = self.find_by_concept_id(concept_id).await? {
                        found.push(schedule);
                    }
                }
                found
            }
            None => self.list_all().await?,
        };
        Ok(schedules.iter().map(ReviewSchedule::to_plain).collect())
    }

    /// Validate and write each record on its own. Invalid records are reported
    /// and skipped; I/O failures abort the import.
    async fn import_schedules(&self, records: Vec<ScheduleRecord>) -> Result<ImportReport> {
        let mut report = ImportReport::default();
        for (position, record) in records.into_iter().enumerate() {
            match ReviewSchedule::from_plain(record) {
                Ok(schedule) => {
                    self.save(&schedule).await?;
                    report.imported += 1;
                }
                Err(e) => report.failures.push(ImportFailure {
                    position,
                    message: e.to_string(),
                }),
            }
        }
        Ok(report)
    }

    //=== Analytics ===

    async fn ease_distribution(&self) -> Result<Vec<DistributionBucket>>;

    async fn interval_distribution(&self) -> Result<Vec<DistributionBucket>>;

    async fn find_problematic_concepts(&self, limit: usize) -> Result<Vec<ProblematicConcept>> {
        Ok(analytics::problematic_concepts(&self.list_all().await?, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SchedulingParameters;
    use chrono::TimeZone;

    fn schedule(reps: u32, interval: u32) -> ReviewSchedule {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        ReviewSchedule::new("query-target", now)
            .unwrap()
            .with_updated_parameters(SchedulingParameters::new(reps, 2.5, interval).unwrap())
    }

    #[test]
    fn test_schedule_query_matches_ranges() {
        let s = schedule(4, 30);

        assert!(ScheduleQuery::default().matches(&s));
        assert!(
            ScheduleQuery {
                min_repetitions: Some(4),
                max_interval: Some(30),
                ..Default::default()
            }
            .matches(&s)
        );
        assert!(
            !ScheduleQuery {
                min_interval: Some(31),
                ..Default::default()
            }
            .matches(&s)
        );
        assert!(
            !ScheduleQuery {
                status: Some(ScheduleStatus::Reviewing),
                ..Default::default()
            }
            .matches(&s)
        );
    }

    #[test]
    fn test_status_counts() {
        let mut counts = StatusCounts::default();
        counts.add(ScheduleStatus::New, 2);
        counts.add(ScheduleStatus::Leech, 1);
        assert_eq!(counts.get(ScheduleStatus::New), 2);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_due_query_builder() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let query = DueQuery::new(now)
            .with_limit(5)
            .with_folders(vec!["f".to_string()])
            .excluding_overdue()
            .with_max_overdue_days(3);

        assert_eq!(query.limit, 5);
        assert!(!query.include_overdue);
        assert_eq!(query.max_overdue_days, Some(3));
        assert_eq!(query.folder_ids.as_deref(), Some(&["f".to_string()][..]));
    }
}

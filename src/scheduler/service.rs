//! SchedulerService: the orchestration layer over a ScheduleStore.
//!
//! Every read-modify-write runs under the locks of the concepts it touches,
//! so a review, a folder suspension and an import of the same concept are
//! applied one after another instead of overwriting each other.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::locks::ConceptLocks;
use super::plan::{
    BulkScheduleRequest, BulkScheduleResult, DueReviewOptions, ForecastDay, InitialParameters, ReviewOutcome,
    ReviewPlan, SystemHealth, estimated_minutes,
};
use crate::domain::{ReviewSchedule, ScheduleRecord, ScheduleStatus, SchedulingParameters};
use crate::engine::{Quality, TransitionConfig};
use crate::error::{CadenceError, Result};
use crate::id::round2;
use crate::storage::{DueQuery, ImportReport, ProblematicConcept, ScheduleStatistics, ScheduleStore};

/// Scheduler tuning, including the transition knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Not read from the `scheduler` section; filled from `algorithm`
    #[serde(skip)]
    pub transition: TransitionConfig,

    /// Schedules created per write burst in bulk scheduling
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    #[serde(rename = "seconds-per-review")]
    pub seconds_per_review: u64,

    /// Days covered by the review plan forecast
    #[serde(rename = "forecast-days")]
    pub forecast_days: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            transition: TransitionConfig::default(),
            batch_size: 50,
            seconds_per_review: 15,
            forecast_days: 7,
        }
    }
}

impl SchedulerConfig {
    pub fn with_transition(mut self, transition: TransitionConfig) -> Self {
        self.transition = transition;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

pub struct SchedulerService<S: ScheduleStore> {
    store: Arc<S>,
    config: SchedulerConfig,
    locks: ConceptLocks,
}

impl<S: ScheduleStore> SchedulerService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, SchedulerConfig::default())
    }

    pub fn with_config(store: Arc<S>, config: SchedulerConfig) -> Self {
        Self {
            store,
            config,
            locks: ConceptLocks::new(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    //=== Scheduling ===

    /// Return the concept's schedule, creating it if needed.
    ///
    /// `initial` and `folder_id` only apply when a schedule is created.
    pub async fn schedule_for_review(
        &self,
        concept_id: &str,
        initial: Option<InitialParameters>,
        folder_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ReviewSchedule> {
        require_concept_id(concept_id)?;
        let _guard = self.locks.lock(concept_id).await;

        if let Some(existing) = self.store.find_by_concept_id(concept_id).await? {
            return Ok(existing);
        }

        let parameters = match initial {
            Some(p) => SchedulingParameters::initial_with(p.easiness_factor, p.interval)?,
            None => SchedulingParameters::initial(),
        };
        let schedule =
            ReviewSchedule::with_parameters(concept_id, parameters, now)?.in_folder(folder_id.map(str::to_string));
        self.store.save(&schedule).await?;

        debug!("Scheduled concept {} as {}", concept_id, schedule.id);
        Ok(schedule)
    }

    /// Apply one answer to a scheduled concept and persist the result.
    pub async fn process_review(&self, concept_id: &str, quality: Quality, now: DateTime<Utc>) -> Result<ReviewOutcome> {
        require_concept_id(concept_id)?;
        let _guard = self.locks.lock(concept_id).await;

        let mut schedule = self
            .store
            .find_by_concept_id(concept_id)
            .await?
            .ok_or_else(|| CadenceError::NotScheduled(concept_id.to_string()))?;

        let previous_status = schedule.status;
        let interval_before = schedule.parameters.interval();
        let ease_before = schedule.parameters.easiness_factor();

        let transition = schedule.record_review(quality, &self.config.transition, now)?;
        self.store.save(&schedule).await?;

        let interval_after = schedule.parameters.interval();
        let ease_after = schedule.parameters.easiness_factor();
        debug!(
            "Reviewed {} ({}): interval {} -> {}, status {} -> {}",
            concept_id, quality, interval_before, interval_after, previous_status, schedule.status
        );

        Ok(ReviewOutcome {
            next_review_date: schedule.timing.next_review_date,
            status_changed: previous_status != schedule.status,
            previous_status,
            interval_before,
            interval_after,
            interval_delta: i64::from(interval_after) - i64::from(interval_before),
            ease_before,
            ease_after,
            ease_delta: round2(ease_after - ease_before),
            graduated: transition.graduated,
            reset_to_learning: transition.reset_to_learning,
            schedule,
        })
    }

    /// Due schedules, LEARNING first, oldest first; hardest first when asked.
    pub async fn get_due_reviews(&self, options: &DueReviewOptions) -> Result<Vec<ReviewSchedule>> {
        let mut query = DueQuery::new(options.as_of).with_limit(options.limit);
        if let Some(folder_id) = &options.folder_id {
            query = query.with_folders(vec![folder_id.clone()]);
        }
        if let Some(statuses) = &options.statuses {
            query = query.with_statuses(statuses.clone());
        }

        let mut due = self.store.find_due_reviews(&query).await?;
        if options.prioritize_difficult {
            due.sort_by(|a, b| a.parameters.easiness_factor().total_cmp(&b.parameters.easiness_factor()));
        }
        Ok(due)
    }

    /// Schedule many concepts, writing new schedules in batches.
    ///
    /// With `skip_existing` false every listed concept gets a fresh schedule,
    /// replacing any it had.
    pub async fn bulk_schedule(&self, request: &BulkScheduleRequest, now: DateTime<Utc>) -> Result<BulkScheduleResult> {
        if request.concept_ids.is_empty() {
            return Err(CadenceError::InvalidInput("concept id batch must not be empty".to_string()));
        }
        let batch_size = request.batch_size.unwrap_or(self.config.batch_size);
        if batch_size == 0 {
            return Err(CadenceError::InvalidInput("batch size must be positive".to_string()));
        }

        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for concept_id in &request.concept_ids {
            require_concept_id(concept_id)?;
            if seen.insert(concept_id.as_str()) {
                unique.push(concept_id.as_str());
            }
        }
        let _guards = self.locks.lock_many(&unique).await;

        let mut result = BulkScheduleResult::default();
        let mut to_create = Vec::new();
        for concept_id in unique {
            if request.skip_existing
                && let Some(existing) = self.store.find_by_concept_id(concept_id).await?
            {
                result.existing.push(existing);
                continue;
            }
            to_create.push(concept_id);
        }

        for batch in to_create.chunks(batch_size) {
            let schedules = batch
                .iter()
                .map(|c| ReviewSchedule::new(c, now).map(|s| s.in_folder(request.folder_id.clone())))
                .collect::<Result<Vec<_>>>()?;
            self.store.save_many(&schedules).await?;
            result.created.extend(schedules);
        }

        info!(
            "Bulk scheduled {} concepts ({} created, {} already scheduled)",
            result.total(),
            result.created.len(),
            result.existing.len()
        );
        Ok(result)
    }

    //=== Reporting ===

    pub async fn get_statistics(&self, now: DateTime<Utc>) -> Result<ScheduleStatistics> {
        self.store.get_statistics(now).await
    }

    /// Current backlog plus a forward projection of daily load.
    pub async fn get_review_plan(&self, now: DateTime<Utc>) -> Result<ReviewPlan> {
        let stats = self.store.get_statistics(now).await?;
        let forecast: Vec<ForecastDay> = self
            .store
            .estimate_daily_workload(self.config.forecast_days, now)
            .await?
            .into_iter()
            .map(|day| ForecastDay {
                date: day.date,
                due: day.reviews,
                estimated_minutes: estimated_minutes(day.reviews, self.config.seconds_per_review),
            })
            .collect();

        Ok(ReviewPlan {
            due_count: stats.due_count,
            overdue_count: stats.overdue_count,
            status_breakdown: stats.by_status,
            total_estimated_minutes: forecast.iter().map(|d| d.estimated_minutes).sum(),
            forecast,
        })
    }

    pub async fn get_system_health(&self, now: DateTime<Utc>) -> Result<SystemHealth> {
        let stats = self.store.get_statistics(now).await?;
        let overdue_percentage = if stats.total_schedules == 0 {
            0.0
        } else {
            round2(stats.overdue_count as f64 / stats.total_schedules as f64 * 100.0)
        };

        Ok(SystemHealth {
            total_concepts: stats.total_schedules,
            average_ease: stats.average_ease,
            average_interval: stats.average_interval,
            status_breakdown: stats.by_status,
            overdue_percentage,
        })
    }

    pub async fn problematic_concepts(&self, limit: usize) -> Result<Vec<ProblematicConcept>> {
        if limit == 0 {
            return Err(CadenceError::InvalidInput("limit must be positive".to_string()));
        }
        self.store.find_problematic_concepts(limit).await
    }

    //=== Maintenance ===

    /// Returns false when the concept has no schedule.
    pub async fn suspend(&self, concept_id: &str) -> Result<bool> {
        require_concept_id(concept_id)?;
        let _guard = self.locks.lock(concept_id).await;
        self.store.suspend_by_concept_id(concept_id).await
    }

    /// Returns false when the concept has no schedule.
    pub async fn resume(&self, concept_id: &str) -> Result<bool> {
        require_concept_id(concept_id)?;
        let _guard = self.locks.lock(concept_id).await;
        self.store.resume_by_concept_id(concept_id).await
    }

    /// Suspend every schedule in the folder. Returns how many changed.
    pub async fn suspend_folder(&self, folder_id: &str) -> Result<usize> {
        require_folder_id(folder_id)?;
        let members = concept_ids_of(self.store.find_by_folder(folder_id).await?);
        let changed = self
            .update_locked(members, |mut schedule| {
                if schedule.folder_id.as_deref() != Some(folder_id) || schedule.status == ScheduleStatus::Suspended {
                    return Ok(None);
                }
                schedule.suspend();
                Ok(Some(schedule))
            })
            .await?;
        debug!("Suspended {} schedules in folder {}", changed.len(), folder_id);
        Ok(changed.len())
    }

    /// Resume every suspended schedule in the folder. Returns how many changed.
    pub async fn resume_folder(&self, folder_id: &str) -> Result<usize> {
        require_folder_id(folder_id)?;
        let members = concept_ids_of(self.store.find_by_folder(folder_id).await?);
        let changed = self
            .update_locked(members, |mut schedule| {
                if schedule.folder_id.as_deref() != Some(folder_id) || schedule.status != ScheduleStatus::Suspended {
                    return Ok(None);
                }
                schedule.resume();
                Ok(Some(schedule))
            })
            .await?;
        debug!("Resumed {} schedules in folder {}", changed.len(), folder_id);
        Ok(changed.len())
    }

    /// Delete the concept's schedule. Returns false when there was none.
    pub async fn unschedule(&self, concept_id: &str) -> Result<bool> {
        require_concept_id(concept_id)?;
        let _guard = self.locks.lock(concept_id).await;
        self.store.delete_by_concept_id(concept_id).await
    }

    /// Delete schedules for concepts outside `valid_concept_ids`.
    pub async fn cleanup_orphaned(&self, valid_concept_ids: &HashSet<String>) -> Result<usize> {
        if valid_concept_ids.is_empty() {
            return Err(CadenceError::InvalidInput(
                "valid concept id set must not be empty".to_string(),
            ));
        }
        self.store.cleanup_orphaned(valid_concept_ids).await
    }

    pub async fn reset_abandoned(&self, days_since_last_review: i64, now: DateTime<Utc>) -> Result<usize> {
        if days_since_last_review <= 0 {
            return Err(CadenceError::InvalidInput(format!(
                "days since last review must be positive, got {}",
                days_since_last_review
            )));
        }
        let stale = concept_ids_of(self.store.find_abandoned(days_since_last_review, now).await?);
        let reset = self
            .update_locked(stale, |schedule| {
                if !schedule.is_abandoned(days_since_last_review, now) {
                    return Ok(None);
                }
                ReviewSchedule::new(&schedule.concept_id, now).map(|fresh| Some(fresh.in_folder(schedule.folder_id)))
            })
            .await?
            .len();
        info!("Reset {} abandoned schedules", reset);
        Ok(reset)
    }

    //=== Backup ===

    pub async fn export(&self, concept_ids: Option<&[String]>) -> Result<Vec<ScheduleRecord>> {
        self.store.export_schedules(concept_ids).await
    }

    pub async fn import(&self, records: Vec<ScheduleRecord>) -> Result<ImportReport> {
        let _guards = self
            .locks
            .lock_many(records.iter().map(|r| r.concept_id.clone()))
            .await;
        let report = self.store.import_schedules(records).await?;
        info!(
            "Imported {} schedules, {} records rejected",
            report.imported,
            report.failures.len()
        );
        Ok(report)
    }

    /// Lock `concept_ids`, reload each, and save whatever `update` returns.
    /// Schedules deleted before the locks were taken are skipped.
    async fn update_locked<F>(&self, concept_ids: Vec<String>, mut update: F) -> Result<Vec<ReviewSchedule>>
    where
        F: FnMut(ReviewSchedule) -> Result<Option<ReviewSchedule>>,
    {
        let _guards = self.locks.lock_many(&concept_ids).await;
        let current = try_join_all(concept_ids.iter().map(|c| self.store.find_by_concept_id(c))).await?;

        let mut changed = Vec::new();
        for schedule in current.into_iter().flatten() {
            if let Some(updated) = update(schedule)? {
                changed.push(updated);
            }
        }
        self.store.save_many(&changed).await?;
        Ok(changed)
    }
}

fn concept_ids_of(schedules: Vec<ReviewSchedule>) -> Vec<String> {
    schedules.into_iter().map(|s| s.concept_id).collect()
}

fn require_concept_id(concept_id: &str) -> Result<()> {
    if concept_id.trim().is_empty() {
        return Err(CadenceError::InvalidInput("concept id must not be empty".to_string()));
    }
    Ok(())
}

fn require_folder_id(folder_id: &str) -> Result<()> {
    if folder_id.trim().is_empty() {
        return Err(CadenceError::InvalidInput("folder id must not be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FileScheduleStore;
    use chrono::Duration;
    use tempfile::TempDir;

    async fn create_test_service() -> (Arc<SchedulerService<FileScheduleStore>>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileScheduleStore::open(temp_dir.path()).await.unwrap();
        (Arc::new(SchedulerService::new(Arc::new(store))), temp_dir)
    }

    fn ids(concepts: &[&str]) -> Vec<String> {
        concepts.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn test_schedule_for_review_is_idempotent() {
        let (service, _temp) = create_test_service().await;
        let now = Utc::now();

        let first = service.schedule_for_review("monads", None, None, now).await.unwrap();
        let second = service
            .schedule_for_review("monads", None, None, now + Duration::days(1))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first, second);
        assert_eq!(service.store().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_schedule_with_custom_parameters() {
        let (service, _temp) = create_test_service().await;
        let initial = InitialParameters {
            easiness_factor: Some(2.1),
            interval: Some(3),
        };

        let schedule = service
            .schedule_for_review("functors", Some(initial), Some("haskell"), Utc::now())
            .await
            .unwrap();

        assert_eq!(schedule.parameters.easiness_factor(), 2.1);
        assert_eq!(schedule.parameters.interval(), 3);
        assert_eq!(schedule.folder_id.as_deref(), Some("haskell"));

        let invalid = InitialParameters {
            easiness_factor: Some(5.0),
            interval: None,
        };
        assert!(matches!(
            service.schedule_for_review("other", Some(invalid), None, Utc::now()).await,
            Err(CadenceError::InvalidParameters(_))
        ));
    }

    #[tokio::test]
    async fn test_process_review_reports_diff() {
        let (service, _temp) = create_test_service().await;
        let now = Utc::now();
        service.schedule_for_review("closures", None, None, now).await.unwrap();

        // First GOOD moves to the second learning step
        let step = service.process_review("closures", Quality::Good, now).await.unwrap();
        assert_eq!(step.previous_status, ScheduleStatus::New);
        assert!(!step.status_changed);
        assert!(!step.graduated);
        assert_eq!(step.next_review_date, now + Duration::minutes(10));

        let graduated = service.process_review("closures", Quality::Good, now).await.unwrap();
        assert!(graduated.status_changed);
        assert!(graduated.graduated);
        assert_eq!(graduated.schedule.status, ScheduleStatus::Learning);
        assert_eq!(graduated.interval_before, 1);
        assert_eq!(graduated.interval_after, 1);
        assert_eq!(graduated.interval_delta, 0);

        let reviewed = service.process_review("closures", Quality::Hard, now).await.unwrap();
        assert_eq!(reviewed.interval_after, 6);
        assert_eq!(reviewed.interval_delta, 5);
        assert_eq!(reviewed.ease_delta, -0.15);

        let stored = service.store().find_by_concept_id("closures").await.unwrap().unwrap();
        assert_eq!(stored, reviewed.schedule);
    }

    #[tokio::test]
    async fn test_process_review_requires_schedule() {
        let (service, _temp) = create_test_service().await;
        let err = service.process_review("ghost", Quality::Good, Utc::now()).await.unwrap_err();
        assert!(matches!(err, CadenceError::NotScheduled(ref c) if c == "ghost"));
        assert_eq!(service.store().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_reviews_of_one_concept_are_serialized() {
        let (service, _temp) = create_test_service().await;
        let now = Utc::now();
        service.schedule_for_review("shared", None, None, now).await.unwrap();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.process_review("shared", Quality::Good, now).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let schedule = service.store().find_by_concept_id("shared").await.unwrap().unwrap();
        assert_eq!(schedule.total_reviews, 10);
        assert_eq!(schedule.consecutive_correct, 10);
    }

    #[tokio::test]
    async fn test_folder_suspension_is_not_lost_to_concurrent_reviews() {
        let (service, _temp) = create_test_service().await;
        let now = Utc::now();
        let concepts: Vec<String> = (0..20).map(|i| format!("card-{}", i)).collect();
        let mut request = BulkScheduleRequest::new(concepts.clone());
        request.folder_id = Some("deck".to_string());
        service.bulk_schedule(&request, now).await.unwrap();

        let mut handles = Vec::new();
        for concept in concepts.clone() {
            let reviewer = Arc::clone(&service);
            let review_concept = concept.clone();
            handles.push(tokio::spawn(async move {
                reviewer.process_review(&review_concept, Quality::Good, now).await.map(|_| 0)
            }));
            if concept == "card-10" {
                let service = Arc::clone(&service);
                handles.push(tokio::spawn(async move { service.suspend_folder("deck").await }));
            }
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        for concept in &concepts {
            let schedule = service.store().find_by_concept_id(concept).await.unwrap().unwrap();
            assert_eq!(schedule.status, ScheduleStatus::Suspended, "{} lost its suspension", concept);
            assert_eq!(schedule.total_reviews, 1, "{} lost its review", concept);
        }
        assert_eq!(service.resume_folder("deck").await.unwrap(), 20);
        assert_eq!(service.suspend_folder("other").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reset_abandoned_keeps_recent_and_folder() {
        let (service, _temp) = create_test_service().await;
        let now = Utc::now();
        let mut request = BulkScheduleRequest::new(ids(&["stale", "recent"]));
        request.folder_id = Some("deck".to_string());
        service.bulk_schedule(&request, now - Duration::days(40)).await.unwrap();
        service.process_review("stale", Quality::Easy, now - Duration::days(35)).await.unwrap();
        service.process_review("recent", Quality::Easy, now - Duration::days(2)).await.unwrap();

        assert_eq!(service.reset_abandoned(30, now).await.unwrap(), 1);
        let stale = service.store().find_by_concept_id("stale").await.unwrap().unwrap();
        assert_eq!(stale.total_reviews, 0);
        assert_eq!(stale.status, ScheduleStatus::New);
        assert_eq!(stale.folder_id.as_deref(), Some("deck"));
        let recent = service.store().find_by_concept_id("recent").await.unwrap().unwrap();
        assert_eq!(recent.total_reviews, 1);

        assert_eq!(service.reset_abandoned(200_000_000_000, now).await.unwrap(), 0);
        assert_eq!(service.reset_abandoned(i64::MAX, now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_due_reviews_prioritize_difficult() {
        let (service, _temp) = create_test_service().await;
        let now = Utc::now();
        for (concept, ease) in [("easy", 2.9), ("hard", 1.4), ("medium", 2.0)] {
            let initial = InitialParameters {
                easiness_factor: Some(ease),
                interval: None,
            };
            service
                .schedule_for_review(concept, Some(initial), Some("deck"), now)
                .await
                .unwrap();
        }

        let options = DueReviewOptions::new(now).in_folder("deck").prioritizing_difficult();
        let due = service.get_due_reviews(&options).await.unwrap();
        let order: Vec<&str> = due.iter().map(|s| s.concept_id.as_str()).collect();
        assert_eq!(order, vec!["hard", "medium", "easy"]);

        let none = service
            .get_due_reviews(&DueReviewOptions::new(now).in_folder("elsewhere"))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_bulk_schedule_skips_existing() {
        let (service, _temp) = create_test_service().await;
        let now = Utc::now();
        service.schedule_for_review("b", None, None, now).await.unwrap();

        let mut request = BulkScheduleRequest::new(ids(&["a", "b", "c", "a", "d", "e"]));
        request.batch_size = Some(2);
        request.folder_id = Some("imported".to_string());
        let result = service.bulk_schedule(&request, now).await.unwrap();

        assert_eq!(result.created.len(), 4);
        assert_eq!(result.existing.len(), 1);
        assert_eq!(result.existing[0].concept_id, "b");
        assert!(result.created.iter().all(|s| s.folder_id.as_deref() == Some("imported")));
        assert_eq!(service.store().count().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_bulk_schedule_without_skip_replaces() {
        let (service, _temp) = create_test_service().await;
        let now = Utc::now();
        service.schedule_for_review("a", None, None, now).await.unwrap();
        service.process_review("a", Quality::Good, now).await.unwrap();

        let mut request = BulkScheduleRequest::new(ids(&["a"]));
        request.skip_existing = false;
        let result = service.bulk_schedule(&request, now).await.unwrap();

        assert_eq!(result.created.len(), 1);
        let stored = service.store().find_by_concept_id("a").await.unwrap().unwrap();
        assert_eq!(stored.total_reviews, 0);
    }

    #[tokio::test]
    async fn test_validated_pass_throughs() {
        let (service, _temp) = create_test_service().await;
        let now = Utc::now();

        assert!(matches!(service.suspend("").await, Err(CadenceError::InvalidInput(_))));
        assert!(matches!(service.unschedule("  ").await, Err(CadenceError::InvalidInput(_))));
        assert!(matches!(
            service.reset_abandoned(0, now).await,
            Err(CadenceError::InvalidInput(_))
        ));
        assert!(matches!(
            service.cleanup_orphaned(&HashSet::new()).await,
            Err(CadenceError::InvalidInput(_))
        ));
        assert!(matches!(
            service.bulk_schedule(&BulkScheduleRequest::new(vec![]), now).await,
            Err(CadenceError::InvalidInput(_))
        ));

        assert!(!service.suspend("missing").await.unwrap());
        service.schedule_for_review("present", None, None, now).await.unwrap();
        assert!(service.suspend("present").await.unwrap());
        assert!(service.resume("present").await.unwrap());
        assert!(service.unschedule("present").await.unwrap());
        assert!(!service.unschedule("present").await.unwrap());
    }

    #[tokio::test]
    async fn test_review_plan_and_health() {
        let (service, _temp) = create_test_service().await;
        let now = Utc::now();
        let request = BulkScheduleRequest::new((0..8).map(|i| format!("c{}", i)).collect());
        service.bulk_schedule(&request, now - Duration::days(3)).await.unwrap();
        service.process_review("c0", Quality::Easy, now).await.unwrap();

        let plan = service.get_review_plan(now).await.unwrap();
        assert_eq!(plan.due_count, 7);
        assert_eq!(plan.overdue_count, 7);
        assert_eq!(plan.forecast.len(), 7);
        assert_eq!(plan.forecast[0].due, 7);
        assert_eq!(plan.forecast[0].estimated_minutes, 2);
        assert_eq!(plan.status_breakdown.total(), 8);

        let health = service.get_system_health(now).await.unwrap();
        assert_eq!(health.total_concepts, 8);
        assert_eq!(health.overdue_percentage, 87.5);
    }
}

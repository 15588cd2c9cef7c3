//! Request and report types for the scheduler service.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ReviewSchedule, ScheduleStatus};
use crate::storage::{DEFAULT_DUE_LIMIT, StatusCounts};

/// Optional overrides for a brand-new schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InitialParameters {
    pub easiness_factor: Option<f64>,
    pub interval: Option<u32>,
}

/// What a single review changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewOutcome {
    /// Schedule as persisted after the review
    pub schedule: ReviewSchedule,
    pub next_review_date: DateTime<Utc>,
    pub previous_status: ScheduleStatus,
    pub status_changed: bool,
    pub interval_before: u32,
    pub interval_after: u32,
    pub interval_delta: i64,
    pub ease_before: f64,
    pub ease_after: f64,
    pub ease_delta: f64,
    pub graduated: bool,
    pub reset_to_learning: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DueReviewOptions {
    pub limit: usize,
    pub folder_id: Option<String>,
    pub statuses: Option<Vec<ScheduleStatus>>,
    /// Re-sort the page by ascending ease, hardest first
    pub prioritize_difficult: bool,
    pub as_of: DateTime<Utc>,
}

impl DueReviewOptions {
    pub fn new(as_of: DateTime<Utc>) -> Self {
        Self {
            limit: DEFAULT_DUE_LIMIT,
            folder_id: None,
            statuses: None,
            prioritize_difficult: false,
            as_of,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn in_folder(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }

    pub fn with_statuses(mut self, statuses: Vec<ScheduleStatus>) -> Self {
        self.statuses = Some(statuses);
        self
    }

    pub fn prioritizing_difficult(mut self) -> Self {
        self.prioritize_difficult = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulkScheduleRequest {
    pub concept_ids: Vec<String>,
    pub folder_id: Option<String>,
    /// Falls back to the configured batch size
    pub batch_size: Option<usize>,
    /// Leave already-scheduled concepts untouched
    pub skip_existing: bool,
}

impl BulkScheduleRequest {
    pub fn new(concept_ids: Vec<String>) -> Self {
        Self {
            concept_ids,
            folder_id: None,
            batch_size: None,
            skip_existing: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkScheduleResult {
    pub created: Vec<ReviewSchedule>,
    pub existing: Vec<ReviewSchedule>,
}

impl BulkScheduleResult {
    pub fn total(&self) -> usize {
        self.created.len() + self.existing.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub due: usize,
    pub estimated_minutes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewPlan {
    pub due_count: usize,
    pub overdue_count: usize,
    pub status_breakdown: StatusCounts,
    pub forecast: Vec<ForecastDay>,
    pub total_estimated_minutes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemHealth {
    pub total_concepts: usize,
    pub average_ease: f64,
    pub average_interval: f64,
    pub status_breakdown: StatusCounts,
    /// Share of all schedules that are overdue, 0-100
    pub overdue_percentage: f64,
}

/// Minutes needed for `reviews` reviews, rounded up.
pub fn estimated_minutes(reviews: usize, seconds_per_review: u64) -> u64 {
    (reviews as u64 * seconds_per_review).div_ceil(60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimated_minutes_rounds_up() {
        assert_eq!(estimated_minutes(0, 15), 0);
        assert_eq!(estimated_minutes(4, 15), 1);
        assert_eq!(estimated_minutes(5, 15), 2);
        assert_eq!(estimated_minutes(40, 15), 10);
    }

    #[test]
    fn test_bulk_request_defaults() {
        let request = BulkScheduleRequest::new(vec!["a".to_string()]);
        assert!(request.skip_existing);
        assert_eq!(request.batch_size, None);
    }
}

//! ReviewSchedule aggregate and its plain record form
//!
//! A ReviewSchedule is the only mutable piece of the system. It owns the
//! scheduling parameters, timing and status of one concept, and delegates
//! every numeric decision to `engine::calculate_next`.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::parameters::SchedulingParameters;
use super::status::{LEECH_THRESHOLD, ScheduleStatus};
use super::timing::Timing;
use crate::engine::{Quality, TransitionConfig, TransitionOutcome, calculate_next};
use crate::error::{CadenceError, Result};
use crate::id::schedule_id_for;

/// Review state for one concept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScheduleRecord", into = "ScheduleRecord")]
pub struct ReviewSchedule {
    //=== Identity ===
    /// Deterministic: `schedule_id_for(concept_id)`
    pub id: String,

    /// Opaque identifier owned by the content pipeline
    pub concept_id: String,

    /// Optional folder scope supplied at scheduling time
    pub folder_id: Option<String>,

    //=== Scheduling ===
    pub parameters: SchedulingParameters,
    pub timing: Timing,
    pub status: ScheduleStatus,

    //=== Counters ===
    pub total_reviews: u32,
    pub consecutive_correct: u32,
    pub consecutive_incorrect: u32,
}

impl ReviewSchedule {
    /// Create a schedule for a concept, due immediately.
    pub fn new(concept_id: &str, now: DateTime<Utc>) -> Result<Self> {
        Self::with_parameters(concept_id, SchedulingParameters::initial(), now)
    }

    /// Create a schedule with custom initial parameters.
    pub fn with_parameters(concept_id: &str, parameters: SchedulingParameters, now: DateTime<Utc>) -> Result<Self> {
        if concept_id.trim().is_empty() {
            return Err(CadenceError::InvalidInput("concept id must not be empty".to_string()));
        }
        Ok(Self {
            id: schedule_id_for(concept_id),
            concept_id: concept_id.to_string(),
            folder_id: None,
            status: ScheduleStatus::derive(&parameters),
            parameters,
            timing: Timing::new(now),
            total_reviews: 0,
            consecutive_correct: 0,
            consecutive_incorrect: 0,
        })
    }

    /// Attach a folder scope.
    pub fn in_folder(mut self, folder_id: Option<String>) -> Self {
        self.folder_id = folder_id;
        self
    }

    /// Apply a review answered at `now`.
    pub fn record_review(
        &mut self,
        quality: Quality,
        config: &TransitionConfig,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome> {
        let outcome = calculate_next(&self.parameters.to_transition_state(), quality, config);

        let parameters = SchedulingParameters::from_transition_state(&outcome.state)?;
        let timing = self.timing.reviewed(now, outcome.delay)?;

        self.parameters = parameters;
        self.timing = timing;
        self.total_reviews = self.total_reviews.saturating_add(1);

        if quality.is_correct() {
            self.consecutive_correct = self.consecutive_correct.saturating_add(1);
            self.consecutive_incorrect = 0;
        } else {
            self.consecutive_incorrect = self.consecutive_incorrect.saturating_add(1);
            self.consecutive_correct = 0;
        }

        self.refresh_status();
        Ok(outcome)
    }

    /// Pause the schedule. Idempotent.
    pub fn suspend(&mut self) {
        self.status = ScheduleStatus::Suspended;
    }

    /// Leave SUSPENDED and recompute status. No-op for any other status.
    ///
    /// The leech rule is applied after recomputation, so a schedule that is
    /// still failing comes back as LEECH.
    pub fn resume(&mut self) {
        if self.status != ScheduleStatus::Suspended {
            return;
        }
        self.status = ScheduleStatus::derive(&self.parameters);
        self.apply_leech_rule();
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status != ScheduleStatus::Suspended && self.timing.is_due(now)
    }

    pub fn is_overdue(&self, days: i64, now: DateTime<Utc>) -> bool {
        self.timing.is_overdue(days, now)
    }

    /// Not suspended, and no review (or creation, if never reviewed) within
    /// `days` days. A threshold longer than any representable span matches nothing.
    pub fn is_abandoned(&self, days: i64, now: DateTime<Utc>) -> bool {
        self.status != ScheduleStatus::Suspended
            && Duration::try_days(days).is_some_and(|threshold| now - self.timing.last_activity() >= threshold)
    }

    /// Copy with new parameters; status recomputed unless sticky.
    pub fn with_updated_parameters(&self, parameters: SchedulingParameters) -> Self {
        let mut updated = self.clone();
        updated.parameters = parameters;
        updated.refresh_status();
        updated
    }

    /// Copy with new timing.
    pub fn with_updated_timing(&self, timing: Timing) -> Self {
        Self {
            timing,
            ..self.clone()
        }
    }

    fn refresh_status(&mut self) {
        if !self.status.is_sticky() {
            self.status = ScheduleStatus::derive(&self.parameters);
        }
        self.apply_leech_rule();
    }

    fn apply_leech_rule(&mut self) {
        if self.consecutive_incorrect >= LEECH_THRESHOLD && self.status != ScheduleStatus::Suspended {
            self.status = ScheduleStatus::Leech;
        }
    }

    /// Plain record used on disk and for export.
    pub fn to_plain(&self) -> ScheduleRecord {
        ScheduleRecord::from(self.clone())
    }

    /// Validate a plain record back into a schedule.
    pub fn from_plain(record: ScheduleRecord) -> Result<Self> {
        Self::try_from(record)
    }
}

/// Flat, serializable form of a ReviewSchedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRecord {
    pub id: String,
    pub concept_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    pub repetitions: i64,
    pub easiness_factor: f64,
    pub interval: i64,
    #[serde(default)]
    pub learning_step: Option<i64>,
    pub created_at: String,
    #[serde(default)]
    pub last_review_date: Option<String>,
    pub next_review_date: String,
    pub status: String,
    pub total_reviews: i64,
    pub consecutive_correct: i64,
    pub consecutive_incorrect: i64,
}

impl From<ReviewSchedule> for ScheduleRecord {
    fn from(schedule: ReviewSchedule) -> Self {
        let params = schedule.parameters;
        Self {
            id: schedule.id,
            concept_id: schedule.concept_id,
            folder_id: schedule.folder_id,
            repetitions: i64::from(params.repetitions()),
            easiness_factor: params.easiness_factor(),
            interval: i64::from(params.interval()),
            learning_step: params.learning_step().map(i64::from),
            created_at: format_date(&schedule.timing.created_at),
            last_review_date: schedule.timing.last_review_date.as_ref().map(format_date),
            next_review_date: format_date(&schedule.timing.next_review_date),
            status: schedule.status.as_str().to_string(),
            total_reviews: i64::from(schedule.total_reviews),
            consecutive_correct: i64::from(schedule.consecutive_correct),
            consecutive_incorrect: i64::from(schedule.consecutive_incorrect),
        }
    }
}

impl TryFrom<ScheduleRecord> for ReviewSchedule {
    type Error = CadenceError;

    fn try_from(record: ScheduleRecord) -> Result<Self> {
        if record.concept_id.trim().is_empty() {
            return Err(CadenceError::InvalidRecord("conceptId must not be empty".to_string()));
        }
        let expected_id = schedule_id_for(&record.concept_id);
        if record.id != expected_id {
            return Err(CadenceError::InvalidRecord(format!(
                "id '{}' does not match concept '{}' (expected '{}')",
                record.id, record.concept_id, expected_id
            )));
        }

        let mut parameters = SchedulingParameters::new(
            count("repetitions", record.repetitions)?,
            record.easiness_factor,
            count("interval", record.interval)?,
        )
        .map_err(|e| CadenceError::InvalidRecord(e.to_string()))?;
        if let Some(step) = record.learning_step {
            parameters = parameters.at_learning_step(count("learningStep", step)?);
        }

        let timing = Timing {
            created_at: parse_date("createdAt", &record.created_at)?,
            last_review_date: record
                .last_review_date
                .as_deref()
                .map(|d| parse_date("lastReviewDate", d))
                .transpose()?,
            next_review_date: parse_date("nextReviewDate", &record.next_review_date)?,
        };

        let status = record.status.parse::<ScheduleStatus>().map_err(CadenceError::InvalidRecord)?;

        Ok(Self {
            id: record.id,
            concept_id: record.concept_id,
            folder_id: record.folder_id,
            parameters,
            timing,
            status,
            total_reviews: count("totalReviews", record.total_reviews)?,
            consecutive_correct: count("consecutiveCorrect", record.consecutive_correct)?,
            consecutive_incorrect: count("consecutiveIncorrect", record.consecutive_incorrect)?,
        })
    }
}

fn count(field: &str, value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| CadenceError::InvalidRecord(format!("{} must be a non-negative count, got {}", field, value)))
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_date(field: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| CadenceError::InvalidRecord(format!("{} '{}' is not an ISO-8601 date: {}", field, value, e)))
}

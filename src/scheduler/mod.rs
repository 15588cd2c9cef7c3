//! Scheduler module: orchestration over the schedule store.
//!
//! This module provides:
//! - **SchedulerService**: schedule, review, plan and maintain concepts
//!   through any `ScheduleStore`.
//! - **ConceptLocks**: keyed lock serializing work on one concept.
//! - **Plan types**: review outcome diffs, review plans and system health.
//!
//! # Example
//!
//! ```ignore
//! use cadence::scheduler::SchedulerService;
//! use cadence::storage::FileScheduleStore;
//!
//! let store = FileScheduleStore::open("/tmp/cadence").await?;
//! let service = SchedulerService::new(Arc::new(store));
//!
//! service.schedule_for_review("ownership", None, None, Utc::now()).await?;
//! let outcome = service.process_review("ownership", Quality::Good, Utc::now()).await?;
//! ```

mod locks;
mod plan;
mod service;

pub use locks::ConceptLocks;
pub use plan::{
    BulkScheduleRequest, BulkScheduleResult, DueReviewOptions, ForecastDay, InitialParameters, ReviewOutcome,
    ReviewPlan, SystemHealth, estimated_minutes,
};
pub use service::{SchedulerConfig, SchedulerService};

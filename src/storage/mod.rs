//! Storage layer for Cadence - file-backed schedule persistence with an in-memory index.
//!
//! `ScheduleStore` is the contract the scheduler talks to. `FileScheduleStore`
//! keeps one JSON file per schedule and a rebuildable index snapshot.

mod analytics;
pub mod file;
pub mod index;
pub mod traits;

pub use analytics::{INCORRECT_SEVERITY_WEIGHT, OVERDUE_AFTER_DAYS};
pub use file::FileScheduleStore;
pub use index::{IndexEntry, ScheduleIndex};
pub use traits::{
    CalendarDay, DEFAULT_DUE_LIMIT, DailyWorkload, DistributionBucket, DueQuery, ImportFailure, ImportReport,
    ProblematicConcept, ScheduleQuery, ScheduleStatistics, ScheduleStore, StatusCounts,
};

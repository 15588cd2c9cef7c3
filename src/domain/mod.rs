//! Domain types for Cadence
//!
//! - SchedulingParameters: validated repetitions / ease / interval
//! - Timing: created, last-reviewed and next-review dates
//! - ScheduleStatus: the new → learning → reviewing → mature state machine
//!   plus the sticky suspended and leech states
//! - ReviewSchedule: the aggregate root, one per concept

pub mod parameters;
pub mod schedule;
pub mod status;
pub mod timing;

pub use parameters::SchedulingParameters;
pub use schedule::{ReviewSchedule, ScheduleRecord};
pub use status::{LEARNING_REPETITIONS, LEECH_THRESHOLD, MATURE_INTERVAL_DAYS, ScheduleStatus};
pub use timing::Timing;

//! Cadence - a spaced-repetition review scheduler
//!
//! Cadence decides when each concept should be reviewed next. A pure
//! SM-2 style transition engine computes intervals and ease factors, a
//! `ReviewSchedule` entity tracks each concept's state machine, and a
//! file-backed store persists schedules with a rebuildable index.

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod id;
pub mod scheduler;
pub mod storage;

pub use error::{CadenceError, Result};

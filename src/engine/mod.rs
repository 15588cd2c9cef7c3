//! Transition engine
//!
//! Pure SM-2 variant mapping (scheduling state, response quality) to the next
//! scheduling state. No I/O, no clock, no mutation: the caller supplies every
//! input, so identical arguments always give identical results.

pub mod config;
pub mod transition;

pub use config::{DEFAULT_EASE, EASE_CEILING, EASE_FLOOR, INTERVAL_CEILING, TransitionConfig};
pub use transition::{Quality, TransitionOutcome, TransitionState, calculate_next};

//! Validated SM-2 scheduling parameters.

use crate::engine::{DEFAULT_EASE, EASE_CEILING, EASE_FLOOR, TransitionState};
use crate::error::{CadenceError, Result};
use crate::id::round2;

/// Repetitions, ease and interval for one schedule.
///
/// Only constructed through the validating factories below, so a value of
/// this type always holds a non-negative repetition count, an ease inside
/// `[EASE_FLOOR, EASE_CEILING]` rounded to two decimals, and an interval >= 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulingParameters {
    repetitions: u32,
    easiness_factor: f64,
    interval: u32,
    learning_step: Option<u32>,
}

impl SchedulingParameters {
    /// Parameters in the reviewing phase.
    pub fn new(repetitions: u32, easiness_factor: f64, interval: u32) -> Result<Self> {
        if !easiness_factor.is_finite() || !(EASE_FLOOR..=EASE_CEILING).contains(&easiness_factor) {
            return Err(CadenceError::InvalidParameters(format!(
                "easiness factor {} outside [{}, {}]",
                easiness_factor, EASE_FLOOR, EASE_CEILING
            )));
        }
        if interval < 1 {
            return Err(CadenceError::InvalidParameters(format!("interval {} must be >= 1", interval)));
        }
        Ok(Self {
            repetitions,
            easiness_factor: round2(easiness_factor),
            interval,
            learning_step: None,
        })
    }

    /// Parameters for a concept that has never been reviewed.
    pub fn initial() -> Self {
        Self {
            repetitions: 0,
            easiness_factor: DEFAULT_EASE,
            interval: 1,
            learning_step: Some(0),
        }
    }

    /// Initial parameters with an optional custom ease and interval.
    pub fn initial_with(easiness_factor: Option<f64>, interval: Option<u32>) -> Result<Self> {
        let defaults = Self::initial();
        let custom = Self::new(
            0,
            easiness_factor.unwrap_or(defaults.easiness_factor),
            interval.unwrap_or(defaults.interval),
        )?;
        Ok(custom.at_learning_step(0))
    }

    /// Same parameters, placed on the given learning step.
    pub fn at_learning_step(mut self, step: u32) -> Self {
        self.learning_step = Some(step);
        self
    }

    /// Convert an engine state back into validated parameters.
    pub fn from_transition_state(state: &TransitionState) -> Result<Self> {
        let params = Self::new(state.repetitions, state.easiness_factor, state.interval)?;
        let step = if state.is_learning {
            let step = state.learning_step.unwrap_or(0);
            Some(u32::try_from(step).map_err(|_| {
                CadenceError::InvalidParameters(format!("learning step {} out of range", step))
            })?)
        } else {
            None
        };
        Ok(Self {
            learning_step: step,
            ..params
        })
    }

    pub fn to_transition_state(&self) -> TransitionState {
        TransitionState {
            repetitions: self.repetitions,
            easiness_factor: self.easiness_factor,
            interval: self.interval,
            learning_step: self.learning_step.map(|s| s as usize),
            is_learning: self.learning_step.is_some(),
        }
    }

    pub fn repetitions(&self) -> u32 {
        self.repetitions
    }

    pub fn easiness_factor(&self) -> f64 {
        self.easiness_factor
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn learning_step(&self) -> Option<u32> {
        self.learning_step
    }

    pub fn is_learning(&self) -> bool {
        self.learning_step.is_some()
    }
}

impl Default for SchedulingParameters {
    fn default() -> Self {
        Self::initial()
    }
}

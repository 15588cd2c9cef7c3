//! SM-2 state transitions.
//!
//! Two phases:
//! - Learning: walk a fixed list of short steps (minutes) before graduating
//! - Reviewing: intervals grow by the ease factor (1 day, 6 days, then `prev × ease`)
//!
//! FORGOT always drops a concept back to the first learning step.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::config::TransitionConfig;
use crate::id::round2;

/// Minutes in one day, used to express learning steps as whole days.
const MINUTES_PER_DAY: u32 = 24 * 60;

/// Interval multiplier for HARD answers while reviewing.
///
/// Applied as `previous × 1.2 × interval_modifier`, without the ease factor,
/// so HARD grows an interval more slowly than GOOD for any ease above 1.2.
const HARD_INTERVAL_MULTIPLIER: f64 = 1.2;

/// Response quality reported by the learner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// No recall
    Forgot,
    /// Recalled with serious difficulty
    Hard,
    /// Recalled after some hesitation
    Good,
    /// Perfect recall
    Easy,
}

impl Quality {
    /// Every quality except FORGOT counts as a correct answer.
    pub fn is_correct(self) -> bool {
        !matches!(self, Quality::Forgot)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Forgot => "forgot",
            Quality::Hard => "hard",
            Quality::Good => "good",
            Quality::Easy => "easy",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = String;

    /// Accepts names (`forgot`/`again`, `hard`, `good`, `easy`) or the 1-4 button scale.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forgot" | "again" | "1" => Ok(Quality::Forgot),
            "hard" | "2" => Ok(Quality::Hard),
            "good" | "3" => Ok(Quality::Good),
            "easy" | "4" => Ok(Quality::Easy),
            other => Err(format!("unknown quality '{}': expected forgot, hard, good or easy", other)),
        }
    }
}

/// Algorithm-local view of a schedule, decoupled from the entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionState {
    pub repetitions: u32,
    pub easiness_factor: f64,
    /// Interval in days
    pub interval: u32,
    /// Index into `TransitionConfig::learning_steps` while learning
    pub learning_step: Option<usize>,
    pub is_learning: bool,
}

impl TransitionState {
    /// State of a concept that has never been answered: learning, first step.
    pub fn initial(easiness_factor: f64, interval: u32) -> Self {
        Self {
            repetitions: 0,
            easiness_factor,
            interval,
            learning_step: Some(0),
            is_learning: true,
        }
    }

    /// State of a concept in the reviewing phase.
    pub fn reviewing(repetitions: u32, easiness_factor: f64, interval: u32) -> Self {
        Self {
            repetitions,
            easiness_factor,
            interval,
            learning_step: None,
            is_learning: false,
        }
    }
}

/// Result of a single transition
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOutcome {
    pub state: TransitionState,
    /// Interval in days (always >= 1)
    pub interval: u32,
    /// Time until the next review: the step length while learning, `interval` days otherwise
    pub delay: Duration,
    /// Left the learning phase on this answer
    pub graduated: bool,
    /// Dropped back to the first learning step on this answer
    pub reset_to_learning: bool,
    /// New ease minus old ease, rounded to two decimals
    pub ease_change: f64,
}

/// Calculate the next scheduling state for a response.
///
/// Total over every input: out-of-range steps are clamped, ease is clamped to
/// `[min_ease, max_ease]` and rounded, interval is rounded and kept within
/// `[1, max_interval]`.
pub fn calculate_next(state: &TransitionState, quality: Quality, config: &TransitionConfig) -> TransitionOutcome {
    let draft = if quality == Quality::Forgot {
        forgot(state, config)
    } else if state.is_learning {
        learning(state, quality, config)
    } else {
        reviewing(state, quality, config)
    };

    let easiness_factor = clamp_ease(draft.easiness_factor, config);
    let interval = draft.interval.clamp(1, config.max_interval.max(1));
    let delay = match draft.step_minutes {
        Some(minutes) => Duration::minutes(i64::from(minutes)),
        None => Duration::days(i64::from(interval)),
    };

    TransitionOutcome {
        state: TransitionState {
            repetitions: draft.repetitions,
            easiness_factor,
            interval,
            learning_step: draft.learning_step,
            is_learning: draft.learning_step.is_some(),
        },
        interval,
        delay,
        graduated: draft.graduated,
        reset_to_learning: quality == Quality::Forgot,
        ease_change: round2(easiness_factor - clamp_ease(state.easiness_factor, config)),
    }
}

/// Working values before clamping
struct Draft {
    repetitions: u32,
    easiness_factor: f64,
    interval: u32,
    learning_step: Option<usize>,
    step_minutes: Option<u32>,
    graduated: bool,
}

fn forgot(state: &TransitionState, config: &TransitionConfig) -> Draft {
    let minutes = config.first_step_minutes();
    Draft {
        repetitions: 0,
        easiness_factor: state.easiness_factor - config.forgot_factor,
        interval: step_days(minutes),
        learning_step: Some(0),
        step_minutes: Some(minutes),
        graduated: false,
    }
}

fn learning(state: &TransitionState, quality: Quality, config: &TransitionConfig) -> Draft {
    let last_step = config.learning_steps.len().saturating_sub(1);
    let current = state.learning_step.unwrap_or(0).min(last_step);

    match quality {
        Quality::Easy => Draft {
            repetitions: 1,
            easiness_factor: state.easiness_factor + config.easy_factor,
            interval: config.easy_interval,
            learning_step: None,
            step_minutes: None,
            graduated: true,
        },
        Quality::Good if current + 1 >= config.learning_steps.len() => Draft {
            repetitions: 1,
            easiness_factor: state.easiness_factor,
            interval: config.graduating_interval,
            learning_step: None,
            step_minutes: None,
            graduated: true,
        },
        _ => {
            // GOOD advances a step, HARD repeats the current one
            let step = if quality == Quality::Good { current + 1 } else { current };
            let minutes = config.learning_steps.get(step).copied().unwrap_or(1).max(1);
            Draft {
                repetitions: state.repetitions,
                easiness_factor: state.easiness_factor,
                interval: step_days(minutes),
                learning_step: Some(step),
                step_minutes: Some(minutes),
                graduated: false,
            }
        }
    }
}

fn reviewing(state: &TransitionState, quality: Quality, config: &TransitionConfig) -> Draft {
    let ease = state.easiness_factor;
    let previous = state.interval.max(1);

    let interval = match quality {
        Quality::Hard => match state.repetitions {
            0 => 1,
            1 => 6,
            _ => to_days(f64::from(previous) * HARD_INTERVAL_MULTIPLIER * config.interval_modifier),
        },
        Quality::Easy => to_days(base_interval(state.repetitions, previous, ease, config) * config.easy_bonus),
        _ => to_days(base_interval(state.repetitions, previous, ease, config)),
    };

    let easiness_factor = match quality {
        Quality::Hard => ease - config.hard_factor,
        Quality::Easy => ease + config.easy_factor,
        _ => ease,
    };

    Draft {
        repetitions: state.repetitions.saturating_add(1),
        easiness_factor,
        interval,
        learning_step: None,
        step_minutes: None,
        graduated: false,
    }
}

/// 1 day, then 6 days, then `previous × ease × modifier`.
fn base_interval(repetitions: u32, previous: u32, ease: f64, config: &TransitionConfig) -> f64 {
    match repetitions {
        0 => 1.0,
        1 => 6.0,
        _ => f64::from(previous) * ease * config.interval_modifier,
    }
}

fn to_days(value: f64) -> u32 {
    // `as` saturates and maps NaN to 0
    (value.round() as u32).max(1)
}

/// A learning step expressed in whole days, never below one.
fn step_days(minutes: u32) -> u32 {
    minutes.div_ceil(MINUTES_PER_DAY).max(1)
}

fn clamp_ease(ease: f64, config: &TransitionConfig) -> f64 {
    round2(ease.max(config.min_ease).min(config.max_ease))
}

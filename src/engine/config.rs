//! Tuning knobs for the transition engine.

use serde::{Deserialize, Serialize};

use crate::error::{CadenceError, Result};

/// Hard lower bound for any ease factor, configured or persisted.
pub const EASE_FLOOR: f64 = 1.3;
/// Hard upper bound for any ease factor, configured or persisted.
pub const EASE_CEILING: f64 = 3.0;
/// Ease assigned to a freshly scheduled concept.
pub const DEFAULT_EASE: f64 = 2.5;
/// Longest interval (days) a transition may produce, configured or not.
pub const INTERVAL_CEILING: u32 = 36_500;

/// Named set of knobs for `calculate_next`. Every field can be overridden
/// on its own; missing fields fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TransitionConfig {
    /// Lowest ease a transition may produce
    pub min_ease: f64,
    /// Highest ease a transition may produce
    pub max_ease: f64,
    /// Extra interval multiplier applied on EASY while reviewing
    pub easy_bonus: f64,
    /// Global multiplier applied to every grown interval
    pub interval_modifier: f64,
    /// Learning step lengths in minutes
    pub learning_steps: Vec<u32>,
    /// Interval (days) assigned when GOOD walks past the last learning step
    pub graduating_interval: u32,
    /// Interval (days) assigned when EASY graduates a learning concept
    pub easy_interval: u32,
    /// Ease penalty for HARD
    pub hard_factor: f64,
    /// Ease penalty for FORGOT
    pub forgot_factor: f64,
    /// Ease bonus for EASY
    pub easy_factor: f64,
    /// Longest interval (days) a transition may produce
    pub max_interval: u32,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            min_ease: EASE_FLOOR,
            max_ease: EASE_CEILING,
            easy_bonus: 1.3,
            interval_modifier: 1.0,
            learning_steps: vec![1, 10],
            graduating_interval: 1,
            easy_interval: 4,
            hard_factor: 0.15,
            forgot_factor: 0.2,
            easy_factor: 0.15,
            max_interval: INTERVAL_CEILING,
        }
    }
}

impl TransitionConfig {
    /// Override the ease bounds.
    pub fn with_ease_bounds(mut self, min_ease: f64, max_ease: f64) -> Self {
        self.min_ease = min_ease;
        self.max_ease = max_ease;
        self
    }

    /// Override the learning steps (minutes).
    pub fn with_learning_steps(mut self, steps: Vec<u32>) -> Self {
        self.learning_steps = steps;
        self
    }

    /// Override the global interval modifier.
    pub fn with_interval_modifier(mut self, modifier: f64) -> Self {
        self.interval_modifier = modifier;
        self
    }

    /// Override the interval cap (days).
    pub fn with_max_interval(mut self, max_interval: u32) -> Self {
        self.max_interval = max_interval;
        self
    }

    /// Length of the first learning step in minutes (1 when no steps are configured).
    pub fn first_step_minutes(&self) -> u32 {
        self.learning_steps.first().copied().unwrap_or(1).max(1)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(EASE_FLOOR..=EASE_CEILING).contains(&self.min_ease) {
            return Err(CadenceError::InvalidParameters(format!(
                "min-ease {} outside [{}, {}]",
                self.min_ease, EASE_FLOOR, EASE_CEILING
            )));
        }
        if !(EASE_FLOOR..=EASE_CEILING).contains(&self.max_ease) {
            return Err(CadenceError::InvalidParameters(format!(
                "max-ease {} outside [{}, {}]",
                self.max_ease, EASE_FLOOR, EASE_CEILING
            )));
        }
        if self.min_ease > self.max_ease {
            return Err(CadenceError::InvalidParameters(format!(
                "min-ease {} greater than max-ease {}",
                self.min_ease, self.max_ease
            )));
        }
        if self.learning_steps.is_empty() || self.learning_steps.contains(&0) {
            return Err(CadenceError::InvalidParameters(
                "learning-steps must be a non-empty list of positive minutes".to_string(),
            ));
        }
        if self.graduating_interval == 0 || self.easy_interval == 0 {
            return Err(CadenceError::InvalidParameters(
                "graduating-interval and easy-interval must be >= 1".to_string(),
            ));
        }
        if !(1..=INTERVAL_CEILING).contains(&self.max_interval) {
            return Err(CadenceError::InvalidParameters(format!(
                "max-interval {} outside [1, {}]",
                self.max_interval, INTERVAL_CEILING
            )));
        }
        if self.graduating_interval > self.max_interval || self.easy_interval > self.max_interval {
            return Err(CadenceError::InvalidParameters(format!(
                "graduating-interval and easy-interval must not exceed max-interval {}",
                self.max_interval
            )));
        }
        if self.easy_bonus <= 0.0 || self.interval_modifier <= 0.0 {
            return Err(CadenceError::InvalidParameters(
                "easy-bonus and interval-modifier must be > 0".to_string(),
            ));
        }
        if self.hard_factor < 0.0 || self.forgot_factor < 0.0 || self.easy_factor < 0.0 {
            return Err(CadenceError::InvalidParameters("ease factors must be >= 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = TransitionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.learning_steps, vec![1, 10]);
        assert_eq!(config.graduating_interval, 1);
        assert_eq!(config.easy_interval, 4);
        assert_eq!(config.max_interval, INTERVAL_CEILING);
    }

    #[test]
    fn test_rejects_max_interval_out_of_range() {
        assert!(TransitionConfig::default().with_max_interval(0).validate().is_err());
        assert!(TransitionConfig::default().with_max_interval(INTERVAL_CEILING + 1).validate().is_err());
        assert!(TransitionConfig::default().with_max_interval(3).validate().is_err());
        assert!(TransitionConfig::default().with_max_interval(365).validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let config = TransitionConfig::default().with_ease_bounds(2.8, 1.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bounds_outside_hard_limits() {
        let config = TransitionConfig::default().with_ease_bounds(1.0, 2.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_learning_steps() {
        let config = TransitionConfig::default().with_learning_steps(vec![]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_overrides_keep_defaults() {
        let config: TransitionConfig = serde_yaml::from_str("easy-bonus: 1.5\nlearning-steps: [5]\n").unwrap();
        assert_eq!(config.easy_bonus, 1.5);
        assert_eq!(config.learning_steps, vec![5]);
        assert_eq!(config.min_ease, EASE_FLOOR);
        assert_eq!(config.forgot_factor, 0.2);
    }

    #[test]
    fn test_first_step_minutes() {
        assert_eq!(TransitionConfig::default().first_step_minutes(), 1);
        let config = TransitionConfig::default().with_learning_steps(vec![]);
        assert_eq!(config.first_step_minutes(), 1);
    }
}

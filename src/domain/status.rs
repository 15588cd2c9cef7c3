//! Schedule status state machine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::parameters::SchedulingParameters;

/// Interval (days) at which a reviewing schedule counts as mature.
pub const MATURE_INTERVAL_DAYS: u32 = 21;

/// Repetitions below which a schedule is still learning.
pub const LEARNING_REPETITIONS: u32 = 3;

/// Consecutive failures that mark a schedule as a leech.
pub const LEECH_THRESHOLD: u32 = 8;

/// Status of a schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    /// No successful repetition yet
    New,
    /// Early repetitions
    Learning,
    /// Regular spaced review
    Reviewing,
    /// Long intervals
    Mature,
    /// Paused by the user (sticky)
    Suspended,
    /// Repeatedly forgotten (sticky)
    Leech,
}

impl ScheduleStatus {
    pub const ALL: [ScheduleStatus; 6] = [
        ScheduleStatus::New,
        ScheduleStatus::Learning,
        ScheduleStatus::Reviewing,
        ScheduleStatus::Mature,
        ScheduleStatus::Suspended,
        ScheduleStatus::Leech,
    ];

    /// Sticky statuses survive routine recomputation and need an explicit action to clear.
    pub fn is_sticky(&self) -> bool {
        matches!(self, ScheduleStatus::Suspended | ScheduleStatus::Leech)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::New => "new",
            ScheduleStatus::Learning => "learning",
            ScheduleStatus::Reviewing => "reviewing",
            ScheduleStatus::Mature => "mature",
            ScheduleStatus::Suspended => "suspended",
            ScheduleStatus::Leech => "leech",
        }
    }

    /// Status implied by the parameters alone.
    pub fn derive(params: &SchedulingParameters) -> Self {
        if params.repetitions() == 0 {
            ScheduleStatus::New
        } else if params.repetitions() < LEARNING_REPETITIONS {
            ScheduleStatus::Learning
        } else if params.interval() >= MATURE_INTERVAL_DAYS {
            ScheduleStatus::Mature
        } else {
            ScheduleStatus::Reviewing
        }
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScheduleStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown status '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_from_parameters() {
        let new = SchedulingParameters::initial();
        assert_eq!(ScheduleStatus::derive(&new), ScheduleStatus::New);

        let learning = SchedulingParameters::new(2, 2.5, 6).unwrap();
        assert_eq!(ScheduleStatus::derive(&learning), ScheduleStatus::Learning);

        let reviewing = SchedulingParameters::new(3, 2.5, 15).unwrap();
        assert_eq!(ScheduleStatus::derive(&reviewing), ScheduleStatus::Reviewing);

        let mature = SchedulingParameters::new(3, 2.5, 21).unwrap();
        assert_eq!(ScheduleStatus::derive(&mature), ScheduleStatus::Mature);
    }

    #[test]
    fn test_sticky() {
        assert!(ScheduleStatus::Suspended.is_sticky());
        assert!(ScheduleStatus::Leech.is_sticky());
        assert!(!ScheduleStatus::Mature.is_sticky());
    }

    #[test]
    fn test_parse_round_trip() {
        for status in ScheduleStatus::ALL {
            assert_eq!(status.as_str().parse::<ScheduleStatus>().unwrap(), status);
        }
        assert_eq!("LEECH".parse::<ScheduleStatus>().unwrap(), ScheduleStatus::Leech);
        assert!("graduated".parse::<ScheduleStatus>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&ScheduleStatus::Mature).unwrap();
        assert_eq!(json, "\"mature\"");
    }
}

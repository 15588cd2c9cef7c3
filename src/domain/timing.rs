//! Review timing for a schedule.

use chrono::{DateTime, Datelike, Duration, Utc};

use crate::error::{CadenceError, Result};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Latest year a review date may land in; RFC 3339 has four-digit years.
const LAST_REPRESENTABLE_YEAR: i32 = 9999;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub created_at: DateTime<Utc>,
    pub last_review_date: Option<DateTime<Utc>>,
    pub next_review_date: DateTime<Utc>,
}

impl Timing {
    /// Timing for a brand-new schedule: due immediately.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            last_review_date: None,
            next_review_date: now,
        }
    }

    /// Timing after a review at `now` with the next review `delay` later.
    ///
    /// Fails when the next review date cannot be stored.
    pub fn reviewed(&self, now: DateTime<Utc>, delay: Duration) -> Result<Self> {
        let next_review_date = now
            .checked_add_signed(delay)
            .filter(|next| next.year() <= LAST_REPRESENTABLE_YEAR)
            .ok_or_else(|| {
                CadenceError::InvalidParameters(format!("next review {} after {} is out of range", delay, now))
            })?;
        Ok(Self {
            created_at: self.created_at,
            last_review_date: Some(now),
            next_review_date,
        })
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_date <= now
    }

    /// Whole days past the next review date, floored (negative when not yet due).
    pub fn days_overdue(&self, now: DateTime<Utc>) -> i64 {
        (now - self.next_review_date).num_milliseconds().div_euclid(MILLIS_PER_DAY)
    }

    pub fn is_overdue(&self, days: i64, now: DateTime<Utc>) -> bool {
        self.is_due(now) && self.days_overdue(now) >= days
    }

    /// Last review, or creation when never reviewed.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_review_date.unwrap_or(self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_new_is_due_immediately() {
        let timing = Timing::new(at(1, 9));
        assert!(timing.is_due(at(1, 9)));
        assert_eq!(timing.last_review_date, None);
    }

    #[test]
    fn test_days_overdue_floors() {
        let timing = Timing {
            created_at: at(1, 0),
            last_review_date: None,
            next_review_date: at(2, 12),
        };
        assert_eq!(timing.days_overdue(at(4, 11)), 1);
        assert_eq!(timing.days_overdue(at(4, 12)), 2);
        assert_eq!(timing.days_overdue(at(2, 6)), -1);
    }

    #[test]
    fn test_is_overdue() {
        let timing = Timing {
            created_at: at(1, 0),
            last_review_date: None,
            next_review_date: at(2, 0),
        };
        assert!(timing.is_overdue(3, at(5, 0)));
        assert!(!timing.is_overdue(4, at(5, 0)));
        assert!(!timing.is_overdue(0, at(1, 12)));
    }

    #[test]
    fn test_reviewed_sets_dates() {
        let timing = Timing::new(at(1, 0)).reviewed(at(3, 8), Duration::days(6)).unwrap();
        assert_eq!(timing.created_at, at(1, 0));
        assert_eq!(timing.last_review_date, Some(at(3, 8)));
        assert_eq!(timing.next_review_date, at(9, 8));
        assert_eq!(timing.last_activity(), at(3, 8));
    }

    #[test]
    fn test_reviewed_rejects_unrepresentable_dates() {
        let timing = Timing::new(at(1, 0));
        assert!(timing.reviewed(at(1, 0), Duration::days(3_000_000)).is_err());
        assert!(timing.reviewed(DateTime::<Utc>::MAX_UTC, Duration::days(1)).is_err());
        assert!(timing.reviewed(at(1, 0), Duration::days(36_500)).is_ok());
    }
}

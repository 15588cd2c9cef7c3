//! Pure aggregation over loaded schedules.
//!
//! Shared by the default `ScheduleStore` methods so any store gets the same
//! statistics, calendar and severity ranking.

use std::cmp::Ordering;

use chrono::{DateTime, Days, Utc};

use super::traits::{CalendarDay, DailyWorkload, ProblematicConcept, ScheduleStatistics, StatusCounts};
use crate::domain::{ReviewSchedule, ScheduleStatus};
use crate::engine::EASE_CEILING;
use crate::id::round2;

/// Weight of each consecutive failure in the severity score.
pub const INCORRECT_SEVERITY_WEIGHT: f64 = 0.5;

/// A schedule counts as overdue once it is a full day past due.
pub const OVERDUE_AFTER_DAYS: i64 = 1;

pub fn statistics(schedules: &[ReviewSchedule], now: DateTime<Utc>) -> ScheduleStatistics {
    let mut by_status = StatusCounts::default();
    let mut due_count = 0;
    let mut overdue_count = 0;
    let mut ease_sum = 0.0;
    let mut interval_sum = 0.0;

    for schedule in schedules {
        by_status.add(schedule.status, 1);
        if schedule.is_due(now) {
            due_count += 1;
            if schedule.is_overdue(OVERDUE_AFTER_DAYS, now) {
                overdue_count += 1;
            }
        }
        ease_sum += schedule.parameters.easiness_factor();
        interval_sum += f64::from(schedule.parameters.interval());
    }

    let total = schedules.len();
    let (average_ease, average_interval) = if total == 0 {
        (0.0, 0.0)
    } else {
        (round2(ease_sum / total as f64), round2(interval_sum / total as f64))
    };

    ScheduleStatistics {
        total_schedules: total,
        by_status,
        due_count,
        overdue_count,
        average_ease,
        average_interval,
    }
}

/// `(status, next review)` pairs for the calendar.
pub fn due_rows(schedules: &[ReviewSchedule]) -> impl Iterator<Item = (ScheduleStatus, DateTime<Utc>)> + '_ {
    schedules.iter().map(|s| (s.status, s.timing.next_review_date))
}

/// Per-day counts for `days` days starting today. Anything already overdue
/// lands on today; suspended schedules are skipped.
pub fn review_calendar(
    rows: impl IntoIterator<Item = (ScheduleStatus, DateTime<Utc>)>,
    days: u32,
    now: DateTime<Utc>,
) -> Vec<CalendarDay> {
    let today = now.date_naive();
    let mut calendar: Vec<CalendarDay> = (0..days)
        .map_while(|offset| today.checked_add_days(Days::new(u64::from(offset))))
        .map(|date| CalendarDay {
            date,
            due: 0,
            new: 0,
            learning: 0,
            reviewing: 0,
            mature: 0,
        })
        .collect();

    for (status, next_review_date) in rows {
        if status == ScheduleStatus::Suspended {
            continue;
        }
        let due_date = next_review_date.date_naive().max(today);
        let offset = (due_date - today).num_days();
        let Some(day) = usize::try_from(offset).ok().and_then(|i| calendar.get_mut(i)) else {
            continue;
        };
        day.due += 1;
        match status {
            ScheduleStatus::New => day.new += 1,
            ScheduleStatus::Learning => day.learning += 1,
            ScheduleStatus::Reviewing => day.reviewing += 1,
            ScheduleStatus::Mature => day.mature += 1,
            ScheduleStatus::Suspended | ScheduleStatus::Leech => {}
        }
    }

    calendar
}

pub fn daily_workload(
    rows: impl IntoIterator<Item = (ScheduleStatus, DateTime<Utc>)>,
    days: u32,
    now: DateTime<Utc>,
) -> Vec<DailyWorkload> {
    review_calendar(rows, days, now)
        .into_iter()
        .map(|day| DailyWorkload {
            date: day.date,
            reviews: day.due,
        })
        .collect()
}

/// `(max ease - ease) + consecutive failures × weight`
pub fn severity(schedule: &ReviewSchedule) -> f64 {
    round2(
        (EASE_CEILING - schedule.parameters.easiness_factor())
            + f64::from(schedule.consecutive_incorrect) * INCORRECT_SEVERITY_WEIGHT,
    )
}

/// Highest severity first; schedules with zero severity are not problematic.
pub fn problematic_concepts(schedules: &[ReviewSchedule], limit: usize) -> Vec<ProblematicConcept> {
    let mut ranked: Vec<ProblematicConcept> = schedules
        .iter()
        .map(|s| ProblematicConcept {
            schedule_id: s.id.clone(),
            concept_id: s.concept_id.clone(),
            status: s.status,
            easiness_factor: s.parameters.easiness_factor(),
            consecutive_incorrect: s.consecutive_incorrect,
            severity: severity(s),
        })
        .filter(|p| p.severity > 0.0)
        .collect();

    ranked.sort_by(|a, b| {
        b.severity
            .partial_cmp(&a.severity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.concept_id.cmp(&b.concept_id))
    });
    ranked.truncate(limit);
    ranked
}

/// LEARNING first, then earliest next-review date.
pub fn due_order(
    a: (ScheduleStatus, DateTime<Utc>, &str),
    b: (ScheduleStatus, DateTime<Utc>, &str),
) -> Ordering {
    let learning_first = |s: ScheduleStatus| if s == ScheduleStatus::Learning { 0 } else { 1 };
    learning_first(a.0)
        .cmp(&learning_first(b.0))
        .then(a.1.cmp(&b.1))
        .then_with(|| a.2.cmp(b.2))
}

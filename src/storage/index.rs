//! In-memory schedule index and its JSON snapshot
//!
//! The index is derived data: every table can be rebuilt from the schedule
//! files. It answers identity lookups, status / folder membership, due-date
//! ordering and the ease / interval histograms without touching disk.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::analytics::OVERDUE_AFTER_DAYS;
use super::traits::{DistributionBucket, ScheduleQuery, ScheduleStatistics, StatusCounts};
use crate::domain::{ReviewSchedule, ScheduleStatus};
use crate::engine::{EASE_CEILING, EASE_FLOOR};
use crate::id::round2;

/// Width of one ease histogram bucket.
const EASE_BUCKET_WIDTH: f64 = 0.2;

/// Interval histogram buckets as (label, inclusive upper bound in days).
pub const INTERVAL_BUCKETS: [(&str, u32); 7] = [
    ("1", 1),
    ("2-7", 7),
    ("8-30", 30),
    ("31-90", 90),
    ("91-180", 180),
    ("181-365", 365),
    ("365+", u32::MAX),
];

/// Per-schedule row: where the file lives, the values queries filter on,
/// and which buckets it sits in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Path relative to the store base directory
    pub path: PathBuf,
    pub concept_id: String,
    #[serde(default)]
    pub folder_id: Option<String>,
    pub status: ScheduleStatus,
    pub next_review_date: DateTime<Utc>,
    pub repetitions: u32,
    pub easiness_factor: f64,
    pub interval: u32,
    pub ease_bucket: String,
    pub interval_bucket: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleIndex {
    /// Bumped on every mutation
    pub version: u64,
    pub last_updated: DateTime<Utc>,
    /// id -> location and bucket membership
    pub entries: HashMap<String, IndexEntry>,
    /// concept id -> schedule id
    pub by_concept: HashMap<String, String>,
    pub by_status: BTreeMap<ScheduleStatus, BTreeSet<String>>,
    pub by_folder: BTreeMap<String, BTreeSet<String>>,
    /// (next review date, id), earliest first
    pub due_queue: BTreeSet<(DateTime<Utc>, String)>,
    /// whole days overdue as of `last_updated` -> ids
    pub overdue_by_days: BTreeMap<i64, BTreeSet<String>>,
    pub by_ease: BTreeMap<String, BTreeSet<String>>,
    pub by_interval: BTreeMap<String, BTreeSet<String>>,
}

impl ScheduleIndex {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            version: 0,
            last_updated: now,
            entries: HashMap::new(),
            by_concept: HashMap::new(),
            by_status: BTreeMap::new(),
            by_folder: BTreeMap::new(),
            due_queue: BTreeSet::new(),
            overdue_by_days: BTreeMap::new(),
            by_ease: BTreeMap::new(),
            by_interval: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace the row for a schedule.
    pub fn upsert(&mut self, schedule: &ReviewSchedule, path: PathBuf, now: DateTime<Utc>) {
        self.unlink(&schedule.id);

        let entry = IndexEntry {
            path,
            concept_id: schedule.concept_id.clone(),
            folder_id: schedule.folder_id.clone(),
            status: schedule.status,
            next_review_date: schedule.timing.next_review_date,
            repetitions: schedule.parameters.repetitions(),
            easiness_factor: schedule.parameters.easiness_factor(),
            interval: schedule.parameters.interval(),
            ease_bucket: ease_bucket_label(schedule.parameters.easiness_factor()),
            interval_bucket: interval_bucket_label(schedule.parameters.interval()),
        };
        let id = schedule.id.clone();

        self.by_concept.insert(entry.concept_id.clone(), id.clone());
        self.by_status.entry(entry.status).or_default().insert(id.clone());
        if let Some(folder) = &entry.folder_id {
            self.by_folder.entry(folder.clone()).or_default().insert(id.clone());
        }
        self.due_queue.insert((entry.next_review_date, id.clone()));
        if let Some(days) = overdue_days(entry.next_review_date, self.last_updated) {
            self.overdue_by_days.entry(days).or_default().insert(id.clone());
        }
        self.by_ease.entry(entry.ease_bucket.clone()).or_default().insert(id.clone());
        self.by_interval.entry(entry.interval_bucket.clone()).or_default().insert(id.clone());
        self.entries.insert(id, entry);

        self.touch(now);
    }

    /// Drop the row for a schedule. Returns the removed row.
    pub fn remove(&mut self, id: &str, now: DateTime<Utc>) -> Option<IndexEntry> {
        let removed = self.unlink(id);
        if removed.is_some() {
            self.touch(now);
        }
        removed
    }

    fn unlink(&mut self, id: &str) -> Option<IndexEntry> {
        let entry = self.entries.remove(id)?;

        if self.by_concept.get(&entry.concept_id).map(String::as_str) == Some(id) {
            self.by_concept.remove(&entry.concept_id);
        }
        remove_member(&mut self.by_status, &entry.status, id);
        if let Some(folder) = &entry.folder_id {
            remove_member(&mut self.by_folder, folder, id);
        }
        self.due_queue.remove(&(entry.next_review_date, id.to_string()));
        self.overdue_by_days.retain(|_, ids| {
            ids.remove(id);
            !ids.is_empty()
        });
        remove_member(&mut self.by_ease, &entry.ease_bucket, id);
        remove_member(&mut self.by_interval, &entry.interval_bucket, id);

        Some(entry)
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.last_updated = now;
    }

    /// Recompute the overdue buckets relative to `now`.
    pub fn rebucket_overdue(&mut self, now: DateTime<Utc>) {
        self.overdue_by_days.clear();
        for (id, entry) in &self.entries {
            if let Some(days) = overdue_days(entry.next_review_date, now) {
                self.overdue_by_days.entry(days).or_default().insert(id.clone());
            }
        }
        self.last_updated = now;
    }

    pub fn entry(&self, id: &str) -> Option<&IndexEntry> {
        self.entries.get(id)
    }

    pub fn id_for_concept(&self, concept_id: &str) -> Option<&String> {
        self.by_concept.get(concept_id)
    }

    /// Ids with a status, earliest next review first.
    pub fn ids_with_status(&self, status: ScheduleStatus) -> Vec<String> {
        let mut ids: Vec<String> = self.by_status.get(&status).into_iter().flatten().cloned().collect();
        self.sort_by_due_date(&mut ids);
        ids
    }

    pub fn ids_in_folder(&self, folder_id: &str) -> Vec<String> {
        let mut ids: Vec<String> = self.by_folder.get(folder_id).into_iter().flatten().cloned().collect();
        self.sort_by_due_date(&mut ids);
        ids
    }

    /// Entries whose next review is at or before `cutoff`, earliest first.
    pub fn due_entries(&self, cutoff: DateTime<Utc>) -> impl Iterator<Item = (&String, &IndexEntry)> {
        self.due_queue
            .iter()
            .take_while(move |(date, _)| *date <= cutoff)
            .filter_map(|(_, id)| self.entries.get_key_value(id))
    }

    /// Entries whose next review falls in `[start, end)`.
    pub fn entries_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Iterator<Item = (&String, &IndexEntry)> {
        self.due_queue
            .range((start, String::new())..)
            .take_while(move |(date, _)| *date < end)
            .filter_map(|(_, id)| self.entries.get_key_value(id))
    }

    /// Ids at least `days` whole days overdue at `now`, earliest first.
    /// Empty when `now - days` falls outside the representable date range.
    pub fn overdue_ids(&self, days: i64, now: DateTime<Utc>) -> Vec<String> {
        let Some(cutoff) = Duration::try_days(days.max(0)).and_then(|span| now.checked_sub_signed(span)) else {
            return Vec::new();
        };
        self.due_entries(cutoff)
            .filter(|(_, entry)| entry.status != ScheduleStatus::Suspended)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Entries passing the query filters, ordered by (next review, id) and paged.
    pub fn query(&self, query: &ScheduleQuery) -> Vec<(&String, &IndexEntry)> {
        let page = self
            .due_queue
            .iter()
            .filter_map(|(_, id)| self.entries.get_key_value(id))
            .filter(|(_, e)| query.accepts(e.status, e.repetitions, e.interval))
            .skip(query.offset);
        match query.limit {
            Some(limit) => page.take(limit).collect(),
            None => page.collect(),
        }
    }

    /// Totals, due and overdue counts and averages as of `now`.
    pub fn statistics(&self, now: DateTime<Utc>) -> ScheduleStatistics {
        let mut due_count = 0;
        let mut overdue_count = 0;
        let mut ease_sum = 0.0;
        let mut interval_sum = 0.0;

        for entry in self.entries.values() {
            if entry.status != ScheduleStatus::Suspended && entry.next_review_date <= now {
                due_count += 1;
                if overdue_days(entry.next_review_date, now).is_some_and(|days| days >= OVERDUE_AFTER_DAYS) {
                    overdue_count += 1;
                }
            }
            ease_sum += entry.easiness_factor;
            interval_sum += f64::from(entry.interval);
        }

        let total = self.entries.len();
        let (average_ease, average_interval) = if total == 0 {
            (0.0, 0.0)
        } else {
            (round2(ease_sum / total as f64), round2(interval_sum / total as f64))
        };

        ScheduleStatistics {
            total_schedules: total,
            by_status: self.status_counts(),
            due_count,
            overdue_count,
            average_ease,
            average_interval,
        }
    }

    /// `(status, next review)` for every entry, for the calendar.
    pub fn due_rows(&self) -> impl Iterator<Item = (ScheduleStatus, DateTime<Utc>)> + '_ {
        self.entries.values().map(|e| (e.status, e.next_review_date))
    }

    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for (status, ids) in &self.by_status {
            counts.add(*status, ids.len());
        }
        counts
    }

    /// Ease histogram, lowest bucket first.
    pub fn ease_distribution(&self) -> Vec<DistributionBucket> {
        self.by_ease
            .iter()
            .map(|(label, ids)| DistributionBucket {
                label: label.clone(),
                count: ids.len(),
            })
            .collect()
    }

    /// Interval histogram in `INTERVAL_BUCKETS` order, empty buckets included.
    pub fn interval_distribution(&self) -> Vec<DistributionBucket> {
        INTERVAL_BUCKETS
            .iter()
            .map(|(label, _)| DistributionBucket {
                label: label.to_string(),
                count: self.by_interval.get(*label).map_or(0, BTreeSet::len),
            })
            .collect()
    }

    fn sort_by_due_date(&self, ids: &mut [String]) {
        ids.sort_by(|a, b| {
            let date = |id: &String| self.entries.get(id).map(|e| e.next_review_date);
            date(a).cmp(&date(b)).then_with(|| a.cmp(b))
        });
    }
}

fn remove_member<K: Ord>(table: &mut BTreeMap<K, BTreeSet<String>>, key: &K, id: &str) {
    if let Some(ids) = table.get_mut(key) {
        ids.remove(id);
        if ids.is_empty() {
            table.remove(key);
        }
    }
}

/// Whole days overdue, or None when less than a day overdue.
fn overdue_days(next_review: DateTime<Utc>, now: DateTime<Utc>) -> Option<i64> {
    let days = (now - next_review).num_days();
    (days >= 1).then_some(days)
}

/// Label of the ease bucket containing `ease`, e.g. `"2.5-2.7"`.
pub fn ease_bucket_label(ease: f64) -> String {
    let slot = ((ease - EASE_FLOOR) / EASE_BUCKET_WIDTH + 1e-9).floor().max(0.0);
    let lower = EASE_FLOOR + slot * EASE_BUCKET_WIDTH;
    let upper = (lower + EASE_BUCKET_WIDTH).min(EASE_CEILING);
    format!("{:.1}-{:.1}", lower, upper)
}

pub fn interval_bucket_label(interval: u32) -> String {
    INTERVAL_BUCKETS
        .iter()
        .find(|(_, upper)| interval <= *upper)
        .map_or("365+", |(label, _)| label)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SchedulingParameters;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap()
    }

    fn schedule(concept: &str, reps: u32, ease: f64, interval: u32) -> ReviewSchedule {
        ReviewSchedule::new(concept, now())
            .unwrap()
            .with_updated_parameters(SchedulingParameters::new(reps, ease, interval).unwrap())
    }

    fn path_for(s: &ReviewSchedule) -> PathBuf {
        PathBuf::from(format!("schedules/{}/{}.json", &s.id[..2], s.id))
    }

    #[test]
    fn test_upsert_populates_every_table() {
        let mut index = ScheduleIndex::new(now());
        let s = schedule("a", 4, 2.5, 30).in_folder(Some("inbox".to_string()));
        index.upsert(&s, path_for(&s), now());

        assert_eq!(index.len(), 1);
        assert_eq!(index.version, 1);
        assert_eq!(index.id_for_concept("a"), Some(&s.id));
        assert_eq!(index.ids_with_status(ScheduleStatus::Mature), vec![s.id.clone()]);
        assert_eq!(index.ids_in_folder("inbox"), vec![s.id.clone()]);
        assert_eq!(index.due_entries(now()).count(), 1);
        assert_eq!(index.entry(&s.id).unwrap().interval_bucket, "8-30");
        assert_eq!(index.entry(&s.id).unwrap().ease_bucket, "2.5-2.7");
    }

    #[test]
    fn test_upsert_moves_buckets() {
        let mut index = ScheduleIndex::new(now());
        let s = schedule("a", 1, 2.5, 1);
        index.upsert(&s, path_for(&s), now());

        let mut moved = s.with_updated_parameters(SchedulingParameters::new(5, 1.9, 100).unwrap());
        moved.timing.next_review_date = now() + Duration::days(100);
        index.upsert(&moved, path_for(&moved), now());

        assert_eq!(index.len(), 1);
        assert!(index.ids_with_status(ScheduleStatus::Learning).is_empty());
        assert_eq!(index.ids_with_status(ScheduleStatus::Mature).len(), 1);
        assert_eq!(index.due_entries(now()).count(), 0);
        assert_eq!(index.status_counts().total(), 1);
        assert!(!index.by_interval.contains_key("1"));
        assert_eq!(index.by_interval["91-180"].len(), 1);
    }

    #[test]
    fn test_remove_clears_every_table() {
        let mut index = ScheduleIndex::new(now());
        let s = schedule("a", 4, 2.5, 30).in_folder(Some("f".to_string()));
        index.upsert(&s, path_for(&s), now());

        let removed = index.remove(&s.id, now());

        assert!(removed.is_some());
        assert!(index.is_empty());
        assert!(index.by_concept.is_empty());
        assert!(index.by_status.is_empty());
        assert!(index.by_folder.is_empty());
        assert!(index.due_queue.is_empty());
        assert!(index.by_ease.is_empty());
        assert!(index.by_interval.is_empty());
        assert!(index.remove(&s.id, now()).is_none());
    }

    #[test]
    fn test_overdue_ids_and_buckets() {
        let mut index = ScheduleIndex::new(now());
        let mut late = schedule("late", 3, 2.5, 10);
        late.timing.next_review_date = now() - Duration::days(5);
        let on_time = schedule("on-time", 3, 2.5, 10);
        index.upsert(&late, path_for(&late), now());
        index.upsert(&on_time, path_for(&on_time), now());

        assert_eq!(index.overdue_ids(3, now()), vec![late.id.clone()]);
        assert!(index.overdue_ids(6, now()).is_empty());
        assert_eq!(index.overdue_ids(0, now()).len(), 2);
        assert!(index.overdue_ids(100_000_000, now()).is_empty());
        assert!(index.overdue_ids(i64::MAX, now()).is_empty());

        index.rebucket_overdue(now() + Duration::days(2));
        assert!(index.overdue_by_days[&7].contains(&late.id));
        assert!(index.overdue_by_days[&2].contains(&on_time.id));
    }

    #[test]
    fn test_entries_between() {
        let mut index = ScheduleIndex::new(now());
        let mut tomorrow = schedule("tomorrow", 3, 2.5, 10);
        tomorrow.timing.next_review_date = now() + Duration::days(1);
        let today = schedule("today", 3, 2.5, 10);
        index.upsert(&tomorrow, path_for(&tomorrow), now());
        index.upsert(&today, path_for(&today), now());

        let ids: Vec<&String> = index
            .entries_between(now() + Duration::hours(12), now() + Duration::hours(36))
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec![&tomorrow.id]);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut index = ScheduleIndex::new(now());
        for (i, concept) in ["a", "b", "c"].iter().enumerate() {
            let s = schedule(concept, i as u32 + 1, 2.5, 7).in_folder(Some("f".to_string()));
            index.upsert(&s, path_for(&s), now());
        }

        let json = serde_json::to_string(&index).unwrap();
        let restored: ScheduleIndex = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, index);
    }

    #[test]
    fn test_query_and_statistics_from_rows() {
        let mut index = ScheduleIndex::new(now());
        for (concept, reps, interval) in [("a", 0, 1), ("b", 3, 10), ("c", 5, 40), ("d", 6, 90)] {
            let s = schedule(concept, reps, 2.5, interval);
            index.upsert(&s, path_for(&s), now());
        }

        let long = ScheduleQuery {
            min_interval: Some(10),
            ..Default::default()
        };
        assert_eq!(index.query(&long).len(), 3);
        let paged = ScheduleQuery {
            limit: Some(1),
            offset: 2,
            ..long
        };
        assert_eq!(index.query(&paged).len(), 1);
        let mature = ScheduleQuery {
            status: Some(ScheduleStatus::Mature),
            ..Default::default()
        };
        assert!(index.query(&mature).iter().all(|(_, e)| e.status == ScheduleStatus::Mature));

        let stats = index.statistics(now());
        assert_eq!(stats.total_schedules, 4);
        assert_eq!(stats.due_count, 4);
        assert_eq!(stats.overdue_count, 0);
        assert_eq!(stats.average_ease, 2.5);
        assert_eq!(stats.average_interval, 35.25);
        assert_eq!(index.statistics(now() + Duration::days(1)).overdue_count, 4);
    }

    #[test]
    fn test_bucket_labels() {
        assert_eq!(ease_bucket_label(1.3), "1.3-1.5");
        assert_eq!(ease_bucket_label(1.5), "1.5-1.7");
        assert_eq!(ease_bucket_label(2.65), "2.5-2.7");
        assert_eq!(ease_bucket_label(3.0), "2.9-3.0");
        assert_eq!(ease_bucket_label(2.95), "2.9-3.0");
        assert_eq!(interval_bucket_label(1), "1");
        assert_eq!(interval_bucket_label(7), "2-7");
        assert_eq!(interval_bucket_label(365), "181-365");
        assert_eq!(interval_bucket_label(1000), "365+");
    }

    #[test]
    fn test_interval_distribution_includes_empty_buckets() {
        let mut index = ScheduleIndex::new(now());
        let s = schedule("a", 3, 2.5, 45);
        index.upsert(&s, path_for(&s), now());

        let dist = index.interval_distribution();
        assert_eq!(dist.len(), INTERVAL_BUCKETS.len());
        assert_eq!(dist.iter().map(|b| b.count).sum::<usize>(), 1);
        assert_eq!(dist[3], DistributionBucket { label: "31-90".to_string(), count: 1 });
    }
}

//! History ledger: capped log of finished sessions, newest first.

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::models::HistoryEntry;

pub const HISTORY_CAPACITY: usize = 100;

/// Entries sharing one local calendar date.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DayGroup {
    pub date: NaiveDate,
    pub entries: Vec<HistoryEntry>,
    pub total_work_ms: i64,
}

#[derive(Debug, Clone, Default)]
pub struct HistoryLedger {
    entries: Vec<HistoryEntry>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a ledger from a persisted list, trimming anything past the cap.
    pub fn from_entries(mut entries: Vec<HistoryEntry>) -> Self {
        entries.truncate(HISTORY_CAPACITY);
        Self { entries }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Logs a finished session and returns the stored entry.
    pub fn record(
        &mut self,
        task_name: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        paused_ms: i64,
        now: DateTime<Utc>,
    ) -> HistoryEntry {
        let id = self.next_id(now);
        let entry = HistoryEntry::new(id, task_name, start_time, end_time, paused_ms);
        self.push(entry.clone());
        entry
    }

    fn push(&mut self, entry: HistoryEntry) {
        self.entries.insert(0, entry);
        self.entries.truncate(HISTORY_CAPACITY);
    }

    fn next_id(&self, now: DateTime<Utc>) -> i64 {
        let candidate = now.timestamp_millis();
        match self.entries.iter().map(|entry| entry.id).max() {
            Some(last) if last >= candidate => last + 1,
            _ => candidate,
        }
    }

    pub fn delete(&mut self, id: i64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries that started on today's local date.
    pub fn today(&self, now: DateTime<Utc>) -> Vec<HistoryEntry> {
        self.on_date_in(&Local, now.with_timezone(&Local).date_naive())
    }

    pub fn on_date_in<Tz: TimeZone>(&self, tz: &Tz, date: NaiveDate) -> Vec<HistoryEntry> {
        self.entries
            .iter()
            .filter(|entry| local_date(tz, entry.start_time) == date)
            .cloned()
            .collect()
    }

    /// Archive view grouped by local start date.
    pub fn archive(&self) -> Vec<DayGroup> {
        self.group_by_date_in(&Local)
    }

    /// Most recent date first; entries keep their ledger order inside a day.
    pub fn group_by_date_in<Tz: TimeZone>(&self, tz: &Tz) -> Vec<DayGroup> {
        let mut groups: Vec<DayGroup> = Vec::new();
        for entry in &self.entries {
            let date = local_date(tz, entry.start_time);
            match groups.iter_mut().find(|group| group.date == date) {
                Some(group) => {
                    group.total_work_ms += entry.work_time_ms;
                    group.entries.push(entry.clone());
                }
                None => groups.push(DayGroup {
                    date,
                    entries: vec![entry.clone()],
                    total_work_ms: entry.work_time_ms,
                }),
            }
        }
        groups.sort_by(|a, b| b.date.cmp(&a.date));
        groups
    }

    pub fn total_work_ms(entries: &[HistoryEntry]) -> i64 {
        entries.iter().map(|entry| entry.work_time_ms).sum()
    }
}

fn local_date<Tz: TimeZone>(tz: &Tz, instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
    }

    fn log(ledger: &mut HistoryLedger, name: &str, start: DateTime<Utc>, minutes: i64) -> HistoryEntry {
        let end = start + Duration::minutes(minutes);
        ledger.record(name, start, end, 0, end)
    }

    #[test]
    fn newest_entry_comes_first() {
        let mut ledger = HistoryLedger::new();
        log(&mut ledger, "first", at(1, 9), 25);
        log(&mut ledger, "second", at(1, 10), 25);

        let names: Vec<_> = ledger.entries().iter().map(|e| e.task_name.as_str()).collect();
        assert_eq!(names, vec!["second", "first"]);
    }

    #[test]
    fn ids_stay_unique_within_the_same_millisecond() {
        let mut ledger = HistoryLedger::new();
        let now = at(1, 9);
        let a = ledger.record("a", now, now, 0, now);
        let b = ledger.record("b", now, now, 0, now);

        assert!(b.id > a.id);
    }

    #[test]
    fn appending_past_capacity_evicts_the_oldest() {
        let mut ledger = HistoryLedger::new();
        let base = at(1, 0);
        for i in 0..HISTORY_CAPACITY as i64 {
            let start = base + Duration::minutes(i);
            ledger.record(&format!("task {i}"), start, start + Duration::seconds(30), 0, start);
        }
        assert_eq!(ledger.len(), HISTORY_CAPACITY);

        let start = base + Duration::hours(5);
        ledger.record("overflow", start, start, 0, start);

        assert_eq!(ledger.len(), HISTORY_CAPACITY);
        assert_eq!(ledger.entries()[0].task_name, "overflow");
        assert!(ledger.entries().iter().all(|e| e.task_name != "task 0"));
        assert_eq!(ledger.entries().last().unwrap().task_name, "task 1");
    }

    #[test]
    fn delete_and_clear() {
        let mut ledger = HistoryLedger::new();
        let keep = log(&mut ledger, "keep", at(1, 9), 10);
        let drop = log(&mut ledger, "drop", at(1, 10), 10);

        assert!(ledger.delete(drop.id));
        assert!(!ledger.delete(drop.id));
        assert_eq!(ledger.entries(), &[keep]);

        ledger.clear();
        assert!(ledger.is_empty());
    }

    #[test]
    fn groups_by_local_date_descending_with_totals() {
        let mut ledger = HistoryLedger::new();
        log(&mut ledger, "mon a", at(3, 9), 25);
        log(&mut ledger, "tue", at(4, 9), 50);
        log(&mut ledger, "mon b", at(3, 14), 15);

        let groups = ledger.group_by_date_in(&Utc);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].date, NaiveDate::from_ymd_opt(2024, 6, 4).unwrap());
        assert_eq!(groups[0].total_work_ms, 50 * 60_000);

        let monday: Vec<_> = groups[1].entries.iter().map(|e| e.task_name.as_str()).collect();
        assert_eq!(monday, vec!["mon b", "mon a"]);
        assert_eq!(groups[1].total_work_ms, 40 * 60_000);
    }

    #[test]
    fn date_boundaries_follow_the_timezone() {
        let mut ledger = HistoryLedger::new();
        // 23:30 UTC is already the next day at UTC+9.
        log(&mut ledger, "late", Utc.with_ymd_and_hms(2024, 6, 3, 23, 30, 0).unwrap(), 10);
        let seoul = FixedOffset::east_opt(9 * 3600).unwrap();

        let utc_day = ledger.on_date_in(&Utc, NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
        let seoul_day = ledger.on_date_in(&seoul, NaiveDate::from_ymd_opt(2024, 6, 4).unwrap());

        assert_eq!(utc_day.len(), 1);
        assert_eq!(seoul_day.len(), 1);
    }

    #[test]
    fn today_only_includes_sessions_started_today() {
        let mut ledger = HistoryLedger::new();
        let now = Utc::now();
        ledger.record("now", now, now, 0, now);
        let old = now - Duration::days(3);
        ledger.record("old", old, old, 0, now);

        let today = ledger.today(now);
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].task_name, "now");
        assert_eq!(HistoryLedger::total_work_ms(&today), 0);
    }

    #[test]
    fn oversized_persisted_lists_are_trimmed() {
        let start = at(1, 0);
        let entries = (0..150)
            .map(|i| HistoryEntry::new(i, "t", start, start, 0))
            .collect();

        assert_eq!(HistoryLedger::from_entries(entries).len(), HISTORY_CAPACITY);
    }
}

use crate::models::HabitId;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const NO_COMPLETIONS: &BTreeSet<HabitId> = &BTreeSet::new();

/// Sparse record of which habits were completed on which calendar day.
///
/// A date is only present while at least one habit is completed on it.
/// Every operation returns a new log; the receiver is never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(transparent)]
pub struct CompletionLog(BTreeMap<NaiveDate, BTreeSet<HabitId>>);

impl CompletionLog {
    /// Builds a log from raw entries, dropping empty days and repeated ids.
    pub fn from_entries<I>(entries: impl IntoIterator<Item = (NaiveDate, I)>) -> Self
    where
        I: IntoIterator<Item = HabitId>,
    {
        let mut days: BTreeMap<NaiveDate, BTreeSet<HabitId>> = BTreeMap::new();
        for (date, ids) in entries {
            days.entry(date).or_default().extend(ids);
        }
        days.retain(|_, ids| !ids.is_empty());
        Self(days)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn days(&self) -> impl Iterator<Item = (&NaiveDate, &BTreeSet<HabitId>)> {
        self.0.iter()
    }

    pub fn is_completed(&self, habit_id: &str, date: NaiveDate) -> bool {
        self.completed_on(date).contains(habit_id)
    }

    pub fn completed_on(&self, date: NaiveDate) -> &BTreeSet<HabitId> {
        self.0.get(&date).unwrap_or(NO_COMPLETIONS)
    }

    /// Dates on which `habit_id` was completed, ascending.
    pub fn dates_for<'a>(&'a self, habit_id: &'a str) -> impl Iterator<Item = NaiveDate> + 'a {
        self.0
            .iter()
            .filter(move |(_, ids)| ids.contains(habit_id))
            .map(|(date, _)| *date)
    }

    pub fn toggle(&self, habit_id: &str, date: NaiveDate) -> Self {
        let mut days = self.0.clone();
        let day = days.entry(date).or_default();
        if !day.remove(habit_id) {
            day.insert(habit_id.to_string());
        }
        if day.is_empty() {
            days.remove(&date);
        }
        Self(days)
    }

    /// Counts how many of `candidates` are completed on `date`.
    pub fn count_for_date<S: AsRef<str>>(&self, date: NaiveDate, candidates: &[S]) -> usize {
        let day = self.completed_on(date);
        candidates
            .iter()
            .filter(|candidate| day.contains(candidate.as_ref()))
            .count()
    }

    pub fn purge_habit(&self, habit_id: &str) -> Self {
        let days = self
            .0
            .iter()
            .filter_map(|(date, ids)| {
                let mut kept = ids.clone();
                kept.remove(habit_id);
                (!kept.is_empty()).then_some((*date, kept))
            })
            .collect();
        Self(days)
    }

    pub fn references(&self, habit_id: &str) -> bool {
        self.0.values().any(|ids| ids.contains(habit_id))
    }
}

impl<'de> Deserialize<'de> for CompletionLog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let days = BTreeMap::<NaiveDate, Vec<HabitId>>::deserialize(deserializer)?;
        Ok(Self::from_entries(days))
    }
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parses a canonical `YYYY-MM-DD` key. Non-padded or out-of-range input is rejected.
pub fn parse_date_key(value: &str) -> Option<NaiveDate> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    (date_key(date) == value).then_some(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn sample() -> CompletionLog {
        CompletionLog::from_entries([
            (day(1), vec!["a".to_string(), "b".to_string()]),
            (day(2), vec!["b".to_string()]),
            (day(4), vec!["a".to_string()]),
        ])
    }

    #[test]
    fn toggle_twice_restores_log() {
        let log = sample();
        for (habit, date) in [("a", day(1)), ("b", day(2)), ("c", day(3)), ("a", day(4))] {
            let toggled = log.toggle(habit, date);
            assert_ne!(toggled, log);
            assert_eq!(toggled.toggle(habit, date), log);
        }
    }

    #[test]
    fn toggle_off_last_id_drops_the_day() {
        let log = sample().toggle("b", day(2));
        assert!(log.days().all(|(date, _)| *date != day(2)));
        assert!(log.completed_on(day(2)).is_empty());
    }

    #[test]
    fn toggle_ignores_position_within_day() {
        let log = sample();
        let reordered = log.toggle("a", day(1)).toggle("a", day(1));
        assert_eq!(reordered, log);
        assert_eq!(
            serde_json::to_value(&reordered).unwrap(),
            serde_json::to_value(&log).unwrap()
        );
    }

    #[test]
    fn toggle_on_creates_the_day() {
        let log = CompletionLog::default().toggle("a", day(9));
        assert!(log.is_completed("a", day(9)));
        assert!(log.completed_on(day(9)).contains("a"));
        assert_eq!(log.completed_on(day(9)).len(), 1);
    }

    #[test]
    fn count_only_includes_candidates() {
        let log = sample();
        assert_eq!(log.count_for_date(day(1), &["a", "b"]), 2);
        assert_eq!(log.count_for_date(day(1), &["b", "z"]), 1);
        assert_eq!(log.count_for_date(day(3), &["a", "b"]), 0);
        assert_eq!(log.count_for_date::<&str>(day(1), &[]), 0);
    }

    #[test]
    fn purge_removes_every_reference() {
        let log = sample().purge_habit("a");
        assert!(!log.references("a"));
        assert!(log.is_completed("b", day(1)));
        assert!(log.completed_on(day(4)).is_empty());
        assert_eq!(log.days().count(), 2);
    }

    #[test]
    fn dates_for_is_ascending() {
        let dates: Vec<_> = sample().dates_for("a").collect();
        assert_eq!(dates, vec![day(1), day(4)]);
    }

    #[test]
    fn from_entries_keeps_invariant() {
        let log = CompletionLog::from_entries([
            (day(1), vec![]),
            (day(2), vec!["a".to_string(), "a".to_string()]),
        ]);
        assert_eq!(log.days().count(), 1);
        assert_eq!(log.completed_on(day(2)).len(), 1);
    }

    #[test]
    fn deserializing_drops_empty_days_and_repeats() {
        let log: CompletionLog = serde_json::from_value(serde_json::json!({
            "2024-03-01": [],
            "2024-03-02": ["a", "b", "a"]
        }))
        .unwrap();
        assert_eq!(log.days().count(), 1);
        assert_eq!(log.completed_on(day(2)).len(), 2);
        assert!(log.completed_on(day(1)).is_empty());
    }

    #[test]
    fn serializes_as_date_keyed_object() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["2024-03-01"], serde_json::json!(["a", "b"]));
        let back: CompletionLog = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn parse_date_key_requires_canonical_form() {
        assert_eq!(parse_date_key("2024-03-01"), Some(day(1)));
        assert_eq!(parse_date_key("2024-3-1"), None);
        assert_eq!(parse_date_key("2024-02-30"), None);
        assert_eq!(parse_date_key("yesterday"), None);
    }
}

use crate::completions::CompletionLog;
use crate::models::{Habit, HabitId, StreakInfo};
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongestStreak {
    pub length: u32,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Consecutive completed days ending today, or yesterday when today is still open.
pub fn current_streak(log: &CompletionLog, habit_id: &str, today: NaiveDate) -> u32 {
    let mut cursor = today;
    if !log.is_completed(habit_id, cursor) {
        match cursor.pred_opt() {
            Some(yesterday) => cursor = yesterday,
            None => return 0,
        }
    }

    let mut streak = 0;
    while log.is_completed(habit_id, cursor) {
        streak += 1;
        match cursor.pred_opt() {
            Some(previous) => cursor = previous,
            None => break,
        }
    }
    streak
}

pub fn longest_streak(log: &CompletionLog, habit_id: &str) -> LongestStreak {
    let mut dates = log.dates_for(habit_id);
    let Some(first) = dates.next() else {
        return LongestStreak {
            length: 0,
            start: None,
            end: None,
        };
    };

    let mut best = (1, first, first);
    let mut run_length = 1;
    let mut run_start = first;
    let mut previous = first;

    for date in dates {
        if (date - previous).num_days() == 1 {
            run_length += 1;
        } else {
            run_length = 1;
            run_start = date;
        }
        // strict: ties keep the earliest run
        if run_length > best.0 {
            best = (run_length, run_start, date);
        }
        previous = date;
    }

    LongestStreak {
        length: best.0,
        start: Some(best.1),
        end: Some(best.2),
    }
}

pub fn streak_info_at(today: NaiveDate, log: &CompletionLog, habit_id: &str) -> StreakInfo {
    let longest = longest_streak(log, habit_id);
    StreakInfo {
        habit_id: habit_id.to_string(),
        current_streak: current_streak(log, habit_id, today),
        longest_streak: longest.length,
        longest_streak_start: longest.start,
        longest_streak_end: longest.end,
    }
}

pub fn streak_map(habits: &[Habit], log: &CompletionLog, today: NaiveDate) -> HashMap<HabitId, StreakInfo> {
    habits
        .iter()
        .map(|habit| (habit.id.clone(), streak_info_at(today, log, &habit.id)))
        .collect()
}

pub fn lookup_streak(map: &HashMap<HabitId, StreakInfo>, habit_id: &str) -> StreakInfo {
    map.get(habit_id)
        .cloned()
        .unwrap_or_else(|| StreakInfo::empty(habit_id))
}

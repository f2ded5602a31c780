use crate::completions::CompletionLog;
use crate::habits::active_habits;
use crate::models::{DashboardStats, Habit, HabitId, HeatmapDay, TrendPoint};
use crate::streaks::current_streak;
use chrono::{Duration, Local, NaiveDate};

pub const RATE_WINDOW_DAYS: usize = 30;
pub const HEATMAP_DAYS: usize = 365;

pub fn build_dashboard(habits: &[Habit], log: &CompletionLog) -> DashboardStats {
    build_dashboard_at(Local::now().date_naive(), habits, log)
}

pub fn build_dashboard_at(today: NaiveDate, habits: &[Habit], log: &CompletionLog) -> DashboardStats {
    let active = active_habits(habits);
    let active_ids = ids(&active);

    let current_best_streak = active
        .iter()
        .map(|habit| current_streak(log, &habit.id, today))
        .max()
        .unwrap_or(0);

    let mut possible = 0usize;
    let mut completed = 0usize;
    for date in trailing_days(today, RATE_WINDOW_DAYS) {
        let eligible = existing_ids(&active, date);
        possible += eligible.len();
        completed += log.count_for_date(date, &eligible);
    }

    DashboardStats {
        total_habits: active.len(),
        completed_today: log.count_for_date(today, &active_ids),
        current_best_streak,
        overall_completion_rate: percent(completed, possible),
    }
}

pub fn build_trend(habits: &[Habit], log: &CompletionLog, days: usize) -> Vec<TrendPoint> {
    build_trend_at(Local::now().date_naive(), habits, log, days)
}

pub fn build_trend_at(today: NaiveDate, habits: &[Habit], log: &CompletionLog, days: usize) -> Vec<TrendPoint> {
    let active = active_habits(habits);

    trailing_days(today, days)
        .map(|date| {
            let eligible = existing_ids(&active, date);
            let completed = log.count_for_date(date, &eligible);
            TrendPoint {
                date,
                completed,
                total: eligible.len(),
                rate: percent(completed, eligible.len()),
            }
        })
        .collect()
}

pub fn build_heatmap(habits: &[Habit], log: &CompletionLog) -> Vec<HeatmapDay> {
    build_heatmap_at(Local::now().date_naive(), habits, log)
}

/// Uses the current active roster as the total for every day, unlike the
/// dashboard and trend views which only count habits that already existed.
pub fn build_heatmap_at(today: NaiveDate, habits: &[Habit], log: &CompletionLog) -> Vec<HeatmapDay> {
    let active_ids = ids(&active_habits(habits));
    let total = active_ids.len();

    trailing_days(today, HEATMAP_DAYS)
        .map(|date| {
            let count = log.count_for_date(date, &active_ids);
            HeatmapDay {
                date,
                count,
                total,
                intensity: intensity(count, total),
            }
        })
        .collect()
}

pub fn intensity(count: usize, total: usize) -> u8 {
    if total == 0 || count == 0 {
        return 0;
    }
    let ratio = count as f64 / total as f64;
    if ratio <= 0.25 {
        1
    } else if ratio <= 0.5 {
        2
    } else if ratio <= 0.75 {
        3
    } else {
        4
    }
}

fn percent(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (completed as f64 / total as f64 * 100.0).round() as u32
}

/// The `count` days ending at `today`, oldest first.
fn trailing_days(today: NaiveDate, count: usize) -> impl Iterator<Item = NaiveDate> {
    (0..count)
        .rev()
        .map(move |offset| today - Duration::days(offset as i64))
}

fn ids(habits: &[Habit]) -> Vec<HabitId> {
    habits.iter().map(|habit| habit.id.clone()).collect()
}

fn existing_ids(habits: &[Habit], date: NaiveDate) -> Vec<HabitId> {
    habits
        .iter()
        .filter(|habit| habit.existed_on(date))
        .map(|habit| habit.id.clone())
        .collect()
}
